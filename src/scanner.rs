//! Discovery of controllers on the local /24 subnet

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use crate::config::ScanSettings;
use crate::endpoint::Endpoint;
use crate::transport::Transport;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("no private IPv4 address on any active network interface")]
    NoLocalAddress,
}

/// Responding hosts of one scan
pub type DiscoveryResult = Vec<Ipv4Addr>;

/// Ordering of discovered hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOrder {
    /// Sort the dotted-quad strings, so `.17` comes before `.5`
    Lexicographic,
    /// Sort by address value
    Numeric,
}

impl Default for HostOrder {
    fn default() -> Self {
        Self::Lexicographic
    }
}

impl HostOrder {
    pub fn sort(self, hosts: &mut DiscoveryResult) {
        match self {
            HostOrder::Lexicographic => hosts.sort_by_cached_key(|host| host.to_string()),
            HostOrder::Numeric => hosts.sort(),
        }

        hosts.dedup();
    }
}

/// First private address in `addrs`
fn pick_private_ipv4(addrs: impl IntoIterator<Item = Ipv4Addr>) -> Option<Ipv4Addr> {
    addrs.into_iter().find(Ipv4Addr::is_private)
}

/// Private IPv4 address of an active, non-loopback interface
pub fn local_private_ipv4() -> Option<Ipv4Addr> {
    let interfaces = pnet::datalink::interfaces();

    pick_private_ipv4(
        interfaces
            .iter()
            .filter(|intf| intf.is_up() && !intf.is_loopback())
            .flat_map(|intf| intf.ips.iter())
            .filter_map(|net| match net.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            }),
    )
}

pub struct LanScanner<T> {
    transport: Arc<T>,
    settings: ScanSettings,
}

impl<T: Transport> LanScanner<T> {
    pub fn new(transport: Arc<T>, settings: ScanSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Probe the /24 subnet of the local private address
    #[instrument(skip(self))]
    pub async fn scan(&self) -> Result<DiscoveryResult, ScanError> {
        let local = local_private_ipv4().ok_or(ScanError::NoLocalAddress)?;
        debug!(local = %local, "found local address");

        Ok(self.scan_subnet(local).await)
    }

    /// Probe hosts 1 to 254 of the /24 subnet containing `local`
    ///
    /// Probes run concurrently within a batch, and a batch only starts once every probe of the
    /// previous one has resolved.
    #[instrument(skip(self))]
    pub async fn scan_subnet(&self, local: Ipv4Addr) -> DiscoveryResult {
        let [a, b, c, _] = local.octets();
        let candidates: Vec<_> = (1..=254).map(|d| Ipv4Addr::new(a, b, c, d)).collect();

        let mut found = DiscoveryResult::new();
        for batch in candidates.chunks(self.settings.batch_size.max(1)) {
            let answers = join_all(batch.iter().map(|&host| self.probe(host))).await;

            found.extend(
                batch
                    .iter()
                    .zip(answers)
                    .filter_map(|(&host, alive)| if alive { Some(host) } else { None }),
            );
        }

        self.settings.host_order.sort(&mut found);

        info!(subnet = %format!("{}.{}.{}.0/24", a, b, c), count = found.len(), "scan complete");
        found
    }

    async fn probe(&self, host: Ipv4Addr) -> bool {
        let endpoint = match Endpoint::resolve(&host.to_string()) {
            Ok(endpoint) => endpoint,
            Err(_) => return false,
        };

        match self
            .transport
            .request(&endpoint, &self.settings.health_path, &[])
            .await
        {
            Ok(response) if response.is_success() => {
                debug!(host = %host, "controller found");
                true
            }
            _ => false,
        }
    }
}
