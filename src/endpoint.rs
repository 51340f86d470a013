//! Definition of the Endpoint type

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use parse_display::Display;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
}

/// URL scheme used to contact a controller
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

/// Canonical base address of a controller
///
/// An endpoint only holds a scheme, a host and an optional port. Its [Display] form is usable
/// directly as a URL prefix, without any trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    base: Url,
}

impl Endpoint {
    /// Normalize user input into an endpoint
    ///
    /// Surrounding whitespace and trailing slashes are removed, and the `http` scheme is
    /// assumed when none is given. Anything after the host and port is discarded.
    pub fn resolve(raw: &str) -> Result<Self, EndpointError> {
        let invalid = || EndpointError::InvalidAddress(raw.to_owned());

        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let with_scheme: Cow<str> = if trimmed.contains("://") {
            trimmed.into()
        } else {
            format!("http://{}", trimmed).into()
        };

        let url = Url::parse(&with_scheme).map_err(|_| invalid())?;

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(invalid()),
        };

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(invalid)?
            .to_owned();

        let port = url.port();

        let mut base = url;
        base.set_path("");
        base.set_query(None);
        base.set_fragment(None);

        trace!(input = %raw, scheme = %scheme, host = %host, ?port, "resolved endpoint");

        Ok(Self {
            scheme,
            host,
            port,
            base,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Build the full URL of a command on this endpoint
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;

        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }

        Ok(())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}
