//! Debounced dispatch of high-frequency parameter changes
//!
//! Each [Channel] holds at most one [PendingCommand]. Submitting a value on a channel cancels the
//! delay timer of the previous command and schedules the new value after the channel's quiet
//! interval, so a burst of updates results in a single action carrying the last value.
//!
//! Only the delay phase can be cancelled. Once an action has started (a request is on the wire)
//! it runs to completion, and the next action of the same channel waits for it before starting.

use std::collections::HashMap;
use std::future::Future;

use strum_macros::{EnumIter, IntoStaticStr};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DebounceSettings;

/// Independently debounced parameter streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Channel {
    Color,
    LocalBrightness,
    GlobalBrightness,
}

/// The latest not-yet-sent value of one channel
struct PendingCommand {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Dispatcher {
    settings: DebounceSettings,
    pending: HashMap<Channel, PendingCommand>,
}

impl Dispatcher {
    pub fn new(settings: DebounceSettings) -> Self {
        Self {
            settings,
            pending: HashMap::new(),
        }
    }

    /// Schedule `action(value)` on `channel` once the channel has been quiet for its interval
    pub fn submit<V, F, Fut>(&mut self, channel: Channel, value: V, action: F)
    where
        V: Send + 'static,
        F: FnOnce(V) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.settings.interval(channel);
        let name: &'static str = channel.into();

        let predecessor = self.pending.remove(&channel).map(|previous| {
            previous.token.cancel();
            previous.handle
        });

        let token = CancellationToken::new();
        let handle = tokio::spawn({
            let token = token.clone();

            async move {
                let superseded = tokio::select! {
                    biased;
                    _ = token.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                };

                // Sends on one channel never overlap
                if let Some(predecessor) = predecessor {
                    if let Err(error) = predecessor.await {
                        warn!(channel = name, error = %error, "debounced command failed");
                    }
                }

                if superseded {
                    trace!(channel = name, "superseded");
                } else {
                    trace!(channel = name, "dispatching");
                    action(value).await;
                }
            }
        });

        self.pending.insert(channel, PendingCommand { token, handle });
    }

    /// true if nothing is scheduled or running on `channel`
    pub fn is_idle(&self, channel: Channel) -> bool {
        self.pending
            .get(&channel)
            .map(|pending| pending.handle.is_finished())
            .unwrap_or(true)
    }

    /// Wait for every scheduled command to run to completion
    pub async fn flush(&mut self) {
        for (channel, pending) in self.pending.drain() {
            if let Err(error) = pending.handle.await {
                let name: &'static str = channel.into();
                warn!(channel = name, error = %error, "debounced command failed");
            }
        }
    }

    /// Drop every value still waiting for its quiet interval
    pub fn cancel_all(&mut self) {
        for pending in self.pending.values() {
            pending.token.cancel();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
