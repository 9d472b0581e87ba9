//! Keepalive
//!
//! Sends the bare ping sentinel on a fixed interval while the connection is
//! established. The task is aborted when the [`Keepalive`] is dropped.

use crate::protocol::PING;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub(crate) struct Keepalive {
    handle: JoinHandle<()>,
    interval: Duration,
}

impl Keepalive {
    /// Start pinging through `transport` every `interval`
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn start(transport: Arc<dyn Transport>, interval: Duration) -> Option<Self> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(?interval, "No tokio runtime to run keepalive pings, connection may idle out");
            return None;
        };

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                tracing::trace!("Sending keepalive ping");
                if let Err(e) = transport.send(PING.to_string()) {
                    tracing::debug!(error = %e, "Keepalive stopped");
                    break;
                }
            }
        });

        Some(Self { handle, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
