//! Background worker liveness monitor.

use crate::cache::{RouteCache, WORKER_HOSTNAME_KEY};
use limelight_tunnels::WorkerProbe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Interval between liveness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Repeating liveness poll owned by a routing invocation.
///
/// On the first failed ping the cached worker hostname is invalidated
/// and the task stops; the next routing attempt re-provisions because
/// liveness will then read false. Nothing is restarted from here.
#[derive(Debug)]
pub struct WorkerMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl WorkerMonitor {
    pub fn spawn(
        hostname: String,
        probe: WorkerProbe,
        cache: Arc<dyn RouteCache>,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick of a tokio interval fires immediately; the
            // worker was just confirmed up, so skip it
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if probe.ping(&hostname).await {
                            debug!(%hostname, "worker alive");
                        } else {
                            warn!(%hostname, "worker unreachable; invalidating cached hostname");
                            cache.remove(WORKER_HOSTNAME_KEY);
                            break;
                        }
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    /// Stop polling: the worker's fate is decided elsewhere.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for WorkerMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}
