//! Orphaned-container sweep.

use crate::fleet::{FleetError, FleetProvider};
use limelight_tunnels::WorkerProbe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one sweep pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub visited: usize,
    pub healthy: usize,
    pub deleted: Vec<String>,
    /// Containers whose deletion failed; they stay for the next run.
    pub failures: usize,
}

/// One pass over the worker fleet: ping every container, delete the
/// unresponsive ones.
///
/// Containers are visited sequentially and exactly once; a deletion
/// completes before the next container is pinged. Per-container errors
/// are logged and never abort the sweep.
pub struct JanitorSweep {
    provider: Arc<dyn FleetProvider>,
    probe: WorkerProbe,
}

impl JanitorSweep {
    pub fn new(provider: Arc<dyn FleetProvider>, probe: WorkerProbe) -> Self {
        Self { provider, probe }
    }

    pub async fn run(&self) -> Result<SweepReport, FleetError> {
        info!("starting orphaned-container sweep");
        let mut fleet = self.provider.connect().await?;
        let containers = match fleet.list().await {
            Ok(containers) => containers,
            Err(error) => {
                // a stale credential is the common cause; rebuild the
                // client once and retry the listing a single time
                warn!(%error, "fleet listing failed; rebuilding management client");
                fleet = self.provider.connect().await?;
                fleet.list().await?
            }
        };

        let mut report = SweepReport::default();
        for container in containers {
            report.visited += 1;
            debug!(container = %container.name, "pinging container");
            if self.probe.ping(&container.hostname).await {
                report.healthy += 1;
                continue;
            }

            info!(container = %container.name, "container unresponsive; deleting");
            match fleet.delete_and_wait(&container.name).await {
                Ok(()) => {
                    info!(container = %container.name, "container deleted");
                    report.deleted.push(container.name);
                }
                Err(error) => {
                    warn!(container = %container.name, %error, "container deletion failed");
                    report.failures += 1;
                }
            }
        }

        info!(
            visited = report.visited,
            healthy = report.healthy,
            deleted = report.deleted.len(),
            failures = report.failures,
            "sweep complete"
        );
        Ok(report)
    }
}
