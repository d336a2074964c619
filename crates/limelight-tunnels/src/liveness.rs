//! Liveness checks for tunnels and backend workers.

use crate::service::TunnelService;
use crate::TunnelError;
use limelight_proto::{Tunnel, TunnelRef, TunnelRequestOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default bound on worker health pings.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(2000);

/// Health path exposed by every worker.
pub const PING_PATH: &str = "/limelight/ping";

/// A tunnel is active iff the service reports a nonzero host connection
/// count. No network call.
pub fn is_tunnel_active(tunnel: &Tunnel) -> bool {
    matches!(
        tunnel.status.as_ref().and_then(|s| s.host_connection_count),
        Some(count) if count != 0
    )
}

/// Re-fetching liveness check for possibly-stale tunnel references.
pub struct LivenessProbe {
    service: Arc<dyn TunnelService>,
}

impl LivenessProbe {
    pub fn new(service: Arc<dyn TunnelService>) -> Self {
        Self { service }
    }

    /// Re-fetch the tunnel, then apply [`is_tunnel_active`]. A vanished
    /// tunnel reads as inactive rather than an error.
    pub async fn is_active(&self, reference: &TunnelRef) -> Result<bool, TunnelError> {
        match self
            .service
            .get_tunnel(reference, &TunnelRequestOptions::host())
            .await
        {
            Ok(tunnel) => Ok(is_tunnel_active(&tunnel)),
            Err(TunnelError::NotFound) => Ok(false),
            Err(error) => Err(error),
        }
    }
}

/// Bounded-timeout health ping against a worker's ingress endpoint.
///
/// Any transport error, timeout, or non-success status reads as "down";
/// only a success response within the bound counts as alive.
#[derive(Clone)]
pub struct WorkerProbe {
    client: reqwest::Client,
    timeout: Duration,
    path: String,
    plaintext: bool,
}

impl WorkerProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: DEFAULT_PING_TIMEOUT,
            path: PING_PATH.to_string(),
            plaintext: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe a different well-known path on the worker.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Ping over plain HTTP. Local development and tests only.
    pub fn with_plaintext(mut self, plaintext: bool) -> Self {
        self.plaintext = plaintext;
        self
    }

    fn ping_url(&self, hostname: &str) -> String {
        let scheme = if self.plaintext { "http" } else { "https" };
        format!("{}://{}{}", scheme, hostname, self.path)
    }

    pub async fn ping(&self, hostname: &str) -> bool {
        let url = self.ping_url(hostname);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(%url, status = %response.status(), "worker ping rejected");
                false
            }
            Err(error) => {
                debug!(%url, %error, "worker ping failed");
                false
            }
        }
    }
}

impl Default for WorkerProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{routing::get, Router};
    use limelight_proto::TunnelStatus;

    fn tunnel_with_count(host_connection_count: Option<u32>) -> Tunnel {
        Tunnel {
            tunnel_id: "tnl-1".to_string(),
            status: Some(TunnelStatus {
                host_connection_count,
            }),
            ..Tunnel::default()
        }
    }

    #[test]
    fn activity_requires_a_defined_nonzero_count() {
        assert!(!is_tunnel_active(&Tunnel::default()));
        assert!(!is_tunnel_active(&tunnel_with_count(None)));
        assert!(!is_tunnel_active(&tunnel_with_count(Some(0))));
        assert!(is_tunnel_active(&tunnel_with_count(Some(1))));
        assert!(is_tunnel_active(&tunnel_with_count(Some(17))));
    }

    struct SingleTunnelService(Option<Tunnel>);

    #[async_trait]
    impl TunnelService for SingleTunnelService {
        async fn create_tunnel(
            &self,
            _spec: &limelight_proto::TunnelSpec,
            _options: &TunnelRequestOptions,
        ) -> Result<Tunnel, TunnelError> {
            unreachable!("not used in liveness tests")
        }

        async fn get_tunnel(
            &self,
            _reference: &TunnelRef,
            _options: &TunnelRequestOptions,
        ) -> Result<Tunnel, TunnelError> {
            self.0.clone().ok_or(TunnelError::NotFound)
        }

        async fn list_tunnels(&self) -> Result<Vec<Tunnel>, TunnelError> {
            Ok(self.0.clone().into_iter().collect())
        }

        async fn delete_tunnel(&self, _reference: &TunnelRef) -> Result<(), TunnelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn is_active_refetches_before_judging() {
        let probe = LivenessProbe::new(Arc::new(SingleTunnelService(Some(tunnel_with_count(
            Some(2),
        )))));
        assert!(probe
            .is_active(&TunnelRef::by_id("tnl-1", "usw2"))
            .await
            .unwrap());

        let probe = LivenessProbe::new(Arc::new(SingleTunnelService(Some(tunnel_with_count(
            Some(0),
        )))));
        assert!(!probe
            .is_active(&TunnelRef::by_id("tnl-1", "usw2"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn vanished_tunnel_reads_as_inactive() {
        let probe = LivenessProbe::new(Arc::new(SingleTunnelService(None)));
        assert!(!probe
            .is_active(&TunnelRef::by_id("gone", "usw2"))
            .await
            .unwrap());
    }

    async fn serve_ping() -> String {
        let app = Router::new().route(PING_PATH, get(|| async { "ok" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("127.0.0.1:{}", addr.port())
    }

    #[tokio::test]
    async fn ping_reports_alive_workers() {
        let hostname = serve_ping().await;
        let probe = WorkerProbe::new()
            .with_plaintext(true)
            .with_timeout(Duration::from_millis(500));
        assert!(probe.ping(&hostname).await);
    }

    #[tokio::test]
    async fn ping_reports_unreachable_workers_as_down() {
        let probe = WorkerProbe::new()
            .with_plaintext(true)
            .with_timeout(Duration::from_millis(200));
        assert!(!probe.ping("127.0.0.1:9").await);
    }

    #[tokio::test]
    async fn ping_reports_error_statuses_as_down() {
        let app = Router::new().route(
            PING_PATH,
            get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "nope") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let probe = WorkerProbe::new()
            .with_plaintext(true)
            .with_timeout(Duration::from_millis(500));
        assert!(!probe.ping(&format!("127.0.0.1:{}", addr.port())).await);
    }
}
