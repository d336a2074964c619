//! Relay connection establishment and graceful degradation.

use async_trait::async_trait;
use limelight_proto::{AuthSession, Tunnel};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("relay transport failure: {0}")]
pub struct RelayError(pub String);

/// A session paired with the live tunnel it can host.
#[derive(Debug, Clone)]
pub struct MatchedTunnel {
    pub session: AuthSession,
    pub tunnel: Tunnel,
}

/// External relay transport: session matching and stream establishment.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Find a session able to host the named tunnel under this user
    /// agent. `None` means the user must log in first.
    async fn match_session(
        &self,
        sessions: &[AuthSession],
        tunnel_name: &str,
        user_agent: &str,
    ) -> Result<Option<MatchedTunnel>, RelayError>;

    /// Open the relay bound to the matched session and remote port.
    async fn connect(
        &self,
        matched: &MatchedTunnel,
        remote_port: u16,
    ) -> Result<RelayHandle, RelayError>;
}

/// Live relay connection surface handed to the workbench. Loopback
/// traffic for the worker's local ports is addressed through this handle.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    pub tunnel_name: String,
    pub remote_port: u16,
    pub session_id: String,
}

/// Socket factory that always fails with the captured transport error,
/// so the failure surfaces through the workbench's normal
/// connection-lost UI instead of an unhandled rejection.
#[derive(Debug, Clone)]
pub struct FailingSocketFactory {
    error: String,
}

impl FailingSocketFactory {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    /// Every creation attempt reports the captured error.
    pub fn create(&self) -> Result<RelayHandle, RelayError> {
        Err(RelayError(self.error.clone()))
    }
}

/// What the workbench plugs its websocket layer into.
#[derive(Debug, Clone)]
pub enum SocketFactory {
    Relay(RelayHandle),
    Failing(FailingSocketFactory),
}

impl SocketFactory {
    pub fn is_failing(&self) -> bool {
        matches!(self, SocketFactory::Failing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_factory_repeats_the_captured_error() {
        let factory = FailingSocketFactory::new("relay unreachable");
        for _ in 0..3 {
            let error = factory.create().unwrap_err();
            assert_eq!(error.0, "relay unreachable");
        }
    }
}
