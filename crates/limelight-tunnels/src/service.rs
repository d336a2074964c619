//! Seam to the relay tunnel-management service.

use crate::TunnelError;
use async_trait::async_trait;
use limelight_proto::{Tunnel, TunnelRef, TunnelRequestOptions, TunnelSpec};

/// Supplies the `Authorization` header value for tunnel-management calls.
///
/// Injected once at construction and shared by reference, so tests can
/// stand in a fake and token refresh stays out of the request path.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Full header value, e.g. `Bearer <token>`.
    async fn bearer(&self) -> Result<String, TunnelError>;
}

/// A fixed access token. Suits short-lived flows where the caller already
/// resolved a session, and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn bearer(&self) -> Result<String, TunnelError> {
        Ok(format!("Bearer {}", self.0))
    }
}

/// CRUD surface of the tunnel-management service.
#[async_trait]
pub trait TunnelService: Send + Sync {
    async fn create_tunnel(
        &self,
        spec: &TunnelSpec,
        options: &TunnelRequestOptions,
    ) -> Result<Tunnel, TunnelError>;

    /// Resolve a tunnel by id+cluster or by name. `NotFound` when the
    /// provider no longer has it.
    async fn get_tunnel(
        &self,
        reference: &TunnelRef,
        options: &TunnelRequestOptions,
    ) -> Result<Tunnel, TunnelError>;

    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, TunnelError>;

    async fn delete_tunnel(&self, reference: &TunnelRef) -> Result<(), TunnelError>;
}
