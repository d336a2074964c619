//! Routing error taxonomy.

use limelight_tunnels::TunnelError;
use thiserror::Error;

/// Errors a routing request can surface to its caller.
///
/// Stage-local failures with a known recovery (cached tunnel not found,
/// quota exceeded, worker ping failure) are handled inline and never
/// appear here; relay transport failures degrade into a failing socket
/// factory instead of an error.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Malformed or incomplete workspace identity. Never retried.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// No usable auth session for a required scope set.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Worker provisioning returned no usable worker.
    #[error("worker provisioning failed: {0}")]
    ProvisioningFailed(String),

    /// Source materialization into the worker failed.
    #[error("file sync failed: {0}")]
    SyncFailed(String),

    /// The routing request was cancelled while suspended waiting for the
    /// user to complete a login.
    #[error("login required: no session matched the tunnel")]
    LoginRequired,

    #[error(transparent)]
    Tunnel(#[from] TunnelError),
}
