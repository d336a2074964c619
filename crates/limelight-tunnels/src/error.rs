//! Tunnel service error taxonomy.

use thiserror::Error;

/// Errors surfaced by the tunnel-management service and registry.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The provider no longer has the tunnel (evicted by a quota sweep or
    /// deleted out of band). Expected and handled: callers fall through to
    /// creation instead of failing the route.
    #[error("tunnel not found")]
    NotFound,

    /// HTTP 429: the account's open-tunnel quota is exhausted.
    #[error("tunnel quota exceeded")]
    QuotaExceeded,

    #[error("tunnel service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("tunnel service transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no bearer credential available: {0}")]
    Credential(String),
}

impl TunnelError {
    /// Quota failures get the evict-inactive recovery before a retry.
    pub fn is_quota(&self) -> bool {
        matches!(self, TunnelError::QuotaExceeded)
    }
}
