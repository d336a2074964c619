//! Limelight Bridge Contract Definitions
//!
//! This crate defines the shared data model for the remote-development
//! bridge: tunnel contracts exchanged with the relay tunnel-management
//! service, backend worker descriptors, and the authentication session
//! shape consumed from the identity provider. Pure types, no I/O.

pub mod session;
pub mod tunnel;
pub mod worker;

pub use session::AuthSession;
pub use tunnel::{
    CachedTunnelRef, Tunnel, TunnelAccessControl, TunnelAccessEntry, TunnelAccessEntryType,
    TunnelBinding, TunnelPort, TunnelRef, TunnelRequestOptions, TunnelSpec, TunnelStatus,
};
pub use worker::{FileSyncRequest, ProvisionRequest, ProvisionResponse, WorkerDescriptor};

/// Remote port a freshly created tunnel binds for the code-server process.
pub const DEFAULT_TUNNEL_PORT: u16 = 8000;

/// Fallback remote port when a resolved tunnel reference carries none.
pub const DEFAULT_REMOTE_PORT: u16 = 31545;

/// Token scope under which the host credential is issued.
pub const HOST_SCOPE: &str = "host";
