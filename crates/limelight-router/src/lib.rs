//! Routing orchestration for the limelight bridge.
//!
//! Takes a workspace URI authority, resolves or creates its relay
//! tunnel, provisions a backend worker when none is serving, matches an
//! authenticated session, and assembles the workbench configuration the
//! embedding shell needs to open the remote connection.

pub mod auth;
pub mod cache;
pub mod error;
pub mod monitor;
pub mod orchestrator;
pub mod relay;
pub mod target;
pub mod worker;
pub mod workbench;

pub use auth::{AuthManager, SessionError, SessionEvents, SessionProvider};
pub use cache::{
    cached_tunnel_ref, store_tunnel_ref, FileRouteCache, MemoryRouteCache, RouteCache,
    TUNNEL_DEF_KEY, WORKER_HOSTNAME_KEY,
};
pub use error::RouteError;
pub use monitor::{WorkerMonitor, DEFAULT_POLL_INTERVAL};
pub use orchestrator::{
    ProvisioningOrchestrator, RouteOutcome, RouteRequest, RouterConfig, SyncMaterial,
};
pub use relay::{
    FailingSocketFactory, MatchedTunnel, RelayConnector, RelayError, RelayHandle, SocketFactory,
};
pub use target::WorkspaceTarget;
pub use worker::{
    HttpWorkerApi, WorkerControl, WorkerError, WorkerProvisioner, CODE_SERVER_START_PATH,
    FILE_SYNC_PATH, PAT_PATH, SESSION_START_PATH,
};
pub use workbench::{
    rewrite_resource_uri, PostCreateCommand, WorkbenchOptions, LOOPBACK_PATH,
    POST_CREATE_COMMAND, REMOTE_AUTHORITY_PREFIX, USER_AGENT,
};
