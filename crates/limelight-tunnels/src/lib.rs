//! Tunnel lifecycle management for the limelight bridge.
//!
//! CRUD over named relay tunnels, liveness probing for tunnels and
//! backend workers, and the quota-aware retry policy used when tunnel
//! creation races the provider's per-account limits.

pub mod error;
pub mod http;
pub mod liveness;
pub mod registry;
pub mod retry;
pub mod service;

pub use error::TunnelError;
pub use http::HttpTunnelService;
pub use liveness::{is_tunnel_active, LivenessProbe, WorkerProbe, DEFAULT_PING_TIMEOUT, PING_PATH};
pub use registry::{random_tunnel_name, TunnelRegistry};
pub use retry::{Recovery, RetryPolicy};
pub use service::{AccessTokenProvider, StaticToken, TunnelService};
