//! Top-level routing orchestration.
//!
//! One `route` call drives the full state machine: parse the workspace
//! identity, authenticate, resolve or create the tunnel, provision a
//! backend worker when the tunnel has no live host, match a session,
//! open the relay, and emit the workbench configuration.

use crate::auth::{AuthManager, SessionEvents, SessionProvider};
use crate::cache::{
    cached_tunnel_ref, store_tunnel_ref, RouteCache, TUNNEL_DEF_KEY, WORKER_HOSTNAME_KEY,
};
use crate::monitor::{WorkerMonitor, DEFAULT_POLL_INTERVAL};
use crate::relay::{FailingSocketFactory, RelayConnector, SocketFactory};
use crate::target::WorkspaceTarget;
use crate::worker::{WorkerControl, WorkerProvisioner, PAT_PATH};
use crate::workbench::{
    PostCreateCommand, WorkbenchOptions, POST_CREATE_COMMAND, REMOTE_AUTHORITY_PREFIX, USER_AGENT,
};
use crate::RouteError;
use chrono::Utc;
use limelight_proto::{
    CachedTunnelRef, FileSyncRequest, ProvisionRequest, TunnelBinding, DEFAULT_REMOTE_PORT,
    DEFAULT_TUNNEL_PORT,
};
use limelight_tunnels::{LivenessProbe, TunnelError, TunnelRegistry, WorkerProbe};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Routing configuration. Scope sets identify the audiences tokens are
/// requested for; ports and intervals default to the service-wide
/// conventions.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub tunnel_scopes: Vec<String>,
    pub management_scopes: Vec<String>,
    pub user_agent: String,
    /// Remote port bound at tunnel creation.
    pub tunnel_port: u16,
    /// Port used when a resolved reference carries none.
    pub default_remote_port: u16,
    pub monitor_interval: Duration,
    pub install_extensions: Vec<String>,
    /// Product version reported to the provisioning API.
    pub version: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            tunnel_scopes: vec!["tunnel-service/.default".to_string()],
            management_scopes: vec!["cloud-management/.default".to_string()],
            user_agent: USER_AGENT.to_string(),
            tunnel_port: DEFAULT_TUNNEL_PORT,
            default_remote_port: DEFAULT_REMOTE_PORT,
            monitor_interval: DEFAULT_POLL_INTERVAL,
            install_extensions: Vec::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Material the caller resolved from its platform metadata layer,
/// forwarded opaquely to provisioning and file sync.
#[derive(Debug, Clone, Default)]
pub struct SyncMaterial {
    pub storage_name: Option<String>,
    pub account_key: Option<String>,
    pub conn_str: Option<String>,
    pub src_url: Option<String>,
}

/// One routing request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Workspace URI authority, `<subscription>+<rg>+<app>+<user>`.
    pub authority: String,
    pub material: SyncMaterial,
}

impl RouteRequest {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            material: SyncMaterial::default(),
        }
    }
}

/// Terminal result of a successful route.
#[derive(Debug)]
pub struct RouteOutcome {
    pub options: WorkbenchOptions,
    /// Authority the workspace folder URI should carry.
    pub folder_authority: String,
    /// Live worker monitor, handed over when the relay did not reach a
    /// stable connection; `None` once the connection is established and
    /// the poll has been cancelled.
    pub monitor: Option<WorkerMonitor>,
}

/// Orchestrates tunnel resolution, worker provisioning, and relay
/// connection for one workspace identity at a time.
///
/// All collaborators are constructed once and injected; nothing here is
/// a process-wide singleton.
pub struct ProvisioningOrchestrator {
    config: RouterConfig,
    registry: TunnelRegistry,
    probe: LivenessProbe,
    cache: Arc<dyn RouteCache>,
    auth: AuthManager,
    sessions: Arc<dyn SessionProvider>,
    provisioner: Arc<dyn WorkerProvisioner>,
    control: Arc<dyn WorkerControl>,
    relay: Arc<dyn RelayConnector>,
    session_events: SessionEvents,
    monitor_probe: WorkerProbe,
}

impl ProvisioningOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RouterConfig,
        registry: TunnelRegistry,
        probe: LivenessProbe,
        cache: Arc<dyn RouteCache>,
        sessions: Arc<dyn SessionProvider>,
        provisioner: Arc<dyn WorkerProvisioner>,
        control: Arc<dyn WorkerControl>,
        relay: Arc<dyn RelayConnector>,
    ) -> Self {
        Self {
            config,
            registry,
            probe,
            cache,
            auth: AuthManager::new(Arc::clone(&sessions)),
            sessions,
            provisioner,
            control,
            relay,
            session_events: SessionEvents::new(),
            monitor_probe: WorkerProbe::new().with_path(PAT_PATH),
        }
    }

    /// Probe the worker monitor should poll with (plaintext for local
    /// development).
    pub fn with_monitor_probe(mut self, probe: WorkerProbe) -> Self {
        self.monitor_probe = probe;
        self
    }

    /// Event source the embedding shell signals when a login completes,
    /// resuming routes suspended on session matching.
    pub fn session_events(&self) -> SessionEvents {
        self.session_events.clone()
    }

    /// Route one workspace to a live backend. `cancel` bounds the
    /// request's lifetime: cancelling while the route waits for a login
    /// yields [`RouteError::LoginRequired`].
    pub async fn route(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, RouteError> {
        // 1. identity
        let target = WorkspaceTarget::parse(&request.authority)?;
        info!(app = %target.app_name, user = %target.user, "routing workspace");

        // 2. authenticate up front so auth failures precede side effects;
        // the management session is consumed by the caller's metadata
        // layer, not here
        let _tunnel_session = self.auth.session_for(&self.config.tunnel_scopes).await?;
        let _management_session = self
            .auth
            .session_for(&self.config.management_scopes)
            .await?;

        // 3. resolve or create the tunnel
        let tunnel = self.resolve_tunnel().await?;
        let remote_port = if tunnel.port != 0 {
            tunnel.port
        } else {
            self.config.default_remote_port
        };

        // 4. an active tunnel means a worker is already serving it
        let active = self.probe.is_active(&tunnel.to_ref()).await?;
        let mut monitor = None;
        if active {
            info!(tunnel = %tunnel.name, "tunnel active; reusing existing backend");
        } else {
            monitor = Some(
                self.provision_worker(&request.authority, &request.material, &tunnel)
                    .await?,
            );
        }
        let new_backend = !active;

        // 6-7. match a session and open the relay
        let socket_factory = self.establish_relay(&tunnel.name, remote_port, cancel).await?;

        // a stable connection settles the worker's fate; otherwise the
        // caller keeps the monitor until it retries
        let monitor = match &socket_factory {
            SocketFactory::Relay(_) => {
                if let Some(monitor) = monitor.take() {
                    monitor.cancel();
                }
                None
            }
            SocketFactory::Failing(_) => monitor,
        };

        // 8. workbench configuration
        let remote_authority = format!("{REMOTE_AUTHORITY_PREFIX}{}", request.authority);
        Ok(RouteOutcome {
            options: WorkbenchOptions {
                remote_authority: remote_authority.clone(),
                socket_factory,
                window_label: format!("Limelight Remote: \"{}\"", target.app_name),
                install_extensions: self.config.install_extensions.clone(),
                post_create: PostCreateCommand {
                    command: POST_CREATE_COMMAND.to_string(),
                    new_backend,
                },
            },
            folder_authority: remote_authority,
            monitor,
        })
    }

    /// Resolve the cached tunnel or create a fresh one. A cached
    /// reference the provider no longer honors is never a hard failure:
    /// it is invalidated and creation takes over.
    async fn resolve_tunnel(&self) -> Result<CachedTunnelRef, RouteError> {
        if let Some(cached) = cached_tunnel_ref(self.cache.as_ref()) {
            match self.registry.find_by_reference(&cached.to_ref()).await {
                Ok(tunnel) => {
                    debug!(tunnel = %tunnel.name, "cached tunnel resolved");
                    return Ok(CachedTunnelRef {
                        tunnel_id: tunnel.tunnel_id.clone(),
                        name: tunnel.name.clone(),
                        cluster_id: tunnel.cluster_id.clone(),
                        port: cached.port,
                        host_token: tunnel.host_token().map(str::to_string),
                    });
                }
                Err(TunnelError::NotFound) => {
                    debug!("cached tunnel vanished; recreating");
                }
                Err(error) => {
                    warn!(%error, "cached tunnel lookup failed; recreating");
                }
            }
            self.cache.remove(TUNNEL_DEF_KEY);
        }

        let tunnel = self
            .registry
            .create_with_port("", self.config.tunnel_port)
            .await?;
        let reference = CachedTunnelRef {
            tunnel_id: tunnel.tunnel_id.clone(),
            name: tunnel.name.clone(),
            cluster_id: tunnel.cluster_id.clone(),
            port: tunnel.first_port().unwrap_or(self.config.tunnel_port),
            host_token: tunnel.host_token().map(str::to_string),
        };
        store_tunnel_ref(self.cache.as_ref(), &reference);
        info!(tunnel = %reference.name, "tunnel created and cached");
        Ok(reference)
    }

    /// Bring up a worker for an inactive tunnel: provision, sync sources,
    /// start the code-server, and leave a liveness poll behind.
    async fn provision_worker(
        &self,
        authority: &str,
        material: &SyncMaterial,
        tunnel: &CachedTunnelRef,
    ) -> Result<WorkerMonitor, RouteError> {
        // whatever hostname is cached belongs to a worker that is no
        // longer hosting this tunnel
        self.cache.remove(WORKER_HOSTNAME_KEY);

        let provision = ProvisionRequest {
            called_when: Utc::now().to_rfc3339(),
            storage_name: material.storage_name.clone(),
            account_key: material.account_key.clone(),
            version: self.config.version.clone(),
        };
        let worker = self
            .provisioner
            .start_session(&provision)
            .await
            .map_err(|error| RouteError::ProvisioningFailed(error.to_string()))?;
        info!(hostname = %worker.hostname, "worker session started");
        self.cache.set(WORKER_HOSTNAME_KEY, &worker.hostname);

        let sync = FileSyncRequest {
            username: authority.to_string(),
            hostname: worker.hostname.clone(),
            conn_str: material.conn_str.clone(),
            account_key: material.account_key.clone(),
            src_url: material.src_url.clone(),
            version: self.config.version.clone(),
        };
        self.provisioner
            .sync_files(&sync)
            .await
            .map_err(|error| RouteError::SyncFailed(error.to_string()))?;

        let binding = TunnelBinding {
            tunnel_id: tunnel.tunnel_id.clone(),
            host_token: tunnel.host_token.clone().unwrap_or_default(),
            tunnel_name: tunnel.name.clone(),
            cluster: tunnel.cluster_id.clone(),
        };
        if let Err(error) = self
            .control
            .start_code_server(&worker.hostname, &binding)
            .await
        {
            // a half-started worker must not be trusted on the next
            // attempt; dropping the hostname forces re-provisioning
            warn!(%error, hostname = %worker.hostname, "code-server start failed");
            self.cache.remove(WORKER_HOSTNAME_KEY);
        }

        Ok(WorkerMonitor::spawn(
            worker.hostname,
            self.monitor_probe.clone(),
            Arc::clone(&self.cache),
            self.config.monitor_interval,
        ))
    }

    /// Match a session to the tunnel and open the relay. No matching
    /// session parks the route until the shell reports a login or the
    /// request is cancelled; transport failures downgrade to a failing
    /// socket factory.
    async fn establish_relay(
        &self,
        tunnel_name: &str,
        remote_port: u16,
        cancel: &CancellationToken,
    ) -> Result<SocketFactory, RouteError> {
        loop {
            let mut arrivals = self.session_events.subscribe();
            let sessions = self
                .sessions
                .sessions(&self.config.tunnel_scopes, false)
                .await
                .map_err(|error| RouteError::AuthFailure(error.to_string()))?;

            match self
                .relay
                .match_session(&sessions, tunnel_name, &self.config.user_agent)
                .await
            {
                Ok(Some(matched)) => {
                    return Ok(match self.relay.connect(&matched, remote_port).await {
                        Ok(handle) => SocketFactory::Relay(handle),
                        Err(error) => {
                            warn!(%error, "relay connect failed; degrading to failing socket factory");
                            SocketFactory::Failing(FailingSocketFactory::new(error.to_string()))
                        }
                    });
                }
                Ok(None) => {
                    info!("no session matches the tunnel; waiting for a login");
                    // surface the provider's interactive flow, non-forced
                    let _ = self
                        .sessions
                        .sessions(&self.config.tunnel_scopes, false)
                        .await;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RouteError::LoginRequired),
                        _ = arrivals.changed() => continue,
                    }
                }
                Err(error) => {
                    warn!(%error, "session matching failed; degrading to failing socket factory");
                    return Ok(SocketFactory::Failing(FailingSocketFactory::new(
                        error.to_string(),
                    )));
                }
            }
        }
    }
}
