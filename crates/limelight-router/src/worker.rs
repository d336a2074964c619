//! Backend worker provisioning and control-plane clients.

use async_trait::async_trait;
use limelight_proto::{
    FileSyncRequest, ProvisionRequest, ProvisionResponse, TunnelBinding, WorkerDescriptor,
};
use thiserror::Error;
use tracing::{debug, info};

/// Provisioning API path that starts (or locates) a worker session.
pub const SESSION_START_PATH: &str = "/limelight/session/start";

/// Provisioning API path that materializes user sources into a worker.
pub const FILE_SYNC_PATH: &str = "/limelight/file/sync";

/// Control-plane path on the worker that launches its code-server.
pub const CODE_SERVER_START_PATH: &str = "/limelight/code-server/start";

/// Control-plane path the monitor polls for an alive signal.
pub const PAT_PATH: &str = "/limelight/pat";

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The platform answered but reported no ingress hostname; the
    /// worker is unreachable and the route cannot proceed.
    #[error("provisioning response carried no ingress hostname")]
    MissingHostname,

    #[error("worker API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("worker transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Provisioning API: brings up a worker and syncs sources into it.
#[async_trait]
pub trait WorkerProvisioner: Send + Sync {
    /// Start or locate a worker for this logical identity; yields its
    /// ingress hostname.
    async fn start_session(
        &self,
        request: &ProvisionRequest,
    ) -> Result<WorkerDescriptor, WorkerError>;

    async fn sync_files(&self, request: &FileSyncRequest) -> Result<(), WorkerError>;
}

/// Control plane reached at the worker's own hostname.
#[async_trait]
pub trait WorkerControl: Send + Sync {
    /// Hand the worker its tunnel binding so the remote code-server can
    /// attach to the tunnel's port.
    async fn start_code_server(
        &self,
        hostname: &str,
        binding: &TunnelBinding,
    ) -> Result<(), WorkerError>;
}

/// HTTP client for both the provisioning API and worker control planes.
pub struct HttpWorkerApi {
    client: reqwest::Client,
    provisioning_base: String,
    plaintext: bool,
}

impl HttpWorkerApi {
    pub fn new(provisioning_base: impl Into<String>) -> Result<Self, WorkerError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            provisioning_base: provisioning_base.into().trim_end_matches('/').to_string(),
            plaintext: false,
        })
    }

    /// Talk to workers over plain HTTP. Local development only.
    pub fn with_plaintext(mut self, plaintext: bool) -> Self {
        self.plaintext = plaintext;
        self
    }

    fn worker_url(&self, hostname: &str, path: &str) -> String {
        let scheme = if self.plaintext { "http" } else { "https" };
        format!("{scheme}://{hostname}{path}")
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, WorkerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(WorkerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl WorkerProvisioner for HttpWorkerApi {
    async fn start_session(
        &self,
        request: &ProvisionRequest,
    ) -> Result<WorkerDescriptor, WorkerError> {
        info!("starting limelight worker session");
        let response = self
            .client
            .post(format!("{}{}", self.provisioning_base, SESSION_START_PATH))
            .json(request)
            .send()
            .await?;
        let body: ProvisionResponse = Self::checked(response).await?.json().await?;

        let hostname = body
            .hostname()
            .ok_or(WorkerError::MissingHostname)?
            .to_string();
        debug!(%hostname, "worker session started");
        Ok(WorkerDescriptor {
            name: body.data.name.unwrap_or_default(),
            hostname,
        })
    }

    async fn sync_files(&self, request: &FileSyncRequest) -> Result<(), WorkerError> {
        info!(hostname = %request.hostname, "syncing user sources into worker");
        let response = self
            .client
            .post(format!("{}{}", self.provisioning_base, FILE_SYNC_PATH))
            .json(request)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkerControl for HttpWorkerApi {
    async fn start_code_server(
        &self,
        hostname: &str,
        binding: &TunnelBinding,
    ) -> Result<(), WorkerError> {
        info!(%hostname, tunnel = %binding.tunnel_name, "starting code-server on worker");
        let response = self
            .client
            .post(self.worker_url(hostname, CODE_SERVER_START_PATH))
            .json(binding)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}", addr.port())
    }

    fn provision_request() -> ProvisionRequest {
        ProvisionRequest {
            called_when: "2026-08-06T12:00:00Z".to_string(),
            storage_name: None,
            account_key: None,
            version: "1.0.0".to_string(),
        }
    }

    #[tokio::test]
    async fn start_session_extracts_the_ingress_hostname() {
        let app = Router::new().route(
            SESSION_START_PATH,
            post(|| async {
                Json(json!({
                    "data": {
                        "name": "limelight-w7",
                        "configuration": {"ingress": {"fqdn": "w7.example"}}
                    }
                }))
            }),
        );
        let base = serve(app).await;
        let api = HttpWorkerApi::new(base).unwrap();

        let worker = api.start_session(&provision_request()).await.unwrap();
        assert_eq!(worker.hostname, "w7.example");
        assert_eq!(worker.name, "limelight-w7");
    }

    #[tokio::test]
    async fn start_session_without_fqdn_is_a_missing_hostname() {
        let app = Router::new().route(
            SESSION_START_PATH,
            post(|| async { Json(json!({"data": {"name": "limelight-w7"}})) }),
        );
        let base = serve(app).await;
        let api = HttpWorkerApi::new(base).unwrap();

        let error = api.start_session(&provision_request()).await.unwrap_err();
        assert!(matches!(error, WorkerError::MissingHostname));
    }

    #[tokio::test]
    async fn code_server_start_posts_the_tunnel_binding() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let app = Router::new().route(
            CODE_SERVER_START_PATH,
            post(move |Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().await = Some(body);
                    "ok"
                }
            }),
        );
        let base = serve(app).await;
        let hostname = base.trim_start_matches("http://").to_string();
        let api = HttpWorkerApi::new("http://unused.example")
            .unwrap()
            .with_plaintext(true);

        let binding = TunnelBinding {
            tunnel_id: "tnl-9".to_string(),
            host_token: "host-secret".to_string(),
            tunnel_name: "quiet-lake".to_string(),
            cluster: "usw2".to_string(),
        };
        api.start_code_server(&hostname, &binding).await.unwrap();

        let body = seen.lock().await.take().unwrap();
        assert_eq!(body["tunnelId"], "tnl-9");
        assert_eq!(body["hostToken"], "host-secret");
        assert_eq!(body["tunnelName"], "quiet-lake");
        assert_eq!(body["cluster"], "usw2");
    }

    #[tokio::test]
    async fn error_statuses_surface_as_api_errors() {
        let app = Router::new().route(
            FILE_SYNC_PATH,
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "sync backend down") }),
        );
        let base = serve(app).await;
        let api = HttpWorkerApi::new(base).unwrap();

        let request = FileSyncRequest {
            username: "sub+rg+app+dana".to_string(),
            hostname: "w7.example".to_string(),
            conn_str: None,
            account_key: None,
            src_url: None,
            version: "1.0.0".to_string(),
        };
        let error = api.sync_files(&request).await.unwrap_err();
        match error {
            WorkerError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "sync backend down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
