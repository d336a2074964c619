//! HTTP implementation of the tunnel-management seam.

use crate::service::{AccessTokenProvider, TunnelService};
use crate::TunnelError;
use async_trait::async_trait;
use limelight_proto::{Tunnel, TunnelRef, TunnelRequestOptions, TunnelSpec};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::debug;

/// Tunnel-management REST client.
///
/// One `reqwest::Client` per instance; construct once at setup and share
/// by `Arc` across routing flows.
pub struct HttpTunnelService {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl HttpTunnelService {
    /// `base_url` without a trailing slash; `user_agent` identifies the
    /// embedding product to the service.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, TunnelError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/tunnels", self.base_url)
    }

    fn reference_url(&self, reference: &TunnelRef) -> String {
        match reference {
            TunnelRef::ById {
                tunnel_id,
                cluster_id,
            } => format!("{}/tunnels/{}/{}", self.base_url, cluster_id, tunnel_id),
            TunnelRef::ByName { name } => format!("{}/tunnels/{}", self.base_url, name),
        }
    }

    fn query(options: &TunnelRequestOptions) -> Vec<(&'static str, String)> {
        vec![
            ("tokenScopes", options.token_scopes.join(",")),
            ("includePorts", options.include_ports.to_string()),
        ]
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, TunnelError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(TunnelError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => Err(TunnelError::QuotaExceeded),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(TunnelError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl TunnelService for HttpTunnelService {
    async fn create_tunnel(
        &self,
        spec: &TunnelSpec,
        options: &TunnelRequestOptions,
    ) -> Result<Tunnel, TunnelError> {
        let bearer = self.tokens.bearer().await?;
        debug!(name = %spec.name, "creating tunnel");
        let response = self
            .client
            .post(self.collection_url())
            .header(reqwest::header::AUTHORIZATION, bearer)
            .query(&Self::query(options))
            .json(spec)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn get_tunnel(
        &self,
        reference: &TunnelRef,
        options: &TunnelRequestOptions,
    ) -> Result<Tunnel, TunnelError> {
        let bearer = self.tokens.bearer().await?;
        let response = self
            .client
            .get(self.reference_url(reference))
            .header(reqwest::header::AUTHORIZATION, bearer)
            .query(&Self::query(options))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, TunnelError> {
        let bearer = self.tokens.bearer().await?;
        let response = self
            .client
            .get(self.collection_url())
            .header(reqwest::header::AUTHORIZATION, bearer)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn delete_tunnel(&self, reference: &TunnelRef) -> Result<(), TunnelError> {
        let bearer = self.tokens.bearer().await?;
        let response = self
            .client
            .delete(self.reference_url(reference))
            .header(reqwest::header::AUTHORIZATION, bearer)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }
}
