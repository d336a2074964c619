//! REST implementation of the container-fleet seam.

use crate::fleet::{ContainerApp, ContainerFleet, CredentialSource, FleetError, FleetProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How long `delete_and_wait` polls before giving up on a container.
const DELETE_POLL_ATTEMPTS: usize = 60;
const DELETE_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerPage {
    #[serde(default)]
    value: Vec<ContainerRecord>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainerRecord {
    name: String,
    #[serde(default)]
    configuration: Option<RecordConfiguration>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordConfiguration {
    #[serde(default)]
    ingress: Option<RecordIngress>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordIngress {
    #[serde(default)]
    fqdn: Option<String>,
}

/// Management REST client scoped to one resource group. The bearer
/// credential is resolved at connect time and fixed for the client's
/// lifetime; [`RestFleetProvider`] rebuilds the whole client to refresh
/// it.
pub struct RestFleet {
    client: reqwest::Client,
    base_url: String,
    resource_group: String,
    bearer: String,
}

impl RestFleet {
    pub fn new(
        base_url: impl Into<String>,
        resource_group: impl Into<String>,
        bearer: String,
    ) -> Result<Self, FleetError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource_group: resource_group.into(),
            bearer,
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/resourceGroups/{}/containerApps",
            self.base_url, self.resource_group
        )
    }

    fn container_url(&self, name: &str) -> String {
        format!("{}/{}", self.collection_url(), name)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, FleetError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(FleetError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ContainerFleet for RestFleet {
    async fn list(&self) -> Result<Vec<ContainerApp>, FleetError> {
        let mut containers = Vec::new();
        let mut url = self.collection_url();
        loop {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, &self.bearer)
                .send()
                .await?;
            let page: ContainerPage = Self::checked(response).await?.json().await?;

            for record in page.value {
                let hostname = record
                    .configuration
                    .and_then(|c| c.ingress)
                    .and_then(|i| i.fqdn);
                match hostname {
                    Some(hostname) if !hostname.is_empty() => containers.push(ContainerApp {
                        name: record.name,
                        hostname,
                    }),
                    _ => {
                        // no ingress means nothing to ping and nothing
                        // serving; leave it for the platform to report
                        warn!(container = %record.name, "skipping container without ingress");
                    }
                }
            }

            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }
        debug!(count = containers.len(), "listed worker containers");
        Ok(containers)
    }

    async fn delete_and_wait(&self, name: &str) -> Result<(), FleetError> {
        let response = self
            .client
            .delete(self.container_url(name))
            .header(reqwest::header::AUTHORIZATION, &self.bearer)
            .send()
            .await?;
        Self::checked(response).await?;

        for _ in 0..DELETE_POLL_ATTEMPTS {
            let response = self
                .client
                .get(self.container_url(name))
                .header(reqwest::header::AUTHORIZATION, &self.bearer)
                .send()
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(());
            }
            tokio::time::sleep(DELETE_POLL_INTERVAL).await;
        }
        Err(FleetError::DeletionTimeout {
            name: name.to_string(),
        })
    }
}

/// Provider that mints a fresh credential and client per `connect`.
pub struct RestFleetProvider {
    base_url: String,
    resource_group: String,
    credentials: Arc<dyn CredentialSource>,
}

impl RestFleetProvider {
    pub fn new(
        base_url: impl Into<String>,
        resource_group: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            resource_group: resource_group.into(),
            credentials,
        }
    }
}

#[async_trait]
impl FleetProvider for RestFleetProvider {
    async fn connect(&self) -> Result<Box<dyn ContainerFleet>, FleetError> {
        let bearer = self.credentials.bearer().await?;
        Ok(Box::new(RestFleet::new(
            self.base_url.clone(),
            self.resource_group.clone(),
            bearer,
        )?))
    }
}
