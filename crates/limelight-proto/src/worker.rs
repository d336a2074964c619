//! Backend worker contracts: provisioning, file sync, control plane.

use serde::{Deserialize, Serialize};

/// One provisioned compute unit, addressed by its ingress FQDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub name: String,
    pub hostname: String,
}

/// Request to start (or locate) a worker for a logical identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    /// Wall-clock timestamp of the triggering request, RFC 3339.
    pub called_when: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,
    pub version: String,
}

/// Provisioning response envelope; the hostname sits deep in the
/// container's ingress configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionResponse {
    pub data: ProvisionedContainer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionedContainer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub configuration: Option<ContainerConfiguration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerConfiguration {
    #[serde(default)]
    pub ingress: Option<ContainerIngress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerIngress {
    #[serde(default)]
    pub fqdn: Option<String>,
}

impl ProvisionResponse {
    /// Ingress hostname, when the platform reported one.
    pub fn hostname(&self) -> Option<&str> {
        self.data
            .configuration
            .as_ref()
            .and_then(|c| c.ingress.as_ref())
            .and_then(|i| i.fqdn.as_deref())
            .filter(|fqdn| !fqdn.is_empty())
    }
}

/// Request to materialize a user's source tree into a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncRequest {
    pub username: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,
    #[serde(
        rename = "srcURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub src_url: Option<String>,
    pub version: String,
}
