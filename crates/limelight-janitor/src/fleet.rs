//! Container-fleet collaborator seam.
//!
//! The management platform's enumeration specifics stay behind these
//! traits; the sweep only needs "list the fleet" and "delete and wait".

use async_trait::async_trait;
use thiserror::Error;

/// One backend worker container as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerApp {
    pub name: String,
    /// Ingress FQDN the health ping targets.
    pub hostname: String,
}

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("fleet API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("fleet transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no management credential available: {0}")]
    Credential(String),

    #[error("container {name} still present after deletion wait")]
    DeletionTimeout { name: String },
}

/// Management surface over the worker-container fleet.
#[async_trait]
pub trait ContainerFleet: Send + Sync {
    async fn list(&self) -> Result<Vec<ContainerApp>, FleetError>;

    /// Delete a container and wait until the platform reports it gone.
    async fn delete_and_wait(&self, name: &str) -> Result<(), FleetError>;
}

/// Builds fleet clients. Invoked again mid-sweep when the first listing
/// fails, which re-resolves the credential (the common cause is an
/// expired managed-identity token).
#[async_trait]
pub trait FleetProvider: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ContainerFleet>, FleetError>;
}

/// Supplies the bearer credential for management calls.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Full header value, e.g. `Bearer <token>`.
    async fn bearer(&self) -> Result<String, FleetError>;
}

/// A fixed management token.
pub struct StaticCredential(pub String);

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn bearer(&self) -> Result<String, FleetError> {
        Ok(format!("Bearer {}", self.0))
    }
}
