//! Authentication session shape consumed from the identity provider.

use serde::{Deserialize, Serialize};

/// An authenticated session handed out by the external identity provider.
/// Consumed, never minted, by this workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: String,
    pub access_token: String,
    pub account: String,
    pub scopes: Vec<String>,
}
