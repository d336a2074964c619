//! Tunnel contracts for the relay tunnel-management service.
//!
//! Field names follow the service's wire shape (camelCase JSON).

use crate::HOST_SCOPE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A relay-routable endpoint identity as reported by the tunnel service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tunnel {
    /// Opaque provider-assigned identifier.
    pub tunnel_id: String,
    /// Region/cluster the tunnel is homed in.
    #[serde(default)]
    pub cluster_id: String,
    /// Unique within the account; user-chosen or random.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<TunnelPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control: Option<TunnelAccessControl>,
    /// Credentials issued per scope; the host token lives under `"host"`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub access_tokens: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TunnelStatus>,
}

impl Tunnel {
    /// Credential allowing a client to accept host connections, if issued.
    pub fn host_token(&self) -> Option<&str> {
        self.access_tokens.get(HOST_SCOPE).map(String::as_str)
    }

    /// The single bound remote port, when ports were included.
    pub fn first_port(&self) -> Option<u16> {
        self.ports.first().map(|p| p.port_number)
    }
}

/// Connection counters reported by the service; liveness derives from these.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_connection_count: Option<u32>,
}

/// One port binding on a tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelPort {
    pub port_number: u16,
    pub protocol: String,
}

impl TunnelPort {
    /// Port binding with protocol auto-detection.
    pub fn auto(port_number: u16) -> Self {
        Self {
            port_number,
            protocol: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelAccessControl {
    pub entries: Vec<TunnelAccessEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelAccessEntry {
    #[serde(rename = "type")]
    pub entry_type: TunnelAccessEntryType,
    pub subjects: Vec<String>,
    pub scopes: Vec<String>,
}

impl TunnelAccessEntry {
    /// Anonymous entry granting host access, the default for new tunnels.
    pub fn anonymous_host() -> Self {
        Self {
            entry_type: TunnelAccessEntryType::Anonymous,
            subjects: Vec::new(),
            scopes: vec![HOST_SCOPE.to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunnelAccessEntryType {
    Anonymous,
}

/// Creation payload for a new tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSpec {
    pub name: String,
    pub ports: Vec<TunnelPort>,
    pub access_control: TunnelAccessControl,
}

impl TunnelSpec {
    /// Spec with one auto-protocol port and anonymous host access.
    pub fn with_port(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            ports: vec![TunnelPort::auto(port)],
            access_control: TunnelAccessControl {
                entries: vec![TunnelAccessEntry::anonymous_host()],
            },
        }
    }
}

/// Options attached to every tunnel-management request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelRequestOptions {
    pub token_scopes: Vec<String>,
    pub include_ports: bool,
}

impl TunnelRequestOptions {
    /// Host token scope with port listings included.
    pub fn host() -> Self {
        Self {
            token_scopes: vec![HOST_SCOPE.to_string()],
            include_ports: true,
        }
    }
}

impl Default for TunnelRequestOptions {
    fn default() -> Self {
        Self::host()
    }
}

/// How a tunnel is addressed on lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelRef {
    ById { tunnel_id: String, cluster_id: String },
    ByName { name: String },
}

impl TunnelRef {
    pub fn by_id(tunnel_id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self::ById {
            tunnel_id: tunnel_id.into(),
            cluster_id: cluster_id.into(),
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName { name: name.into() }
    }

    /// Reference addressing an already-resolved tunnel.
    pub fn of(tunnel: &Tunnel) -> Self {
        Self::ById {
            tunnel_id: tunnel.tunnel_id.clone(),
            cluster_id: tunnel.cluster_id.clone(),
        }
    }
}

/// Locally persisted record of a created tunnel, read on each routing
/// attempt before calling the registry. Advisory: invalidated whenever a
/// lookup against it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTunnelRef {
    pub tunnel_id: String,
    pub name: String,
    pub cluster_id: String,
    pub port: u16,
    /// Host credential of a freshly minted tunnel. Never persisted; a
    /// lookup with host token scope re-issues it.
    #[serde(skip)]
    pub host_token: Option<String>,
}

impl CachedTunnelRef {
    pub fn to_ref(&self) -> TunnelRef {
        TunnelRef::ById {
            tunnel_id: self.tunnel_id.clone(),
            cluster_id: self.cluster_id.clone(),
        }
    }
}

/// Payload handed to a worker so its code-server can bind the tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelBinding {
    pub tunnel_id: String,
    pub host_token: String,
    pub tunnel_name: String,
    pub cluster: String,
}
