//! Workbench configuration emitted after a successful route.

use crate::relay::SocketFactory;

/// Scheme prefix that marks an authority as limelight-routed.
pub const REMOTE_AUTHORITY_PREFIX: &str = "limelight+";

/// User agent presented when matching sessions to tunnels.
pub const USER_AGENT: &str = "limelight-remote-web";

/// Command the shell runs once the workbench exists.
pub const POST_CREATE_COMMAND: &str = "limelight.panel.start";

/// Path on the hosting page through which loopback resources are proxied.
pub const LOOPBACK_PATH: &str = "/loopback";

/// Everything the embedding shell needs to open the remote workbench.
#[derive(Debug, Clone)]
pub struct WorkbenchOptions {
    pub remote_authority: String,
    pub socket_factory: SocketFactory,
    /// Label shown in the window indicator.
    pub window_label: String,
    /// Extensions installed on the remote at first connect.
    pub install_extensions: Vec<String>,
    pub post_create: PostCreateCommand,
}

/// Post-creation notification telling the UI whether this route
/// provisioned a new backend or attached to an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCreateCommand {
    pub command: String,
    pub new_backend: bool,
}

/// Rewrite a resource URI so the workbench fetches it through the relay
/// loopback responder on the hosting page's origin.
pub fn rewrite_resource_uri(page_scheme: &str, page_host: &str, uri: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(uri.as_bytes()).collect();
    format!("{page_scheme}://{page_host}{LOOPBACK_PATH}?uri={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_uris_proxy_through_the_loopback_path() {
        let rewritten = rewrite_resource_uri(
            "https",
            "bridge.example.dev",
            "vscode-remote://limelight+a+b+c+d/ext/icon.png",
        );
        assert!(rewritten.starts_with("https://bridge.example.dev/loopback?uri="));
        // the original URI survives percent-encoding
        assert!(rewritten.contains("vscode-remote"));
        assert!(!rewritten.contains("://limelight+"));
    }
}
