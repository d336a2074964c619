//! Workspace target identity parsing.

use crate::RouteError;

/// Identity parsed from a workspace URI authority.
///
/// Authority format: `<subscription>+<resource-group>+<app-name>+<user>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTarget {
    pub subscription: String,
    pub resource_group: String,
    pub app_name: String,
    pub user: String,
}

impl WorkspaceTarget {
    /// Parse an authority; every segment must be present and non-empty.
    pub fn parse(authority: &str) -> Result<Self, RouteError> {
        let segments: Vec<&str> = authority.split('+').collect();
        match segments.as_slice() {
            [subscription, resource_group, app_name, user]
                if !subscription.is_empty()
                    && !resource_group.is_empty()
                    && !app_name.is_empty()
                    && !user.is_empty() =>
            {
                Ok(Self {
                    subscription: subscription.to_string(),
                    resource_group: resource_group.to_string(),
                    app_name: app_name.to_string(),
                    user: user.to_string(),
                })
            }
            _ => Err(RouteError::InvalidRoute(format!(
                "authority {authority:?} is not <subscription>+<resource-group>+<app-name>+<user>"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_authority() {
        let target = WorkspaceTarget::parse("sub-1+rg-east+orders-app+dana").unwrap();
        assert_eq!(target.subscription, "sub-1");
        assert_eq!(target.resource_group, "rg-east");
        assert_eq!(target.app_name, "orders-app");
        assert_eq!(target.user, "dana");
    }

    #[test]
    fn rejects_missing_or_empty_segments() {
        for authority in [
            "",
            "sub-1",
            "sub-1+rg-east",
            "sub-1+rg-east+orders-app",
            "sub-1++orders-app+dana",
            "sub-1+rg-east+orders-app+dana+extra",
        ] {
            let error = WorkspaceTarget::parse(authority).unwrap_err();
            assert!(matches!(error, RouteError::InvalidRoute(_)), "{authority}");
        }
    }
}
