//! Session acquisition against the external identity provider.

use crate::RouteError;
use async_trait::async_trait;
use limelight_proto::AuthSession;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Identity-provider failure, mapped to [`RouteError::AuthFailure`] by
/// the routing flow.
#[derive(Debug, Error)]
#[error("session provider error: {0}")]
pub struct SessionError(pub String);

/// External identity provider handing out authenticated sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Sessions matching the scope set. `force_new` demands a fresh
    /// interactive login instead of reusing silent state; the routing
    /// flow never forces.
    async fn sessions(
        &self,
        scopes: &[String],
        force_new: bool,
    ) -> Result<Vec<AuthSession>, SessionError>;
}

/// Resolves one usable session per scope set.
pub struct AuthManager {
    provider: Arc<dyn SessionProvider>,
}

impl AuthManager {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    /// First existing session for the scope set; otherwise one non-forced
    /// request (which surfaces the provider's interactive flow). Zero
    /// sessions after that is an auth failure, fatal for the request.
    pub async fn session_for(&self, scopes: &[String]) -> Result<AuthSession, RouteError> {
        let current = self
            .provider
            .sessions(scopes, false)
            .await
            .map_err(|error| RouteError::AuthFailure(error.to_string()))?;
        if let Some(session) = current.into_iter().next() {
            return Ok(session);
        }

        let fresh = self
            .provider
            .sessions(scopes, false)
            .await
            .map_err(|error| RouteError::AuthFailure(error.to_string()))?;
        fresh.into_iter().next().ok_or_else(|| {
            RouteError::AuthFailure(format!(
                "no session available for scopes {scopes:?}; log in and retry"
            ))
        })
    }
}

/// Broadcasts session arrival so suspended routing requests can resume
/// matching without busy-waiting.
///
/// Subscribe *before* inspecting current sessions: any login completing
/// after the subscription is observed by `changed()`, so no arrival is
/// lost between the check and the wait.
#[derive(Clone)]
pub struct SessionEvents {
    versions: Arc<watch::Sender<u64>>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            versions: Arc::new(tx),
        }
    }

    /// Called by the embedding shell when the user completes a login.
    pub fn session_created(&self) {
        self.versions.send_modify(|v| *v = v.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.versions.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn session(id: &str) -> AuthSession {
        AuthSession {
            id: id.to_string(),
            access_token: format!("token-{id}"),
            account: "dana@example.dev".to_string(),
            scopes: vec!["tunnel-service/.default".to_string()],
        }
    }

    /// Returns scripted batches, one per call.
    struct ScriptedProvider {
        batches: Mutex<Vec<Vec<AuthSession>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(batches: Vec<Vec<AuthSession>>) -> Self {
            Self {
                batches: Mutex::new(batches),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SessionProvider for ScriptedProvider {
        async fn sessions(
            &self,
            _scopes: &[String],
            _force_new: bool,
        ) -> Result<Vec<AuthSession>, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(batches.remove(0))
            }
        }
    }

    #[tokio::test]
    async fn existing_session_wins_without_a_second_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![session("s1")]]));
        let auth = AuthManager::new(Arc::clone(&provider) as Arc<dyn SessionProvider>);

        let resolved = auth
            .session_for(&["tunnel-service/.default".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved.id, "s1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_one_fresh_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![], vec![session("s2")]]));
        let auth = AuthManager::new(Arc::clone(&provider) as Arc<dyn SessionProvider>);

        let resolved = auth.session_for(&[]).await.unwrap();
        assert_eq!(resolved.id, "s2");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_sessions_at_all_is_an_auth_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let auth = AuthManager::new(provider);

        let error = auth.session_for(&[]).await.unwrap_err();
        assert!(matches!(error, RouteError::AuthFailure(_)));
    }

    #[tokio::test]
    async fn arrivals_after_subscribe_are_observed() {
        let events = SessionEvents::new();
        let mut arrivals = events.subscribe();

        events.session_created();
        arrivals.changed().await.unwrap();
    }
}
