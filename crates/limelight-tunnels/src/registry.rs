//! CRUD over named relay tunnels.

use crate::liveness::is_tunnel_active;
use crate::retry::{Recovery, RetryPolicy};
use crate::service::TunnelService;
use crate::TunnelError;
use futures::future::join_all;
use limelight_proto::{Tunnel, TunnelRef, TunnelRequestOptions, TunnelSpec};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Length of generated tunnel names.
const NAME_LENGTH: usize = 32;

/// Random lowercase-alphanumeric tunnel name, unique enough per account.
pub fn random_tunnel_name() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..NAME_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Tunnel CRUD with quota-aware creation.
///
/// Creation is rate/quota-limited per account, and the dominant failure
/// mode is "too many open tunnels" left behind by abandoned sessions.
/// Recovery (evict-inactive) is baked into the creation retry policy
/// rather than left to callers.
pub struct TunnelRegistry {
    service: Arc<dyn TunnelService>,
    retry: RetryPolicy,
}

impl TunnelRegistry {
    pub fn new(service: Arc<dyn TunnelService>) -> Self {
        Self {
            service,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the creation retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Look up a tunnel by id+cluster or by name. `NotFound` means the
    /// provider no longer has it; callers treat that as "no cached
    /// tunnel" and fall through to creation.
    pub async fn find_by_reference(&self, reference: &TunnelRef) -> Result<Tunnel, TunnelError> {
        self.service
            .get_tunnel(reference, &TunnelRequestOptions::host())
            .await
    }

    /// Whether the account currently owns a tunnel with this name.
    pub async fn contains(&self, name: &str) -> Result<bool, TunnelError> {
        let tunnels = self.service.list_tunnels().await?;
        debug!(count = tunnels.len(), "listed tunnels");
        Ok(tunnels.iter().any(|t| t.name == name))
    }

    /// Create a tunnel with one bound port and anonymous host access.
    ///
    /// An empty `desired_name` gets a random 32-character token. Up to
    /// three attempts; a quota failure evicts inactive tunnels before the
    /// next try, any other failure just consumes budget. Exhausting the
    /// budget surfaces the last error.
    pub async fn create_with_port(
        &self,
        desired_name: &str,
        port: u16,
    ) -> Result<Tunnel, TunnelError> {
        let name = if desired_name.is_empty() {
            random_tunnel_name()
        } else {
            desired_name.to_string()
        };
        let spec = TunnelSpec::with_port(name, port);
        let options = TunnelRequestOptions::host();

        self.retry
            .run(
                || self.service.create_tunnel(&spec, &options),
                |error: &TunnelError| {
                    if error.is_quota() {
                        Recovery::RetryAfterRecovery
                    } else {
                        Recovery::Retry
                    }
                },
                || async move {
                    info!("tunnel quota reached; evicting inactive tunnels");
                    if let Err(error) = self.delete_all_inactive().await {
                        warn!(%error, "inactive-tunnel eviction failed");
                    }
                },
            )
            .await
    }

    /// Delete every tunnel that currently has no host connection.
    ///
    /// Deletes are issued concurrently; individual failures are logged
    /// and never abort the batch.
    pub async fn delete_all_inactive(&self) -> Result<(), TunnelError> {
        let tunnels = self.service.list_tunnels().await?;
        let inactive: Vec<&Tunnel> = tunnels.iter().filter(|t| !is_tunnel_active(t)).collect();
        if inactive.is_empty() {
            return Ok(());
        }
        info!(count = inactive.len(), "deleting inactive tunnels");

        let deletes = inactive.into_iter().map(|tunnel| {
            let reference = TunnelRef::of(tunnel);
            async move { (tunnel.name.clone(), self.service.delete_tunnel(&reference).await) }
        });
        for (name, result) in join_all(deletes).await {
            if let Err(error) = result {
                warn!(tunnel = %name, %error, "failed to delete inactive tunnel");
            }
        }
        Ok(())
    }

    /// Unconditional delete. Deleting an already-gone tunnel is not an
    /// error.
    pub async fn delete(&self, reference: &TunnelRef) -> Result<(), TunnelError> {
        match self.service.delete_tunnel(reference).await {
            Ok(()) | Err(TunnelError::NotFound) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Full listing for the account.
    pub async fn list(&self) -> Result<Vec<Tunnel>, TunnelError> {
        self.service.list_tunnels().await
    }
}
