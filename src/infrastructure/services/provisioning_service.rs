//! Provisioning gate - makes sure every caller exists upstream

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info};

use crate::domain::{CredentialDirectory, DirectoryUser, DomainError, UserId};

/// Upper bound on cached confirmations
const CACHE_CAPACITY: u64 = 10_000;

/// Just-in-time creation of directory users.
///
/// With a TTL configured, a confirmed user is trusted for that long without
/// another directory lookup. Without one, every call asks the directory.
pub struct ProvisioningService {
    directory: Arc<dyn CredentialDirectory>,
    default_budget: f64,
    confirmed: Option<Cache<UserId, ()>>,
}

impl ProvisioningService {
    pub fn new(
        directory: Arc<dyn CredentialDirectory>,
        default_budget: f64,
        cache_ttl: Option<Duration>,
    ) -> Self {
        let confirmed = cache_ttl.map(|ttl| {
            Cache::builder()
                .time_to_live(ttl)
                .max_capacity(CACHE_CAPACITY)
                .build()
        });

        Self {
            directory,
            default_budget,
            confirmed,
        }
    }

    /// Create the user upstream when the directory does not know it yet
    pub async fn ensure_provisioned(&self, user_id: &UserId) -> Result<(), DomainError> {
        if let Some(cache) = &self.confirmed {
            if cache.contains_key(user_id) {
                debug!(user_id = %user_id, "Provisioning confirmed from cache");
                return Ok(());
            }
        }

        if self.directory.lookup_user(user_id).await?.is_none() {
            info!(user_id = %user_id, budget = self.default_budget, "Provisioning directory user");
            self.directory
                .provision_user(user_id, user_id.as_str(), Some(self.default_budget))
                .await?;
        }

        if let Some(cache) = &self.confirmed {
            cache.insert(user_id.clone(), ()).await;
        }

        Ok(())
    }

    /// The caller's directory record
    pub async fn current_user(&self, user_id: &UserId) -> Result<DirectoryUser, DomainError> {
        self.directory
            .lookup_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user_id)))
    }
}

impl std::fmt::Debug for ProvisioningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningService")
            .field("default_budget", &self.default_budget)
            .field("cached", &self.confirmed.is_some())
            .finish()
    }
}
