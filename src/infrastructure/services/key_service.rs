//! Key service - the operations a user performs on their own keys

use std::sync::Arc;

use super::key_lifecycle_service::{CreateKeyRequest, IssuedSecret, KeyLifecycleService};
use super::reconciliation_service::{ReconciliationService, VisibleKey};
use super::user_locks::UserLocks;
use crate::config::KeysConfig;
use crate::domain::{
    CredentialDirectory, DomainError, ShadowKeyRecord, ShadowKeyRepository, UserId,
};

/// Reconciliation and lifecycle policy over one store and directory,
/// sharing a single set of per-user locks
#[derive(Debug)]
pub struct KeyService {
    reconciler: ReconciliationService,
    lifecycle: KeyLifecycleService,
}

impl KeyService {
    pub fn new(
        store: Arc<dyn ShadowKeyRepository>,
        directory: Arc<dyn CredentialDirectory>,
        policy: KeysConfig,
    ) -> Self {
        let locks = Arc::new(UserLocks::new());

        Self {
            reconciler: ReconciliationService::new(
                store.clone(),
                directory.clone(),
                locks.clone(),
            ),
            lifecycle: KeyLifecycleService::new(store, directory, locks, policy),
        }
    }

    /// Active keys after reconciling with the directory
    pub async fn active_keys(&self, user_id: &UserId) -> Result<Vec<VisibleKey>, DomainError> {
        self.reconciler.reconcile(user_id).await
    }

    pub async fn history(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        self.lifecycle.history(user_id).await
    }

    pub async fn create_key(
        &self,
        user_id: &UserId,
        request: CreateKeyRequest,
    ) -> Result<IssuedSecret, DomainError> {
        self.lifecycle.create_key(user_id, request).await
    }

    pub async fn delete_key(&self, user_id: &UserId, remote_key_id: &str) -> Result<(), DomainError> {
        self.lifecycle.delete_key(user_id, remote_key_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeyStatus, KeyType};
    use crate::infrastructure::directory::fake::InMemoryDirectory;
    use crate::infrastructure::shadow_key::InMemoryShadowKeyRepository;

    fn user() -> UserId {
        UserId::new("dev@example.com").unwrap()
    }

    #[tokio::test]
    async fn test_create_list_delete_cycle() {
        let store = Arc::new(InMemoryShadowKeyRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let service = KeyService::new(store.clone(), directory.clone(), KeysConfig::default());

        service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();
        service
            .create_key(&user(), CreateKeyRequest::new("ci", KeyType::Standard))
            .await
            .unwrap();

        let active = service.active_keys(&user()).await.unwrap();
        let names: Vec<&str> = active.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["laptop", "ci"]);

        service.delete_key(&user(), &active[0].key_id).await.unwrap();

        let active = service.active_keys(&user()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "ci");

        let history = service.history(&user()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name(), "laptop");
        assert_eq!(history[0].status(), KeyStatus::Revoked);
    }

    #[tokio::test]
    async fn test_key_removed_upstream_moves_to_history() {
        let store = Arc::new(InMemoryShadowKeyRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let service = KeyService::new(store.clone(), directory.clone(), KeysConfig::default());

        service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();
        directory.remove_key("sk-...0001");

        assert!(service.active_keys(&user()).await.unwrap().is_empty());
        assert_eq!(service.history(&user()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rekeyed_upstream_identifier_is_followed() {
        let store = Arc::new(InMemoryShadowKeyRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let service = KeyService::new(store.clone(), directory.clone(), KeysConfig::default());

        service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();
        directory.rekey("sk-...0001", "sk-...9999");

        let active = service.active_keys(&user()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].key_id, "sk-...9999");
        assert!(service.history(&user()).await.unwrap().is_empty());
        assert_eq!(store.list_for_user(&user()).await.unwrap().len(), 1);
    }
}
