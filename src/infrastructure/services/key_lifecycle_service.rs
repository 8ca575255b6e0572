//! Lifecycle policy - key issuance and revocation

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::user_locks::UserLocks;
use crate::config::KeysConfig;
use crate::domain::shadow_key::validate_key_name;
use crate::domain::{
    CredentialDirectory, DomainError, GenerateKeyRequest, IdentityState, KeyStatus, KeyType,
    NewShadowKey, ShadowKeyRecord, ShadowKeyRepository, UserId,
};

/// Request to issue a new key
#[derive(Debug, Clone)]
pub struct CreateKeyRequest {
    pub name: String,
    /// Only honoured when positive and below the class ceiling
    pub budget: Option<f64>,
    pub key_type: KeyType,
}

impl CreateKeyRequest {
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            budget: None,
            key_type,
        }
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// Outcome of a successful issuance.
///
/// `identity` tells whether the stored identifier was read back from the
/// directory or derived from the secret; a provisional one is corrected by
/// the next reconciliation.
#[derive(Debug, Clone)]
pub struct IssuedSecret {
    pub secret: String,
    pub key: ShadowKeyRecord,
    pub max_budget: f64,
    pub identity: IdentityState,
}

/// Enforces per-user ceilings and budget classes when keys are issued
pub struct KeyLifecycleService {
    store: Arc<dyn ShadowKeyRepository>,
    directory: Arc<dyn CredentialDirectory>,
    locks: Arc<UserLocks>,
    policy: KeysConfig,
}

impl KeyLifecycleService {
    pub fn new(
        store: Arc<dyn ShadowKeyRepository>,
        directory: Arc<dyn CredentialDirectory>,
        locks: Arc<UserLocks>,
        policy: KeysConfig,
    ) -> Self {
        Self {
            store,
            directory,
            locks,
            policy,
        }
    }

    /// Issue a key for `user_id` and start tracking it
    pub async fn create_key(
        &self,
        user_id: &UserId,
        request: CreateKeyRequest,
    ) -> Result<IssuedSecret, DomainError> {
        validate_key_name(&request.name)?;
        let name = request.name.trim().to_string();

        let _guard = self.locks.lock(user_id).await;
        let now = Utc::now();

        let live = self
            .directory
            .list_keys(user_id)
            .await?
            .iter()
            .filter(|k| k.is_owned_by(user_id) && !k.is_expired_at(now))
            .count();

        if live >= self.policy.max_active_keys {
            return Err(DomainError::limit_reached(format!(
                "Maximum of {} active keys reached",
                self.policy.max_active_keys
            )));
        }

        if request.key_type == KeyType::LongTerm {
            let long_term = self
                .store
                .count(user_id, Some(KeyType::LongTerm), Some(KeyStatus::Active))
                .await?;

            if long_term >= self.policy.long_term_key_limit {
                return Err(DomainError::limit_reached(format!(
                    "Maximum of {} long-term keys reached",
                    self.policy.long_term_key_limit
                )));
            }
        }

        let max_budget = resolve_budget(self.ceiling(request.key_type), request.budget);
        let lifetime = match request.key_type {
            KeyType::LongTerm => Some(self.policy.long_term_key_lifetime),
            KeyType::Standard => self.policy.standard_key_lifetime,
        };

        let generated = self
            .directory
            .generate_key(&GenerateKeyRequest {
                user_id: user_id.clone(),
                key_alias: name.clone(),
                max_budget: Some(max_budget),
                duration: lifetime.map(|l| l.to_directory_string()),
            })
            .await?;

        let fallback_expiry = lifetime.and_then(|l| {
            chrono::Duration::from_std(l.as_duration())
                .ok()
                .and_then(|d| now.checked_add_signed(d))
        });

        let (remote_key_id, expires_at, identity) =
            match self.capture_identity(user_id, &name).await {
                Some((remote_key_id, expires_at)) => {
                    (remote_key_id, expires_at.or(fallback_expiry), IdentityState::Confirmed)
                }
                None => (
                    mask_secret(&generated.secret),
                    fallback_expiry,
                    IdentityState::Provisional,
                ),
            };

        let key = self
            .store
            .create(
                NewShadowKey::new(
                    user_id.clone(),
                    &remote_key_id,
                    &name,
                    &remote_key_id,
                    request.key_type,
                )
                .with_created_at(now)
                .with_expires_at(expires_at)
                .with_identity(identity),
            )
            .await?;

        info!(
            user_id = %user_id,
            name = %name,
            key_type = %request.key_type,
            max_budget,
            identity = identity.as_str(),
            "Issued key"
        );

        Ok(IssuedSecret {
            secret: generated.secret,
            key,
            max_budget,
            identity,
        })
    }

    /// Revoke a key the user owns; local revocation stands even if the directory call fails
    pub async fn delete_key(&self, user_id: &UserId, remote_key_id: &str) -> Result<(), DomainError> {
        let _guard = self.locks.lock(user_id).await;

        let mut key = self
            .store
            .find_by_remote_id(user_id, remote_key_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Key '{}' not found", remote_key_id)))?;

        if let Err(e) = self.directory.delete_key(remote_key_id).await {
            warn!(
                user_id = %user_id,
                remote_key_id = %remote_key_id,
                error = %e,
                "Directory revocation failed, revoking locally"
            );
        }

        key.revoke(Utc::now());
        self.store.update(&key).await?;

        info!(user_id = %user_id, remote_key_id = %remote_key_id, "Revoked key");
        Ok(())
    }

    /// Revoked and expired keys, newest first
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        self.store.history(user_id).await
    }

    fn ceiling(&self, key_type: KeyType) -> f64 {
        match key_type {
            KeyType::Standard => self.policy.default_budget,
            KeyType::LongTerm => self.policy.long_term_key_budget,
        }
    }

    /// Read the new key back from the directory listing by alias.
    ///
    /// Keys already tracked as active are skipped so a reused name does not
    /// capture an older key. Any failure yields `None`.
    async fn capture_identity(
        &self,
        user_id: &UserId,
        name: &str,
    ) -> Option<(String, Option<DateTime<Utc>>)> {
        let listing = match self.directory.list_keys(user_id).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(user_id = %user_id, name = %name, error = %e, "Could not read back issued key");
                return None;
            }
        };

        let tracked: HashSet<String> = match self.store.list_for_user(user_id).await {
            Ok(records) => records
                .into_iter()
                .filter(|k| k.is_active())
                .map(|k| k.remote_key_id().to_string())
                .collect(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Could not load tracked keys");
                return None;
            }
        };

        let found = listing.into_iter().find(|k| {
            k.is_owned_by(user_id) && k.alias == name && !tracked.contains(&k.remote_key_id)
        });

        if found.is_none() {
            warn!(user_id = %user_id, name = %name, "Issued key not found in listing");
        }

        found.map(|k| {
            let expires_at = k.expires_at();
            (k.remote_key_id, expires_at)
        })
    }
}

impl std::fmt::Debug for KeyLifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLifecycleService")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish()
    }
}

/// The class ceiling, tightened by a smaller positive request
fn resolve_budget(ceiling: f64, requested: Option<f64>) -> f64 {
    match requested {
        Some(budget) if budget > 0.0 && budget < ceiling => budget,
        _ => ceiling,
    }
}

/// Display-safe form of a secret: first and last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return secret.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::MockCredentialDirectory;
    use crate::domain::RemoteKeyView;
    use crate::infrastructure::directory::fake::InMemoryDirectory;
    use crate::infrastructure::services::ReconciliationService;
    use crate::infrastructure::shadow_key::InMemoryShadowKeyRepository;

    const USER: &str = "dev@example.com";

    fn user() -> UserId {
        UserId::new(USER).unwrap()
    }

    fn listed(id: &str, alias: &str) -> RemoteKeyView {
        RemoteKeyView::new(id, alias).with_owner(USER)
    }

    fn policy() -> KeysConfig {
        KeysConfig {
            max_active_keys: 2,
            ..KeysConfig::default()
        }
    }

    struct Fixture {
        store: Arc<InMemoryShadowKeyRepository>,
        directory: Arc<InMemoryDirectory>,
        locks: Arc<UserLocks>,
        service: KeyLifecycleService,
    }

    fn fixture(directory: InMemoryDirectory, policy: KeysConfig) -> Fixture {
        let store = Arc::new(InMemoryShadowKeyRepository::new());
        let directory = Arc::new(directory);
        let locks = Arc::new(UserLocks::new());
        let service =
            KeyLifecycleService::new(store.clone(), directory.clone(), locks.clone(), policy);

        Fixture {
            store,
            directory,
            locks,
            service,
        }
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-test-00000001"), "sk-t...0001");
        assert_eq!(mask_secret("short"), "short");
        assert_eq!(mask_secret("12345678"), "12345678");
    }

    #[test]
    fn test_resolve_budget_only_tightens() {
        assert_eq!(resolve_budget(1.0, Some(0.3)), 0.3);
        assert_eq!(resolve_budget(1.0, Some(5.0)), 1.0);
        assert_eq!(resolve_budget(1.0, Some(0.0)), 1.0);
        assert_eq!(resolve_budget(1.0, Some(-2.0)), 1.0);
        assert_eq!(resolve_budget(1.0, None), 1.0);
    }

    #[tokio::test]
    async fn test_budget_clamping() {
        let f = fixture(InMemoryDirectory::new(), KeysConfig::default());

        let small = f
            .service
            .create_key(&user(), CreateKeyRequest::new("small", KeyType::Standard).with_budget(0.3))
            .await
            .unwrap();
        let large = f
            .service
            .create_key(&user(), CreateKeyRequest::new("large", KeyType::Standard).with_budget(5.0))
            .await
            .unwrap();

        assert_eq!(small.max_budget, 0.3);
        assert_eq!(large.max_budget, 1.0);

        let generated = f.directory.generated();
        assert_eq!(generated[0].max_budget, Some(0.3));
        assert_eq!(generated[1].max_budget, Some(1.0));
        assert_eq!(generated[0].duration, None);
    }

    #[tokio::test]
    async fn test_long_term_key_uses_class_budget_and_lifetime() {
        let f = fixture(InMemoryDirectory::new(), KeysConfig::default());

        let issued = f
            .service
            .create_key(&user(), CreateKeyRequest::new("server", KeyType::LongTerm))
            .await
            .unwrap();

        assert_eq!(issued.max_budget, 20.0);
        assert_eq!(issued.key.key_type(), KeyType::LongTerm);
        assert!(issued.key.expires_at().is_some());
        assert_eq!(f.directory.generated()[0].duration.as_deref(), Some("400d"));
    }

    #[tokio::test]
    async fn test_identity_captured_from_listing() {
        let f = fixture(InMemoryDirectory::new(), policy());

        let issued = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        assert_eq!(issued.secret, "sk-test-00000001");
        assert_eq!(issued.identity, IdentityState::Confirmed);
        assert_eq!(issued.key.remote_key_id(), "sk-...0001");
        assert_eq!(issued.key.mask(), "sk-...0001");
        assert!(issued.key.is_active());
    }

    #[tokio::test]
    async fn test_provisional_identity_when_read_back_fails() {
        let f = fixture(InMemoryDirectory::new(), policy());
        f.directory.fail_list_from(1);

        let issued = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        assert_eq!(issued.identity, IdentityState::Provisional);
        assert_eq!(issued.key.remote_key_id(), "sk-t...0001");
        assert_eq!(issued.key.identity(), IdentityState::Provisional);
    }

    #[tokio::test]
    async fn test_provisional_identity_corrected_by_reconcile() {
        let f = fixture(InMemoryDirectory::new(), policy());
        f.directory.fail_list_from(1);
        f.service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        let directory = Arc::new(InMemoryDirectory::new().with_key(listed("sk-...0001", "laptop")));
        let reconciler = ReconciliationService::new(f.store.clone(), directory, f.locks.clone());
        let visible = reconciler.reconcile(&user()).await.unwrap();

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].key_id, "sk-...0001");
        let records = f.store.list_for_user(&user()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity(), IdentityState::Confirmed);
    }

    #[tokio::test]
    async fn test_reused_name_does_not_capture_tracked_key() {
        let f = fixture(InMemoryDirectory::new(), policy());
        let first = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();
        let second = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        assert_eq!(first.key.remote_key_id(), "sk-...0001");
        assert_eq!(second.key.remote_key_id(), "sk-...0002");
    }

    #[tokio::test]
    async fn test_ceiling_blocks_issuance() {
        let mut mock = MockCredentialDirectory::new();
        mock.expect_list_keys()
            .times(1)
            .returning(|_| Ok(vec![listed("a", "a"), listed("b", "b")]));
        mock.expect_generate_key().times(0);

        let service = KeyLifecycleService::new(
            Arc::new(InMemoryShadowKeyRepository::new()),
            Arc::new(mock),
            Arc::new(UserLocks::new()),
            policy(),
        );

        let err = service
            .create_key(&user(), CreateKeyRequest::new("third", KeyType::Standard))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::LimitReached { .. }));
    }

    #[tokio::test]
    async fn test_ceiling_ignores_expired_and_foreign_keys() {
        let past = (Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
        let f = fixture(
            InMemoryDirectory::new()
                .with_key(listed("a", "a"))
                .with_key(listed("b", "b").with_expires(past.as_str()))
                .with_key(RemoteKeyView::new("c", "c").with_owner("other@example.com")),
            policy(),
        );

        let result = f
            .service
            .create_key(&user(), CreateKeyRequest::new("new", KeyType::Standard))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_limit_check_requires_listing() {
        let f = fixture(InMemoryDirectory::new(), policy());
        f.directory.fail_list_from(0);

        let err = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Unavailable { .. }));
        assert!(f.directory.generated().is_empty());
    }

    #[tokio::test]
    async fn test_long_term_limit_is_local() {
        let f = fixture(InMemoryDirectory::new(), KeysConfig::default());
        f.service
            .create_key(&user(), CreateKeyRequest::new("server", KeyType::LongTerm))
            .await
            .unwrap();

        let err = f
            .service
            .create_key(&user(), CreateKeyRequest::new("server-2", KeyType::LongTerm))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::LimitReached { .. }));
        assert_eq!(f.directory.generated().len(), 1);
    }

    #[tokio::test]
    async fn test_issuance_failure_propagates() {
        let f = fixture(InMemoryDirectory::new(), policy());
        f.directory.fail_generate(400, "budget exceeded");

        let err = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap_err();

        match err {
            DomainError::IssuanceFailed { status, body } => {
                assert_eq!(status, Some(400));
                assert_eq!(body, "budget exceeded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(f.store.list_for_user(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let f = fixture(InMemoryDirectory::new(), policy());

        let err = f
            .service
            .create_key(&user(), CreateKeyRequest::new("   ", KeyType::Standard))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
        assert_eq!(f.directory.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_revokes_locally_and_upstream() {
        let f = fixture(InMemoryDirectory::new(), policy());
        let issued = f
            .service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        f.service.delete_key(&user(), "sk-...0001").await.unwrap();

        assert_eq!(f.directory.deleted(), vec!["sk-...0001".to_string()]);
        let record = f.store.find_by_remote_id(&user(), "sk-...0001").await.unwrap().unwrap();
        assert_eq!(record.id(), issued.key.id());
        assert_eq!(record.status(), KeyStatus::Revoked);
        assert!(record.revoked_at().is_some());

        let history = f.service.history(&user()).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_swallows_directory_failure() {
        let f = fixture(InMemoryDirectory::new(), policy());
        f.service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();
        f.directory.fail_delete();

        f.service.delete_key(&user(), "sk-...0001").await.unwrap();

        let record = f.store.find_by_remote_id(&user(), "sk-...0001").await.unwrap().unwrap();
        assert_eq!(record.status(), KeyStatus::Revoked);
    }

    #[tokio::test]
    async fn test_repeated_delete_keeps_revocation_time() {
        let f = fixture(InMemoryDirectory::new(), policy());
        f.service
            .create_key(&user(), CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        f.service.delete_key(&user(), "sk-...0001").await.unwrap();
        let first = f.store.find_by_remote_id(&user(), "sk-...0001").await.unwrap().unwrap();

        f.service.delete_key(&user(), "sk-...0001").await.unwrap();
        let second = f.store.find_by_remote_id(&user(), "sk-...0001").await.unwrap().unwrap();

        assert_eq!(second.status(), KeyStatus::Revoked);
        assert_eq!(second.revoked_at(), first.revoked_at());
    }

    #[tokio::test]
    async fn test_delete_enforces_ownership() {
        let f = fixture(InMemoryDirectory::new(), policy());
        let owner = UserId::new("owner@example.com").unwrap();
        f.service
            .create_key(&owner, CreateKeyRequest::new("laptop", KeyType::Standard))
            .await
            .unwrap();

        let err = f.service.delete_key(&user(), "sk-...0001").await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(f.directory.deleted().is_empty());
        let record = f.store.find_by_remote_id(&owner, "sk-...0001").await.unwrap().unwrap();
        assert!(record.is_active());
    }

    #[tokio::test]
    async fn test_concurrent_creates_respect_ceiling() {
        let f = fixture(
            InMemoryDirectory::new(),
            KeysConfig {
                max_active_keys: 1,
                ..KeysConfig::default()
            },
        );

        let user = user();
        let (a, b) = tokio::join!(
            f.service.create_key(&user, CreateKeyRequest::new("a", KeyType::Standard)),
            f.service.create_key(&user, CreateKeyRequest::new("b", KeyType::Standard)),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(f.directory.generated().len(), 1);
    }
}
