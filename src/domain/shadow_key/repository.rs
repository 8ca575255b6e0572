//! Shadow key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{KeyStatus, KeyType, NewShadowKey, ShadowKeyRecord};
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// Repository trait for shadow key storage
///
/// Records are never deleted; every listing is ordered by ascending local id.
#[async_trait]
pub trait ShadowKeyRepository: Send + Sync + Debug {
    /// All records owned by a user, historical rows included
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError>;

    /// Record for `(user, remote_key_id)`.
    ///
    /// When duplicates exist an active record wins, then the newest one.
    async fn find_by_remote_id(
        &self,
        user_id: &UserId,
        remote_key_id: &str,
    ) -> Result<Option<ShadowKeyRecord>, DomainError>;

    /// Count a user's records, optionally filtered by type and status
    async fn count(
        &self,
        user_id: &UserId,
        key_type: Option<KeyType>,
        status: Option<KeyStatus>,
    ) -> Result<usize, DomainError>;

    /// Persist a new record and assign its local id
    async fn create(&self, key: NewShadowKey) -> Result<ShadowKeyRecord, DomainError>;

    /// Overwrite an existing record
    async fn update(&self, key: &ShadowKeyRecord) -> Result<ShadowKeyRecord, DomainError>;

    /// Revoked and expired records, newest first
    async fn history(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        let mut records: Vec<ShadowKeyRecord> = self
            .list_for_user(user_id)
            .await?
            .into_iter()
            .filter(|k| !k.is_active() || k.revoked_at().is_some())
            .collect();

        records.reverse();
        Ok(records)
    }
}
