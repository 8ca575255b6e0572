//! In-memory shadow key repository implementation

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::shadow_key::{
    KeyStatus, KeyType, NewShadowKey, ShadowKeyId, ShadowKeyRecord, ShadowKeyRepository,
};
use crate::domain::{DomainError, UserId};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<ShadowKeyRecord>,
    next_id: i64,
}

/// In-memory implementation of ShadowKeyRepository
///
/// Rows are kept in insertion order, which is also ascending id order.
#[derive(Debug, Default)]
pub struct InMemoryShadowKeyRepository {
    table: Arc<RwLock<Table>>,
    should_fail: Arc<RwLock<bool>>,
}

impl InMemoryShadowKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a storage error
    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.write().await = fail;
    }

    async fn check_should_fail(&self) -> Result<(), DomainError> {
        if *self.should_fail.read().await {
            return Err(DomainError::storage("Shadow key store configured to fail"));
        }
        Ok(())
    }
}

#[async_trait]
impl ShadowKeyRepository for InMemoryShadowKeyRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        self.check_should_fail().await?;
        let table = self.table.read().await;

        Ok(table
            .rows
            .iter()
            .filter(|k| k.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_remote_id(
        &self,
        user_id: &UserId,
        remote_key_id: &str,
    ) -> Result<Option<ShadowKeyRecord>, DomainError> {
        self.check_should_fail().await?;
        let table = self.table.read().await;

        Ok(table
            .rows
            .iter()
            .filter(|k| k.user_id() == user_id && k.remote_key_id() == remote_key_id)
            .max_by_key(|k| (k.is_active(), k.id()))
            .cloned())
    }

    async fn count(
        &self,
        user_id: &UserId,
        key_type: Option<KeyType>,
        status: Option<KeyStatus>,
    ) -> Result<usize, DomainError> {
        self.check_should_fail().await?;
        let table = self.table.read().await;

        Ok(table
            .rows
            .iter()
            .filter(|k| k.user_id() == user_id)
            .filter(|k| key_type.is_none_or(|t| k.key_type() == t))
            .filter(|k| status.is_none_or(|s| k.status() == s))
            .count())
    }

    async fn create(&self, key: NewShadowKey) -> Result<ShadowKeyRecord, DomainError> {
        self.check_should_fail().await?;
        let mut table = self.table.write().await;

        table.next_id += 1;
        let record = ShadowKeyRecord::from_new(ShadowKeyId::new(table.next_id), key);
        table.rows.push(record.clone());

        Ok(record)
    }

    async fn update(&self, key: &ShadowKeyRecord) -> Result<ShadowKeyRecord, DomainError> {
        self.check_should_fail().await?;
        let mut table = self.table.write().await;

        let row = table
            .rows
            .iter_mut()
            .find(|k| k.id() == key.id())
            .ok_or_else(|| DomainError::not_found(format!("Shadow key '{}' not found", key.id())))?;

        *row = key.clone();
        Ok(key.clone())
    }
}
