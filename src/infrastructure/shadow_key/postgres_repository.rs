//! PostgreSQL shadow key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::shadow_key::{
    IdentityState, KeyStatus, KeyType, NewShadowKey, ShadowKeyId, ShadowKeyRecord,
    ShadowKeyRepository,
};
use crate::domain::{DomainError, UserId};

const COLUMNS: &str = "id, user_id, remote_key_id, name, mask, key_type, created_at, \
                       expires_at, revoked_at, status, identity";

/// PostgreSQL implementation of ShadowKeyRepository
#[derive(Debug, Clone)]
pub struct PostgresShadowKeyRepository {
    pool: PgPool,
}

impl PostgresShadowKeyRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShadowKeyRepository for PostgresShadowKeyRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM shadow_keys WHERE user_id = $1 ORDER BY id",
            COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list shadow keys: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_remote_id(
        &self,
        user_id: &UserId,
        remote_key_id: &str,
    ) -> Result<Option<ShadowKeyRecord>, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM shadow_keys
            WHERE user_id = $1 AND remote_key_id = $2
            ORDER BY (status = 'active') DESC, id DESC
            LIMIT 1
            "#,
            COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(remote_key_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get shadow key: {}", e)))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn count(
        &self,
        user_id: &UserId,
        key_type: Option<KeyType>,
        status: Option<KeyStatus>,
    ) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM shadow_keys
            WHERE user_id = $1
              AND ($2::text IS NULL OR key_type = $2)
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(user_id.as_str())
        .bind(key_type.map(|t| t.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to count shadow keys: {}", e)))?;

        Ok(count as usize)
    }

    async fn create(&self, key: NewShadowKey) -> Result<ShadowKeyRecord, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO shadow_keys (user_id, remote_key_id, name, mask, key_type,
                                     created_at, expires_at, status, identity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(key.user_id.as_str())
        .bind(&key.remote_key_id)
        .bind(&key.name)
        .bind(&key.mask)
        .bind(key.key_type.as_str())
        .bind(key.created_at)
        .bind(key.expires_at)
        .bind(key.status.as_str())
        .bind(key.identity.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create shadow key: {}", e)))?;

        Ok(ShadowKeyRecord::from_new(ShadowKeyId::new(id), key))
    }

    async fn update(&self, key: &ShadowKeyRecord) -> Result<ShadowKeyRecord, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE shadow_keys
            SET remote_key_id = $2, name = $3, mask = $4, key_type = $5,
                expires_at = $6, revoked_at = $7, status = $8, identity = $9
            WHERE id = $1
            "#,
        )
        .bind(key.id().value())
        .bind(key.remote_key_id())
        .bind(key.name())
        .bind(key.mask())
        .bind(key.key_type().as_str())
        .bind(key.expires_at())
        .bind(key.revoked_at())
        .bind(key.status().as_str())
        .bind(key.identity().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update shadow key: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Shadow key '{}' not found",
                key.id()
            )));
        }

        Ok(key.clone())
    }

    async fn history(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM shadow_keys
            WHERE user_id = $1 AND (status <> 'active' OR revoked_at IS NOT NULL)
            ORDER BY id DESC
            "#,
            COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to load key history: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<ShadowKeyRecord, DomainError> {
    let id: i64 = row.get("id");
    let user_id: String = row.get("user_id");
    let remote_key_id: String = row.get("remote_key_id");
    let name: String = row.get("name");
    let mask: String = row.get("mask");
    let key_type: String = row.get("key_type");
    let created_at: DateTime<Utc> = row.get("created_at");
    let expires_at: Option<DateTime<Utc>> = row.get("expires_at");
    let revoked_at: Option<DateTime<Utc>> = row.get("revoked_at");
    let status: String = row.get("status");
    let identity: String = row.get("identity");

    let user_id = UserId::new(&user_id)
        .map_err(|e| DomainError::storage(format!("Invalid user ID in database: {}", e)))?;
    let key_type: KeyType = key_type
        .parse()
        .map_err(|e| DomainError::storage(format!("Invalid key type in database: {}", e)))?;
    let status: KeyStatus = status.parse()?;
    let identity: IdentityState = identity.parse()?;

    let key = NewShadowKey::new(user_id, remote_key_id, name, mask, key_type)
        .with_created_at(created_at)
        .with_expires_at(expires_at)
        .with_status(status)
        .with_identity(identity);

    Ok(ShadowKeyRecord::from_new(ShadowKeyId::new(id), key).with_revoked_at(revoked_at))
}
