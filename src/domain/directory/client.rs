//! Credential directory client trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{DirectoryUser, GenerateKeyRequest, GeneratedKey, RemoteKeyView};
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// Typed access to the upstream credential directory
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    /// Look up a user; `Ok(None)` when the directory answers 404
    async fn lookup_user(&self, user_id: &UserId) -> Result<Option<DirectoryUser>, DomainError>;

    /// Create a user with an optional spending ceiling
    async fn provision_user(
        &self,
        user_id: &UserId,
        email: &str,
        max_budget: Option<f64>,
    ) -> Result<(), DomainError>;

    /// Keys the directory reports for a user
    async fn list_keys(&self, user_id: &UserId) -> Result<Vec<RemoteKeyView>, DomainError>;

    /// Issue a new key
    async fn generate_key(&self, request: &GenerateKeyRequest) -> Result<GeneratedKey, DomainError>;

    /// Delete a key by its remote identifier
    async fn delete_key(&self, remote_key_id: &str) -> Result<(), DomainError>;
}
