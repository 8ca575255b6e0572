//! Application state for shared services

use std::sync::Arc;

use crate::domain::{DirectoryUser, DomainError, ShadowKeyRecord, UserId};
use crate::infrastructure::services::{
    CreateKeyRequest, IssuedSecret, KeyService, ProvisioningService, VisibleKey,
};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub key_service: Arc<dyn KeyServiceTrait>,
    pub provisioning_service: Arc<dyn ProvisioningServiceTrait>,
}

impl AppState {
    pub fn new(
        key_service: Arc<dyn KeyServiceTrait>,
        provisioning_service: Arc<dyn ProvisioningServiceTrait>,
    ) -> Self {
        Self {
            key_service,
            provisioning_service,
        }
    }
}

/// Trait for key operations on behalf of a user
#[async_trait::async_trait]
pub trait KeyServiceTrait: Send + Sync {
    async fn active_keys(&self, user_id: &UserId) -> Result<Vec<VisibleKey>, DomainError>;
    async fn history(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError>;
    async fn create_key(
        &self,
        user_id: &UserId,
        request: CreateKeyRequest,
    ) -> Result<IssuedSecret, DomainError>;
    async fn delete_key(&self, user_id: &UserId, remote_key_id: &str) -> Result<(), DomainError>;
}

/// Trait for directory user operations
#[async_trait::async_trait]
pub trait ProvisioningServiceTrait: Send + Sync {
    async fn ensure_provisioned(&self, user_id: &UserId) -> Result<(), DomainError>;
    async fn current_user(&self, user_id: &UserId) -> Result<DirectoryUser, DomainError>;
}

#[async_trait::async_trait]
impl KeyServiceTrait for KeyService {
    async fn active_keys(&self, user_id: &UserId) -> Result<Vec<VisibleKey>, DomainError> {
        KeyService::active_keys(self, user_id).await
    }

    async fn history(&self, user_id: &UserId) -> Result<Vec<ShadowKeyRecord>, DomainError> {
        KeyService::history(self, user_id).await
    }

    async fn create_key(
        &self,
        user_id: &UserId,
        request: CreateKeyRequest,
    ) -> Result<IssuedSecret, DomainError> {
        KeyService::create_key(self, user_id, request).await
    }

    async fn delete_key(&self, user_id: &UserId, remote_key_id: &str) -> Result<(), DomainError> {
        KeyService::delete_key(self, user_id, remote_key_id).await
    }
}

#[async_trait::async_trait]
impl ProvisioningServiceTrait for ProvisioningService {
    async fn ensure_provisioned(&self, user_id: &UserId) -> Result<(), DomainError> {
        ProvisioningService::ensure_provisioned(self, user_id).await
    }

    async fn current_user(&self, user_id: &UserId) -> Result<DirectoryUser, DomainError> {
        ProvisioningService::current_user(self, user_id).await
    }
}
