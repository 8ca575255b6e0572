//! LiteLLM proxy as the credential directory

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use super::wire::{
    DeleteKeysBody, GenerateKeyResponse, KeyListResponse, NewUserBody, UserInfoResponse,
};
use crate::config::DirectoryConfig;
use crate::domain::{
    CredentialDirectory, DirectoryUser, DomainError, GenerateKeyRequest, GeneratedKey,
    RemoteKeyView, UserId,
};

/// HTTP client for the LiteLLM management API
#[derive(Clone)]
pub struct LiteLlmDirectory {
    client: reqwest::Client,
    base_url: String,
    auth_header: Option<String>,
}

impl LiteLlmDirectory {
    pub fn new(
        base_url: impl Into<String>,
        master_key: &str,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let auth_header = (!master_key.is_empty()).then(|| format!("Bearer {}", master_key));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DomainError> {
        Self::new(&config.base_url, &config.master_key, config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_header {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }
}

impl std::fmt::Debug for LiteLlmDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiteLlmDirectory")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_header.is_some())
            .finish()
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}

#[async_trait]
impl CredentialDirectory for LiteLlmDirectory {
    async fn lookup_user(&self, user_id: &UserId) -> Result<Option<DirectoryUser>, DomainError> {
        let url = self.url(&format!("/user/info/{}", user_id));
        debug!(user_id = %user_id, "Looking up directory user");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| DomainError::unavailable(format!("user lookup {}", describe(&e))))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(DomainError::unavailable(format!(
                "user lookup returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| DomainError::decode(format!("Failed to decode user info: {}", e)))?;

        Ok(Some(body.into_domain(user_id)))
    }

    async fn provision_user(
        &self,
        user_id: &UserId,
        email: &str,
        max_budget: Option<f64>,
    ) -> Result<(), DomainError> {
        let body = NewUserBody {
            user_id: user_id.as_str(),
            user_email: email,
            max_budget: max_budget.filter(|b| *b > 0.0),
        };

        let response = self
            .authorize(self.client.post(self.url("/user/new")))
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::provision_failed(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::provision_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body
            )));
        }

        Ok(())
    }

    async fn list_keys(&self, user_id: &UserId) -> Result<Vec<RemoteKeyView>, DomainError> {
        let request = self
            .client
            .get(self.url("/key/list"))
            .query(&[("user_id", user_id.as_str()), ("return_full_object", "true")]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DomainError::unavailable(format!("key listing {}", describe(&e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::unavailable(format!(
                "key listing returned HTTP {}",
                status.as_u16()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            DomainError::unavailable(format!("Failed to read key listing: {}", e))
        })?;

        let body: KeyListResponse = serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::decode(format!("Failed to decode key listing: {}", e)))?;

        let keys = body
            .into_keys()
            .into_iter()
            .filter_map(|key| {
                let view = key.into_domain();
                if view.is_none() {
                    warn!(user_id = %user_id, "Skipping listed key without identifier");
                }
                view
            })
            .collect::<Vec<_>>();

        debug!(user_id = %user_id, count = keys.len(), "Listed directory keys");
        Ok(keys)
    }

    async fn generate_key(&self, request: &GenerateKeyRequest) -> Result<GeneratedKey, DomainError> {
        let response = self
            .authorize(self.client.post(self.url("/key/generate")))
            .json(request)
            .send()
            .await
            .map_err(|e| DomainError::issuance_failed(None, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::issuance_failed(Some(status.as_u16()), error_body));
        }

        let body: GenerateKeyResponse = response.json().await.map_err(|e| {
            DomainError::decode(format!("Failed to decode generated key: {}", e))
        })?;

        body.into_domain()
            .ok_or_else(|| DomainError::decode("Generated key response carries no secret"))
    }

    async fn delete_key(&self, remote_key_id: &str) -> Result<(), DomainError> {
        let body = DeleteKeysBody {
            keys: [remote_key_id],
        };

        let response = self
            .authorize(self.client.post(self.url("/key/delete")))
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::revocation_failed(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::revocation_failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_body
            )));
        }

        Ok(())
    }
}
