//! Directory-side views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::expiry::parse_expiry;
use crate::domain::user::UserId;

/// A user as the directory knows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub spend: f64,
}

/// One entry of the directory's key listing
///
/// Fetched per request and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteKeyView {
    /// Masked identifier; may differ between calls for the same key
    pub remote_key_id: String,
    pub alias: String,
    pub owner_user_id: Option<String>,
    pub spend: f64,
    /// ISO-8601 timestamp, absent, or the literal `"null"`
    pub expires_at_raw: Option<String>,
}

impl RemoteKeyView {
    pub fn new(remote_key_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            remote_key_id: remote_key_id.into(),
            alias: alias.into(),
            owner_user_id: None,
            spend: 0.0,
            expires_at_raw: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_user_id = Some(owner.into());
        self
    }

    pub fn with_spend(mut self, spend: f64) -> Self {
        self.spend = spend;
        self
    }

    pub fn with_expires(mut self, expires: impl Into<String>) -> Self {
        self.expires_at_raw = Some(expires.into());
        self
    }

    /// Strict owner comparison against the normalised identity
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner_user_id.as_deref() == Some(user_id.as_str())
    }

    /// Resolved expiry; an unparseable timestamp is logged and treated as none
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match parse_expiry(self.expires_at_raw.as_deref()) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                warn!(
                    remote_key_id = %self.remote_key_id,
                    error = %e,
                    "Ignoring unparseable key expiry"
                );
                None
            }
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| expires_at < now)
    }
}

/// Parameters for issuing a key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateKeyRequest {
    pub user_id: UserId,
    pub key_alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// A freshly issued key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedKey {
    /// The full secret; only ever returned once
    pub secret: String,
    /// Identifier reported at issuance (token hash or key name), if any
    pub remote_key_id: Option<String>,
    pub max_budget: Option<f64>,
    pub key_alias: Option<String>,
}
