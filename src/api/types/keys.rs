//! Key endpoint payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DirectoryUser, IdentityState, KeyStatus, KeyType, ShadowKeyRecord};
use crate::infrastructure::services::{CreateKeyRequest, IssuedSecret};

/// Body of `POST /keys`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKeyBody {
    pub name: String,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default, rename = "type")]
    pub key_type: Option<KeyType>,
}

impl From<CreateKeyBody> for CreateKeyRequest {
    fn from(body: CreateKeyBody) -> Self {
        Self {
            name: body.name,
            budget: body.budget,
            key_type: body.key_type.unwrap_or_default(),
        }
    }
}

/// The only response that ever carries the full secret
#[derive(Debug, Clone, Serialize)]
pub struct CreatedKeyResponse {
    pub key: String,
    pub key_id: String,
    pub name: String,
    pub mask: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub max_budget: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub identity: IdentityState,
}

impl From<IssuedSecret> for CreatedKeyResponse {
    fn from(issued: IssuedSecret) -> Self {
        Self {
            key_id: issued.key.remote_key_id().to_string(),
            name: issued.key.name().to_string(),
            mask: issued.key.mask().to_string(),
            key_type: issued.key.key_type(),
            created_at: issued.key.created_at(),
            expires_at: issued.key.expires_at(),
            key: issued.secret,
            max_budget: issued.max_budget,
            identity: issued.identity,
        }
    }
}

/// A revoked or expired key
#[derive(Debug, Clone, Serialize)]
pub struct HistoryKey {
    pub key_id: String,
    pub name: String,
    pub mask: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<ShadowKeyRecord> for HistoryKey {
    fn from(record: ShadowKeyRecord) -> Self {
        Self {
            key_id: record.remote_key_id().to_string(),
            name: record.name().to_string(),
            mask: record.mask().to_string(),
            key_type: record.key_type(),
            status: record.status(),
            created_at: record.created_at(),
            expires_at: record.expires_at(),
            revoked_at: record.revoked_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    pub spend: f64,
}

impl From<DirectoryUser> for MeResponse {
    fn from(user: DirectoryUser) -> Self {
        Self {
            user_id: user.user_id,
            email: user.user_email,
            max_budget: user.max_budget,
            spend: user.spend,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub status: &'static str,
}

impl DeletedResponse {
    pub fn deleted() -> Self {
        Self { status: "deleted" }
    }
}
