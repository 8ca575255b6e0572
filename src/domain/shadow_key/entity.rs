//! Shadow key entity and related types

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::domain::DomainError;

/// Local surrogate identity, assigned by the store on creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShadowKeyId(i64);

impl ShadowKeyId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ShadowKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Budget class of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyType {
    #[default]
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "long-term")]
    LongTerm,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::LongTerm => "long-term",
        }
    }
}

impl FromStr for KeyType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "long-term" => Ok(Self::LongTerm),
            other => Err(DomainError::validation(format!(
                "Unknown key type '{}', expected 'standard' or 'long-term'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a shadow record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for KeyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(DomainError::storage(format!("Unknown key status '{}'", other))),
        }
    }
}

/// Whether the stored remote identifier has been seen in a directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityState {
    /// Observed in an upstream listing
    #[default]
    Confirmed,
    /// Derived locally from the issued secret; corrected by the next reconcile
    Provisional,
}

impl IdentityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Provisional => "provisional",
        }
    }
}

impl FromStr for IdentityState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "provisional" => Ok(Self::Provisional),
            other => Err(DomainError::storage(format!(
                "Unknown identity state '{}'",
                other
            ))),
        }
    }
}

/// A shadow record that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewShadowKey {
    pub user_id: UserId,
    pub remote_key_id: String,
    pub name: String,
    pub mask: String,
    pub key_type: KeyType,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: KeyStatus,
    pub identity: IdentityState,
}

impl NewShadowKey {
    pub fn new(
        user_id: UserId,
        remote_key_id: impl Into<String>,
        name: impl Into<String>,
        mask: impl Into<String>,
        key_type: KeyType,
    ) -> Self {
        Self {
            user_id,
            remote_key_id: remote_key_id.into(),
            name: name.into(),
            mask: mask.into(),
            key_type,
            created_at: Utc::now(),
            expires_at: None,
            status: KeyStatus::Active,
            identity: IdentityState::Confirmed,
        }
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_status(mut self, status: KeyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_identity(mut self, identity: IdentityState) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Local lifecycle record for one credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowKeyRecord {
    id: ShadowKeyId,
    user_id: UserId,
    remote_key_id: String,
    name: String,
    mask: String,
    key_type: KeyType,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_at: Option<DateTime<Utc>>,
    status: KeyStatus,
    identity: IdentityState,
}

impl ShadowKeyRecord {
    /// Materialise a persisted record from its creation payload
    pub fn from_new(id: ShadowKeyId, key: NewShadowKey) -> Self {
        Self {
            id,
            user_id: key.user_id,
            remote_key_id: key.remote_key_id,
            name: key.name,
            mask: key.mask,
            key_type: key.key_type,
            created_at: key.created_at,
            expires_at: key.expires_at,
            revoked_at: None,
            status: key.status,
            identity: key.identity,
        }
    }

    /// Restore the revocation timestamp when loading from storage
    pub fn with_revoked_at(mut self, revoked_at: Option<DateTime<Utc>>) -> Self {
        self.revoked_at = revoked_at;
        self
    }

    pub fn id(&self) -> ShadowKeyId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn remote_key_id(&self) -> &str {
        &self.remote_key_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    pub fn status(&self) -> KeyStatus {
        self.status
    }

    pub fn identity(&self) -> IdentityState {
        self.identity
    }

    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    /// Point the record at the identifier the directory currently reports
    pub fn rebind(&mut self, remote_key_id: impl Into<String>) {
        self.remote_key_id = remote_key_id.into();
        self.identity = IdentityState::Confirmed;
    }

    /// Mark the remote identifier as observed upstream
    pub fn confirm_identity(&mut self) {
        self.identity = IdentityState::Confirmed;
    }

    /// Observed upstream and not expired
    pub fn activate(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.status = KeyStatus::Active;
        self.revoked_at = None;
        self.expires_at = expires_at;
    }

    /// Observed upstream with an expiry in the past
    pub fn expire(&mut self, expires_at: DateTime<Utc>) {
        self.status = KeyStatus::Expired;
        self.expires_at = Some(expires_at);
    }

    /// Keeps the first revocation time when already revoked
    pub fn revoke(&mut self, at: DateTime<Utc>) {
        if self.status == KeyStatus::Revoked && self.revoked_at.is_some() {
            return;
        }
        self.status = KeyStatus::Revoked;
        self.revoked_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> ShadowKeyRecord {
        let user = UserId::new("dev@example.com").unwrap();
        ShadowKeyRecord::from_new(
            ShadowKeyId::new(1),
            NewShadowKey::new(user, "sk-...abcd", "laptop", "sk-...abcd", KeyType::Standard),
        )
    }

    #[test]
    fn test_key_type_round_trip_strings() {
        assert_eq!("long-term".parse::<KeyType>().unwrap(), KeyType::LongTerm);
        assert_eq!(KeyType::LongTerm.as_str(), "long-term");
        assert!("forever".parse::<KeyType>().is_err());
        assert_eq!(
            serde_json::to_string(&KeyType::LongTerm).unwrap(),
            "\"long-term\""
        );
    }

    #[test]
    fn test_new_record_is_active_and_confirmed() {
        let key = record();
        assert!(key.is_active());
        assert_eq!(key.identity(), IdentityState::Confirmed);
        assert!(key.revoked_at().is_none());
    }

    #[test]
    fn test_revoke_then_activate_clears_revocation() {
        let mut key = record();
        key.revoke(Utc::now());
        assert_eq!(key.status(), KeyStatus::Revoked);
        assert!(key.revoked_at().is_some());

        key.activate(None);
        assert!(key.is_active());
        assert!(key.revoked_at().is_none());
    }

    #[test]
    fn test_revoke_keeps_first_revocation_time() {
        let mut key = record();
        let first = Utc::now() - Duration::hours(2);
        key.revoke(first);
        key.revoke(Utc::now());
        assert_eq!(key.revoked_at(), Some(first));
    }

    #[test]
    fn test_expire_sets_expiry() {
        let mut key = record();
        let past = Utc::now() - Duration::hours(1);
        key.expire(past);
        assert_eq!(key.status(), KeyStatus::Expired);
        assert_eq!(key.expires_at(), Some(past));
    }

    #[test]
    fn test_rebind_confirms_identity() {
        let mut key = record();
        let mut provisional = ShadowKeyRecord::from_new(
            key.id(),
            NewShadowKey::new(key.user_id().clone(), "sk-1...wxyz", "laptop", "sk-1...wxyz", KeyType::Standard)
                .with_identity(IdentityState::Provisional),
        );
        provisional.rebind("sk-...9f3a");
        assert_eq!(provisional.remote_key_id(), "sk-...9f3a");
        assert_eq!(provisional.identity(), IdentityState::Confirmed);

        key.rebind("sk-...0000");
        assert_eq!(key.remote_key_id(), "sk-...0000");
    }
}
