//! Reconciliation engine - converges shadow records onto the directory listing

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::user_locks::UserLocks;
use crate::domain::{
    CredentialDirectory, DomainError, KeyType, NewShadowKey, RemoteKeyView, ShadowKeyId,
    ShadowKeyRecord, ShadowKeyRepository, UserId,
};

/// An active key as shown to its owner: local metadata merged with live upstream fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleKey {
    pub key_id: String,
    pub name: String,
    pub mask: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub created_at: DateTime<Utc>,
    pub spend: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl VisibleKey {
    fn merge(record: &ShadowKeyRecord, view: &RemoteKeyView) -> Self {
        Self {
            key_id: record.remote_key_id().to_string(),
            name: record.name().to_string(),
            mask: record.mask().to_string(),
            key_type: record.key_type(),
            created_at: record.created_at(),
            spend: view.spend,
            expires_at: record.expires_at(),
        }
    }
}

/// Brings a user's shadow records in line with the directory.
///
/// Afterwards a record is active exactly when its key appears in the
/// latest listing without a past expiry.
pub struct ReconciliationService {
    store: Arc<dyn ShadowKeyRepository>,
    directory: Arc<dyn CredentialDirectory>,
    locks: Arc<UserLocks>,
}

/// Working copy of one user's records during a pass
struct Pass {
    records: Vec<ShadowKeyRecord>,
    by_remote_id: HashMap<String, usize>,
    seen: HashSet<ShadowKeyId>,
}

impl Pass {
    fn new(records: Vec<ShadowKeyRecord>) -> Self {
        let mut by_remote_id: HashMap<String, usize> = HashMap::new();

        // Records arrive in ascending id order, so a later record is newer
        for (idx, record) in records.iter().enumerate() {
            match by_remote_id.get(record.remote_key_id()) {
                Some(&current) if records[current].is_active() && !record.is_active() => {}
                _ => {
                    by_remote_id.insert(record.remote_key_id().to_string(), idx);
                }
            }
        }

        Self {
            records,
            by_remote_id,
            seen: HashSet::new(),
        }
    }

    fn exact(&self, remote_key_id: &str) -> Option<usize> {
        self.by_remote_id
            .get(remote_key_id)
            .copied()
            .filter(|&idx| !self.seen.contains(&self.records[idx].id()))
    }

    /// Newest unclaimed record with the same name whose identifier is not in the listing.
    ///
    /// Keys without an alias are never correlated by name.
    fn drifted(&self, view: &RemoteKeyView, listed: &HashSet<&str>) -> Option<usize> {
        if view.alias.is_empty() {
            return None;
        }

        self.records
            .iter()
            .enumerate()
            .rev()
            .find(|(_, record)| {
                record.name() == view.alias
                    && record.remote_key_id() != view.remote_key_id
                    && !listed.contains(record.remote_key_id())
                    && !self.seen.contains(&record.id())
            })
            .map(|(idx, _)| idx)
    }

    fn push(&mut self, record: ShadowKeyRecord) -> usize {
        let idx = self.records.len();
        self.by_remote_id
            .insert(record.remote_key_id().to_string(), idx);
        self.records.push(record);
        idx
    }
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn ShadowKeyRepository>,
        directory: Arc<dyn CredentialDirectory>,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            store,
            directory,
            locks,
        }
    }

    /// Reconcile `user_id`'s records and return the keys that are live upstream
    pub async fn reconcile(&self, user_id: &UserId) -> Result<Vec<VisibleKey>, DomainError> {
        let _guard = self.locks.lock(user_id).await;
        self.reconcile_at(user_id, Utc::now()).await
    }

    async fn reconcile_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<VisibleKey>, DomainError> {
        let records = self.store.list_for_user(user_id).await?;
        let listing = self.directory.list_keys(user_id).await?;

        let owned: Vec<&RemoteKeyView> = listing
            .iter()
            .filter(|view| {
                let owned = view.is_owned_by(user_id);
                if !owned {
                    debug!(user_id = %user_id, remote_key_id = %view.remote_key_id, "Skipping key owned by another user");
                }
                owned
            })
            .collect();
        let listed: HashSet<&str> = owned.iter().map(|v| v.remote_key_id.as_str()).collect();

        let mut pass = Pass::new(records);
        let mut processed: HashSet<&str> = HashSet::new();
        let mut visible = Vec::new();

        for view in owned {
            if !processed.insert(view.remote_key_id.as_str()) {
                warn!(user_id = %user_id, remote_key_id = %view.remote_key_id, "Duplicate key in directory listing");
                continue;
            }

            let expires_at = view.expires_at();
            let expired_at = expires_at.filter(|at| *at < now);

            let idx = match pass.exact(&view.remote_key_id) {
                Some(idx) => idx,
                None => match pass.drifted(view, &listed) {
                    Some(idx) => {
                        info!(
                            user_id = %user_id,
                            name = %view.alias,
                            from = %pass.records[idx].remote_key_id(),
                            to = %view.remote_key_id,
                            "Repairing drifted key identifier"
                        );
                        idx
                    }
                    None => {
                        let record = self.adopt(user_id, view).await?;
                        pass.push(record)
                    }
                },
            };

            let mut record = pass.records[idx].clone();
            if record.remote_key_id() != view.remote_key_id {
                pass.by_remote_id.remove(record.remote_key_id());
                record.rebind(&view.remote_key_id);
                pass.by_remote_id.insert(view.remote_key_id.clone(), idx);
            } else {
                record.confirm_identity();
            }

            match expired_at {
                Some(at) => {
                    if record.is_active() {
                        info!(user_id = %user_id, remote_key_id = %view.remote_key_id, "Key expired");
                    }
                    record.expire(at);
                }
                None => record.activate(expires_at),
            }

            if record != pass.records[idx] {
                record = self.store.update(&record).await?;
            }

            if record.is_active() {
                visible.push(VisibleKey::merge(&record, view));
            }

            pass.seen.insert(record.id());
            pass.records[idx] = record;
        }

        for record in pass.records.iter_mut() {
            if record.is_active() && !pass.seen.contains(&record.id()) {
                info!(
                    user_id = %user_id,
                    remote_key_id = %record.remote_key_id(),
                    "Key absent from directory, revoking"
                );
                record.revoke(now);
                self.store.update(record).await?;
            }
        }

        Ok(visible)
    }

    /// Start tracking a key that was issued outside this service
    async fn adopt(
        &self,
        user_id: &UserId,
        view: &RemoteKeyView,
    ) -> Result<ShadowKeyRecord, DomainError> {
        info!(user_id = %user_id, remote_key_id = %view.remote_key_id, name = %view.alias, "Tracking untracked directory key");

        let key = NewShadowKey::new(
            user_id.clone(),
            &view.remote_key_id,
            &view.alias,
            &view.remote_key_id,
            KeyType::Standard,
        );

        self.store.create(key).await
    }
}

impl std::fmt::Debug for ReconciliationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationService")
            .field("store", &self.store)
            .finish()
    }
}
