//! In-memory credential directory for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{
    CredentialDirectory, DirectoryUser, DomainError, GenerateKeyRequest, GeneratedKey,
    RemoteKeyView, UserId,
};

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<String, DirectoryUser>,
    keys: Vec<RemoteKeyView>,
    list_calls: usize,
    fail_list_from: Option<usize>,
    fail_lookup: bool,
    fail_provision: bool,
    fail_generate: Option<(u16, String)>,
    fail_delete: bool,
    lookups: usize,
    provisioned: Vec<(String, Option<f64>)>,
    generated: Vec<GenerateKeyRequest>,
    deleted: Vec<String>,
}

/// Directory fake that keeps upstream state in memory
///
/// Issued secrets look like `sk-test-00000001` and are listed under the
/// masked identifier `sk-...0001`, so the identifier captured at issuance
/// differs from the one reported by listings.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: &str) -> Self {
        self.state.lock().unwrap().users.insert(
            user_id.to_string(),
            DirectoryUser {
                user_id: user_id.to_string(),
                user_email: Some(user_id.to_string()),
                max_budget: None,
                spend: 0.0,
            },
        );
        self
    }

    pub fn with_key(self, key: RemoteKeyView) -> Self {
        self.insert_key(key);
        self
    }

    pub fn insert_key(&self, key: RemoteKeyView) {
        self.state.lock().unwrap().keys.push(key);
    }

    pub fn remove_key(&self, remote_key_id: &str) {
        self.state
            .lock()
            .unwrap()
            .keys
            .retain(|k| k.remote_key_id != remote_key_id);
    }

    /// Change the identifier the listing reports for a key
    pub fn rekey(&self, old: &str, new: &str) {
        let mut state = self.state.lock().unwrap();
        for key in state.keys.iter_mut().filter(|k| k.remote_key_id == old) {
            key.remote_key_id = new.to_string();
        }
    }

    /// Listing calls numbered from `call` (0-based) fail
    pub fn fail_list_from(&self, call: usize) {
        self.state.lock().unwrap().fail_list_from = Some(call);
    }

    pub fn fail_lookup(&self) {
        self.state.lock().unwrap().fail_lookup = true;
    }

    pub fn fail_provision(&self) {
        self.state.lock().unwrap().fail_provision = true;
    }

    pub fn fail_generate(&self, status: u16, body: &str) {
        self.state.lock().unwrap().fail_generate = Some((status, body.to_string()));
    }

    pub fn fail_delete(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }

    pub fn keys(&self) -> Vec<RemoteKeyView> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    pub fn provisioned(&self) -> Vec<(String, Option<f64>)> {
        self.state.lock().unwrap().provisioned.clone()
    }

    pub fn generated(&self) -> Vec<GenerateKeyRequest> {
        self.state.lock().unwrap().generated.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

fn masked_listing_id(secret: &str) -> String {
    format!("sk-...{}", &secret[secret.len() - 4..])
}

#[async_trait]
impl CredentialDirectory for InMemoryDirectory {
    async fn lookup_user(&self, user_id: &UserId) -> Result<Option<DirectoryUser>, DomainError> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;

        if state.fail_lookup {
            return Err(DomainError::unavailable("fake lookup failure"));
        }

        Ok(state.users.get(user_id.as_str()).cloned())
    }

    async fn provision_user(
        &self,
        user_id: &UserId,
        email: &str,
        max_budget: Option<f64>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_provision {
            return Err(DomainError::provision_failed("fake provision failure"));
        }

        state
            .provisioned
            .push((user_id.to_string(), max_budget));
        state.users.insert(
            user_id.to_string(),
            DirectoryUser {
                user_id: user_id.to_string(),
                user_email: Some(email.to_string()),
                max_budget,
                spend: 0.0,
            },
        );
        Ok(())
    }

    async fn list_keys(&self, _user_id: &UserId) -> Result<Vec<RemoteKeyView>, DomainError> {
        let mut state = self.state.lock().unwrap();
        let call = state.list_calls;
        state.list_calls += 1;

        if state.fail_list_from.is_some_and(|from| call >= from) {
            return Err(DomainError::unavailable("fake listing failure"));
        }

        // Unfiltered; callers re-check ownership
        Ok(state.keys.clone())
    }

    async fn generate_key(&self, request: &GenerateKeyRequest) -> Result<GeneratedKey, DomainError> {
        let mut state = self.state.lock().unwrap();

        if let Some((status, body)) = &state.fail_generate {
            return Err(DomainError::issuance_failed(Some(*status), body.clone()));
        }

        state.generated.push(request.clone());
        let serial = state.generated.len();
        let secret = format!("sk-test-{:08}", serial);

        state.keys.push(
            RemoteKeyView::new(masked_listing_id(&secret), &request.key_alias)
                .with_owner(request.user_id.as_str()),
        );

        Ok(GeneratedKey {
            secret,
            remote_key_id: Some(format!("token-{}", serial)),
            max_budget: request.max_budget,
            key_alias: Some(request.key_alias.clone()),
        })
    }

    async fn delete_key(&self, remote_key_id: &str) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_delete {
            return Err(DomainError::revocation_failed("fake delete failure"));
        }

        state.deleted.push(remote_key_id.to_string());
        state.keys.retain(|k| k.remote_key_id != remote_key_id);
        Ok(())
    }
}
