//! LiteLLM request/response bodies

use serde::{Deserialize, Serialize};

use crate::domain::{DirectoryUser, GeneratedKey, RemoteKeyView, UserId};

#[derive(Debug, Serialize)]
pub(super) struct NewUserBody<'a> {
    pub user_id: &'a str,
    pub user_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteKeysBody<'a> {
    pub keys: [&'a str; 1],
}

#[derive(Debug, Default, Deserialize)]
struct WireUser {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    max_budget: Option<f64>,
    #[serde(default)]
    spend: Option<f64>,
}

/// `/user/info` answers either with the user at the top level or nested
/// under `user_info`, depending on the proxy version
#[derive(Debug, Deserialize)]
pub(super) struct UserInfoResponse {
    #[serde(flatten)]
    top: WireUser,
    #[serde(default)]
    user_info: Option<WireUser>,
}

impl UserInfoResponse {
    pub fn into_domain(self, requested: &UserId) -> DirectoryUser {
        let nested = self.user_info.unwrap_or_default();

        DirectoryUser {
            user_id: nested
                .user_id
                .or(self.top.user_id)
                .unwrap_or_else(|| requested.to_string()),
            user_email: nested.user_email.or(self.top.user_email),
            max_budget: nested.max_budget.or(self.top.max_budget),
            spend: nested.spend.or(self.top.spend).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireKey {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    key_name: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    key_alias: Option<String>,
    #[serde(default)]
    spend: Option<f64>,
    #[serde(default)]
    expires: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

impl WireKey {
    /// `None` when the entry carries no identifier at all
    pub fn into_domain(self) -> Option<RemoteKeyView> {
        let remote_key_id = [self.key, self.key_name, self.token]
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty())?;

        Some(RemoteKeyView {
            remote_key_id,
            alias: self.key_alias.unwrap_or_default(),
            owner_user_id: self.user_id,
            spend: self.spend.unwrap_or_default(),
            expires_at_raw: self.expires,
        })
    }
}

/// `/key/list` returns `{"keys": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum KeyListResponse {
    Wrapped { keys: Vec<WireKey> },
    Bare(Vec<WireKey>),
}

impl KeyListResponse {
    pub fn into_keys(self) -> Vec<WireKey> {
        match self {
            Self::Wrapped { keys } => keys,
            Self::Bare(keys) => keys,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GenerateKeyResponse {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    key_name: Option<String>,
    #[serde(default)]
    max_budget: Option<f64>,
    #[serde(default)]
    key_alias: Option<String>,
}

impl GenerateKeyResponse {
    pub fn into_domain(self) -> Option<GeneratedKey> {
        let secret = self.key.filter(|k| !k.is_empty())?;

        Some(GeneratedKey {
            secret,
            remote_key_id: self.token.or(self.key_name),
            max_budget: self.max_budget,
            key_alias: self.key_alias,
        })
    }
}
