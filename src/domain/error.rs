use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    /// The directory could not be reached, or refused an authoritative read
    #[error("Directory unavailable: {message}")]
    Unavailable { message: String },

    /// The directory answered with a payload that could not be decoded
    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Key issuance failed{}: {body}", status_suffix(.status))]
    IssuanceFailed { status: Option<u16>, body: String },

    #[error("Key revocation failed: {message}")]
    RevocationFailed { message: String },

    #[error("User provisioning failed: {message}")]
    ProvisionFailed { message: String },

    /// Policy rejection, not a fault
    #[error("Limit reached: {message}")]
    LimitReached { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

impl DomainError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn issuance_failed(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::IssuanceFailed {
            status,
            body: body.into(),
        }
    }

    pub fn revocation_failed(message: impl Into<String>) -> Self {
        Self::RevocationFailed {
            message: message.into(),
        }
    }

    pub fn provision_failed(message: impl Into<String>) -> Self {
        Self::ProvisionFailed {
            message: message.into(),
        }
    }

    pub fn limit_reached(message: impl Into<String>) -> Self {
        Self::LimitReached {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Expected, user-facing outcomes rather than system faults
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::LimitReached { .. } | Self::NotFound { .. } | Self::Validation { .. }
        )
    }
}
