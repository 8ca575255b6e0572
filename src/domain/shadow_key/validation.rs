//! Key name validation

use thiserror::Error;

use crate::domain::DomainError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyValidationError {
    #[error("Key name cannot be empty")]
    EmptyName,

    #[error("Key name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Key name contains a control character")]
    ControlCharacter,
}

impl From<KeyValidationError> for DomainError {
    fn from(err: KeyValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

const MAX_KEY_NAME_LENGTH: usize = 64;

/// Validate a user-chosen key name
///
/// The name doubles as the directory alias and as the fallback correlation
/// key during reconciliation, so it is compared verbatim after trimming.
pub fn validate_key_name(name: &str) -> Result<(), KeyValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(KeyValidationError::EmptyName);
    }

    if name.chars().count() > MAX_KEY_NAME_LENGTH {
        return Err(KeyValidationError::NameTooLong(MAX_KEY_NAME_LENGTH));
    }

    if name.chars().any(char::is_control) {
        return Err(KeyValidationError::ControlCharacter);
    }

    Ok(())
}
