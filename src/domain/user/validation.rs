//! User identity validation

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur while normalising a user identity
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("User ID cannot be empty")]
    EmptyId,

    #[error("User ID exceeds maximum length of {0} characters")]
    IdTooLong(usize),

    #[error("User ID contains invalid character: {0:?}")]
    InvalidIdCharacter(char),
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

const MAX_USER_ID_LENGTH: usize = 254;

/// Normalise a raw identity into its canonical form
///
/// Rules:
/// - Surrounding whitespace is removed
/// - Lower-cased
/// - Cannot be empty
/// - Maximum 254 characters (the longest valid email address)
/// - No whitespace, control characters or path separators
pub fn normalize_user_id(raw: &str) -> Result<String, UserValidationError> {
    let id = raw.trim().to_lowercase();

    if id.is_empty() {
        return Err(UserValidationError::EmptyId);
    }

    if id.chars().count() > MAX_USER_ID_LENGTH {
        return Err(UserValidationError::IdTooLong(MAX_USER_ID_LENGTH));
    }

    // The identity is interpolated into the directory's /user/info/{id} path
    if let Some(c) = id
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'))
    {
        return Err(UserValidationError::InvalidIdCharacter(c));
    }

    Ok(id)
}
