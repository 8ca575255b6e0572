//! User domain
//!
//! Identities arrive from the trusted forwarding proxy as email-like strings
//! and are normalised before they reach the directory or the shadow store.

mod entity;
mod validation;

pub use entity::UserId;
pub use validation::{normalize_user_id, UserValidationError};
