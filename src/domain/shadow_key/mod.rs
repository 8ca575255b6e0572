//! Shadow key domain
//!
//! Local records of every credential ever issued or observed for a user.
//! The directory stays authoritative; these rows carry the lifecycle
//! metadata it does not keep (name, budget class, revocation time).

mod entity;
mod lifetime;
mod repository;
mod validation;

pub use entity::{
    IdentityState, KeyStatus, KeyType, NewShadowKey, ShadowKeyId, ShadowKeyRecord,
};
pub use lifetime::{KeyLifetime, LifetimeParseError};
pub use repository::ShadowKeyRepository;
pub use validation::{validate_key_name, KeyValidationError};
