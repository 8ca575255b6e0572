//! Domain layer - Core business types and the seams to external collaborators

pub mod directory;
pub mod error;
pub mod shadow_key;
pub mod user;

pub use directory::{
    CredentialDirectory, DirectoryUser, GenerateKeyRequest, GeneratedKey, RemoteKeyView,
};
pub use error::DomainError;
pub use shadow_key::{
    IdentityState, KeyLifetime, KeyStatus, KeyType, NewShadowKey, ShadowKeyId, ShadowKeyRecord,
    ShadowKeyRepository,
};
pub use user::UserId;
