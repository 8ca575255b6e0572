//! Credential directory domain
//!
//! Types and the client trait for the upstream service that issues keys and
//! is the sole authority on which of them are still valid.

mod client;
mod entity;
mod expiry;

pub use client::CredentialDirectory;
pub use entity::{DirectoryUser, GenerateKeyRequest, GeneratedKey, RemoteKeyView};
pub use expiry::parse_expiry;

#[cfg(test)]
pub use client::MockCredentialDirectory;
