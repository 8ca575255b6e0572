//! Shadow key store implementations

mod in_memory;
mod postgres_repository;

pub use in_memory::InMemoryShadowKeyRepository;
pub use postgres_repository::PostgresShadowKeyRepository;
