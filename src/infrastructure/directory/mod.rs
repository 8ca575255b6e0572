//! Credential directory implementations

mod litellm;
mod wire;

#[cfg(test)]
pub mod fake;

pub use litellm::LiteLlmDirectory;
