//! Infrastructure layer - External service implementations

pub mod directory;
pub mod logging;
pub mod migrations;
pub mod services;
pub mod shadow_key;
