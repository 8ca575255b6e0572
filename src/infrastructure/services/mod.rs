//! Application services

mod key_lifecycle_service;
mod key_service;
mod provisioning_service;
mod reconciliation_service;
mod user_locks;

pub use key_lifecycle_service::{mask_secret, CreateKeyRequest, IssuedSecret, KeyLifecycleService};
pub use key_service::KeyService;
pub use provisioning_service::ProvisioningService;
pub use reconciliation_service::{ReconciliationService, VisibleKey};
pub use user_locks::{UserGuard, UserLocks};
