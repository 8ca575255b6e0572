//! API middleware components

pub mod forwarded_user;

pub use forwarded_user::{RequireUser, FORWARDED_EMAIL_HEADER};
