//! HTTP handlers for identity-admin.

pub mod clients;
pub mod internal;
pub mod metrics;
pub mod permission;
pub mod users;

pub use clients::*;
pub use internal::*;
pub use permission::*;
pub use users::*;
