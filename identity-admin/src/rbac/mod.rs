pub mod engine;
pub mod permission;
pub mod role;

pub use engine::{authorize, has_permission, require};
pub use permission::{PermissionRequest, Resource};
pub use role::Role;
