//! Services layer for identity-admin.
//!
//! Business logic for the client registry and the user directory, plus the
//! persistence and session-gateway seams they depend on.

pub mod credentials;
mod database;
pub mod directory;
pub mod error;
pub mod memory;
pub mod reconciler;
pub mod registry;
pub mod session;
pub mod store;

pub use database::Database;
pub use directory::UserDirectory;
pub use error::{ServiceError, StoreError};
pub use memory::{GrantKind, InMemoryStore};
pub use reconciler::OuidReconciler;
pub use registry::{ClientRegistry, IssuedClient};
pub use session::{IdpSessionClient, MockSessionGateway, SessionCredential, SessionGateway};
pub use store::{ClientStore, IdentityStore};
