pub mod auth;
pub mod hook;

pub use auth::{session_auth_middleware, CurrentUser};
pub use hook::{hook_auth_middleware, HOOK_API_KEY_HEADER};
