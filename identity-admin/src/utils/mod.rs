pub mod secret;
pub mod validation;

pub use secret::{hash_secret, verify_secret, ClientSecret};
pub use validation::ValidatedJson;
