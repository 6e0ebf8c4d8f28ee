//! Client id and secret generation.
//!
//! A credential is a fixed prefix followed by lowercase hex from the OS RNG,
//! cut to the exact total length.

use rand::{rngs::OsRng, RngCore};

pub const CLIENT_ID_PREFIX: &str = "vidya-ci-";
pub const CLIENT_ID_LENGTH: usize = 32;

pub const CLIENT_SECRET_PREFIX: &str = "vidya-cs-";
pub const CLIENT_SECRET_LENGTH: usize = 64;

/// Attempts before a uniqueness collision is reported as a conflict.
pub const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Generate `prefix` + hex, exactly `total_len` characters long.
///
/// Returns the bare prefix if it already fills `total_len`.
pub fn generate_credential(prefix: &str, total_len: usize) -> String {
    let hex_len = total_len.saturating_sub(prefix.len());
    let mut bytes = vec![0u8; hex_len.div_ceil(2)];
    OsRng.fill_bytes(&mut bytes);

    let mut credential = String::with_capacity(prefix.len() + hex_len);
    credential.push_str(prefix);
    credential.push_str(&hex::encode(bytes)[..hex_len]);
    credential
}

pub fn generate_client_id() -> String {
    generate_credential(CLIENT_ID_PREFIX, CLIENT_ID_LENGTH)
}

pub fn generate_client_secret() -> String {
    generate_credential(CLIENT_SECRET_PREFIX, CLIENT_SECRET_LENGTH)
}
