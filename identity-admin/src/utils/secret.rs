use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// Plaintext client secret. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Hex SHA-256 of the plaintext, used to detect re-issued secrets.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

/// Hash a secret with Argon2id and a random salt.
pub fn hash_secret(secret: &ClientSecret) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(secret.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash client secret: {}", e))?
        .to_string();

    Ok(hash)
}

/// Check a presented secret against a stored Argon2 hash.
pub fn verify_secret(secret: &ClientSecret, hash: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid secret hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(secret.as_str().as_bytes(), &parsed)
        .is_ok())
}
