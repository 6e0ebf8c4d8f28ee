//! OUID derivation for newly created identities.
//!
//! Institutional addresses collapse to their local part so the same person
//! keeps one OUID across student and staff mailboxes. Any other address is
//! used verbatim.

use crate::services::ServiceError;

#[derive(Debug, Clone)]
pub struct OuidReconciler {
    /// Lowercased suffixes, each starting with `@`.
    suffixes: Vec<String>,
}

impl OuidReconciler {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .map(|d| format!("@{}", d))
            .collect();
        Self { suffixes }
    }

    /// Derive the OUID for `email`.
    ///
    /// Rejects an empty address and anything without both a local part and a
    /// domain. A bare name would otherwise shadow an institutional OUID.
    pub fn derive_ouid(&self, email: &str) -> Result<String, ServiceError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ServiceError::validation("email", "Email is required"));
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Err(ServiceError::validation("email", "Email must contain a domain"));
        };
        if local.is_empty() {
            return Err(ServiceError::validation("email", "Email local part is empty"));
        }
        if domain.is_empty() || domain.contains('@') {
            return Err(ServiceError::validation("email", "Email domain is invalid"));
        }

        let lowered = email.to_ascii_lowercase();
        if self.suffixes.iter().any(|suffix| lowered.ends_with(suffix.as_str())) {
            return Ok(local.to_string());
        }

        Ok(email.to_string())
    }
}

impl Default for OuidReconciler {
    fn default() -> Self {
        Self::new(["student.chula.ac.th", "chula.ac.th"])
    }
}
