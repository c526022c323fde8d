use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use rand::rngs::OsRng;

use super::errors::AuthError;

/// Argon2id password hashing. Hashes are self-describing PHC strings, so a
/// change of parameters keeps old hashes verifiable.
pub struct Passwords {
    argon: Argon2<'static>,
    dummy: OnceLock<String>,
}

impl Default for Passwords {
    fn default() -> Self {
        Self { argon: Argon2::default(), dummy: OnceLock::new() }
    }
}

impl Passwords {
    /// Custom cost parameters: memory in KiB, iterations, lanes.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(m_cost, t_cost, p_cost, None).map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Self { argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params), dummy: OnceLock::new() })
    }

    pub fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .argon
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string())
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(self.argon.verify_password(plain.as_bytes(), &parsed).is_ok())
    }

    /// Spend one verification's worth of work against a throwaway hash, so an
    /// unknown login costs the same as a wrong password.
    pub fn burn(&self, plain: &str) {
        if let Ok(parsed) = PasswordHash::new(self.dummy()) {
            let _ = self.argon.verify_password(plain.as_bytes(), &parsed);
        }
    }

    /// Build the throwaway hash up front; otherwise the first `burn` also pays for hashing.
    pub fn warm(&self) {
        self.dummy();
    }

    fn dummy(&self) -> &str {
        self.dummy.get_or_init(|| self.hash("not-a-real-password-0").unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Passwords {
        Passwords::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let pw = fast();
        let h = pw.hash("Passw0rd").unwrap();
        assert!(h.starts_with("$argon2id$"));
        assert!(!h.contains("Passw0rd"));
        assert!(pw.verify("Passw0rd", &h).unwrap());
        assert!(!pw.verify("Passw0rd!", &h).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        let pw = fast();
        assert_ne!(pw.hash("Passw0rd").unwrap(), pw.hash("Passw0rd").unwrap());
    }

    #[test]
    fn warm_builds_the_dummy_hash_once() {
        let pw = fast();
        assert!(pw.dummy.get().is_none());
        pw.warm();
        let first = pw.dummy.get().cloned().unwrap();
        assert!(first.starts_with("$argon2id$"));
        pw.burn("anything");
        pw.warm();
        assert_eq!(pw.dummy.get(), Some(&first));
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(matches!(fast().verify("x", "not-a-phc-string"), Err(AuthError::Hash(_))));
        fast().burn("anything");
    }
}
