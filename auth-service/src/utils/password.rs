use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Cleartext password newtype so credentials never reach debug output or
/// logs.
#[derive(Clone)]
pub struct Password(String);

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl Password {
    pub fn new(raw: String) -> Self {
        Self(raw)
    }

    /// Hash with Argon2id; a random salt is generated and embedded in the
    /// encoded hash.
    pub fn hash(&self) -> Result<PasswordHashString, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        Ok(PasswordHashString::new(hash))
    }

    /// Verify against a stored hash. Argon2 verification is constant-time
    /// over the digest.
    pub fn verify(&self, stored: &PasswordHashString) -> Result<(), anyhow::Error> {
        let parsed = PasswordHash::new(stored.as_str())
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

        Argon2::default()
            .verify_password(self.0.as_bytes(), &parsed)
            .map_err(|_| anyhow::anyhow!("Password verification failed"))
    }
}

/// Encoded Argon2 hash, the only credential form that is ever persisted.
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_produces_argon2_encoding() {
        let password = Password::new("correct horse battery".to_string());
        let hash = password.hash().expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2"));
    }

    #[test]
    fn correct_password_verifies() {
        let password = Password::new("correct horse battery".to_string());
        let hash = password.hash().expect("Failed to hash password");

        assert!(password.verify(&hash).is_ok());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let password = Password::new("correct horse battery".to_string());
        let hash = password.hash().expect("Failed to hash password");

        let wrong = Password::new("incorrect horse".to_string());
        assert!(wrong.verify(&hash).is_err());
    }

    #[test]
    fn salting_makes_hashes_unique() {
        let password = Password::new("correct horse battery".to_string());
        let first = password.hash().expect("Failed to hash password");
        let second = password.hash().expect("Failed to hash password");

        assert_ne!(first.as_str(), second.as_str());
        assert!(password.verify(&first).is_ok());
        assert!(password.verify(&second).is_ok());
    }

    #[test]
    fn debug_output_redacts_cleartext() {
        let password = Password::new("supersecret".to_string());

        assert_eq!(format!("{:?}", password), "Password(<redacted>)");
    }
}
