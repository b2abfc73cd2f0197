//! Verification code issuance and validation.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::config::VerificationConfig;
use crate::models::VerificationCode;
use crate::services::{ServiceError, VerificationCodeStore};

/// Why a submitted code was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("no active verification code")]
    NotFound,
    #[error("verification code expired")]
    Expired,
    #[error("verification code already used")]
    AlreadyConsumed,
    #[error("verification code does not match")]
    Mismatch,
}

/// Generates and validates short-lived, single-use verification codes.
///
/// At most one code is active per user; generating supersedes the prior
/// one, so a delayed delivery of a stale code is harmless. Only the SHA-256
/// digest is stored, and submissions are compared constant-time.
#[derive(Clone)]
pub struct VerificationCodeService {
    store: Arc<dyn VerificationCodeStore>,
    code_ttl_minutes: i64,
    code_length: usize,
}

impl VerificationCodeService {
    pub fn new(store: Arc<dyn VerificationCodeStore>, config: &VerificationConfig) -> Self {
        Self {
            store,
            code_ttl_minutes: config.code_ttl_minutes,
            code_length: config.code_length,
        }
    }

    /// Generate a fresh code for the user, superseding any prior one.
    /// Returns the cleartext digits for delivery only.
    pub async fn generate(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let code = self.random_code();
        let record = VerificationCode::new(user_id, hash_code(&code), self.code_ttl_minutes);
        self.store.put_active(record).await?;

        tracing::debug!(user_id = %user_id, "Verification code generated");
        Ok(code)
    }

    /// Check a submitted code: presence, expiry, prior consumption, then a
    /// constant-time digest comparison. On success the code is consumed,
    /// exactly one concurrent submission can win.
    pub async fn validate(&self, user_id: Uuid, submitted: &str) -> Result<(), ServiceError> {
        let record = self
            .store
            .find_active(user_id)
            .await?
            .ok_or(VerificationError::NotFound)?;

        if record.is_expired() {
            return Err(VerificationError::Expired.into());
        }
        if record.is_consumed() {
            return Err(VerificationError::AlreadyConsumed.into());
        }

        let submitted_hash = hash_code(submitted);
        if !bool::from(
            submitted_hash
                .as_bytes()
                .ct_eq(record.code_hash.as_bytes()),
        ) {
            return Err(VerificationError::Mismatch.into());
        }

        if !self.store.mark_consumed(user_id, record.code_id).await? {
            return Err(VerificationError::AlreadyConsumed.into());
        }

        Ok(())
    }

    fn random_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.code_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10)))
            .collect()
    }
}

fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryVerificationCodeStore;

    fn test_service() -> VerificationCodeService {
        VerificationCodeService::new(
            Arc::new(MemoryVerificationCodeStore::new()),
            &VerificationConfig {
                code_ttl_minutes: 10,
                code_length: 6,
            },
        )
    }

    fn assert_verification_err(result: Result<(), ServiceError>, expected: VerificationError) {
        match result {
            Err(ServiceError::Verification(e)) => assert_eq!(e, expected),
            other => panic!("Expected {:?}, got {:?}", expected, other),
        }
    }

    #[test]
    fn codes_are_fixed_length_digits() {
        let service = test_service();
        let code = service.random_code();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn generated_code_validates_once() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let code = service.generate(user_id).await.unwrap();
        assert!(service.validate(user_id, &code).await.is_ok());

        assert_verification_err(
            service.validate(user_id, &code).await,
            VerificationError::AlreadyConsumed,
        );
    }

    #[tokio::test]
    async fn wrong_code_is_a_mismatch() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let code = service.generate(user_id).await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert_verification_err(
            service.validate(user_id, wrong).await,
            VerificationError::Mismatch,
        );

        // The mismatch did not consume the real code.
        assert!(service.validate(user_id, &code).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_user_has_no_code() {
        let service = test_service();

        assert_verification_err(
            service.validate(Uuid::new_v4(), "123456").await,
            VerificationError::NotFound,
        );
    }

    #[tokio::test]
    async fn regeneration_supersedes_the_old_code() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let first = service.generate(user_id).await.unwrap();
        let second = service.generate(user_id).await.unwrap();

        if first != second {
            assert_verification_err(
                service.validate(user_id, &first).await,
                VerificationError::Mismatch,
            );
        }
        assert!(service.validate(user_id, &second).await.is_ok());
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_regenerable() {
        let store = Arc::new(MemoryVerificationCodeStore::new());
        let service = VerificationCodeService::new(
            store.clone(),
            &VerificationConfig {
                code_ttl_minutes: 10,
                code_length: 6,
            },
        );
        let user_id = Uuid::new_v4();

        // Plant an already-expired record.
        let mut record = VerificationCode::new(user_id, hash_code("123456"), 10);
        record.expiry_utc = chrono::Utc::now() - chrono::Duration::seconds(1);
        store.put_active(record).await.unwrap();

        assert_verification_err(
            service.validate(user_id, "123456").await,
            VerificationError::Expired,
        );

        // A fresh code still works.
        let fresh = service.generate(user_id).await.unwrap();
        assert!(service.validate(user_id, &fresh).await.is_ok());
    }
}
