//! Verification code model - single-use email confirmation secrets.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Verification code record bound to one user.
///
/// Only the SHA-256 digest of the digits is kept; the cleartext exists
/// solely in the delivery path. At most one record per user is active at a
/// time, newer records supersede older ones.
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub code_id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub expiry_utc: DateTime<Utc>,
    pub consumed_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl VerificationCode {
    /// Create a new code record expiring `ttl_minutes` from now.
    pub fn new(user_id: Uuid, code_hash: String, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            code_id: Uuid::new_v4(),
            user_id,
            code_hash,
            expiry_utc: now + Duration::minutes(ttl_minutes),
            consumed_utc: None,
            created_utc: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_utc
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_utc.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_code_is_usable() {
        let code = VerificationCode::new(Uuid::new_v4(), "digest".to_string(), 10);

        assert!(!code.is_expired());
        assert!(!code.is_consumed());
    }

    #[test]
    fn past_expiry_marks_code_expired() {
        let mut code = VerificationCode::new(Uuid::new_v4(), "digest".to_string(), 10);
        code.expiry_utc = Utc::now() - Duration::seconds(1);

        assert!(code.is_expired());
    }

    #[test]
    fn consumed_timestamp_marks_code_consumed() {
        let mut code = VerificationCode::new(Uuid::new_v4(), "digest".to_string(), 10);
        code.consumed_utc = Some(Utc::now());

        assert!(code.is_consumed());
    }
}
