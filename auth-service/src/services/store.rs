//! Storage contracts for the auth core, with concurrent in-memory
//! implementations.
//!
//! Persistence is a collaborator: the core only relies on the narrow
//! contracts below. Implementations must give atomic per-key upserts so
//! that concurrent writes for the same user serialize without a global
//! lock; the DashMap entry API provides exactly that here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{User, VerificationCode};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("storage error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; fails with `DuplicateEmail` when the address is
    /// already registered.
    async fn insert(&self, user: User) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Flip the verified flag; returns false when the user does not exist.
    /// The flag never reverts.
    async fn mark_verified(&self, user_id: Uuid) -> Result<bool, StoreError>;

    /// Unverified accounts created before the cutoff. Consumed by an
    /// external cleanup sweeper, not by the request path.
    async fn list_unverified_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait VerificationCodeStore: Send + Sync {
    /// Replace any existing record for the user atomically (supersede).
    async fn put_active(&self, code: VerificationCode) -> Result<(), StoreError>;

    async fn find_active(&self, user_id: Uuid) -> Result<Option<VerificationCode>, StoreError>;

    /// Mark the user's record consumed. Returns false when the record is
    /// missing, already consumed, or was superseded (`code_id` mismatch),
    /// so exactly one concurrent submission can win.
    async fn mark_consumed(&self, user_id: Uuid, code_id: Uuid) -> Result<bool, StoreError>;
}

/// In-memory user store keyed by id with an email index.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
    email_index: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        // The entry lock on the email index makes concurrent registration
        // of the same address race-safe.
        match self.email_index.entry(user.email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.user_id);
                self.users.insert(user.user_id, user);
                Ok(())
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(user_id) = self.email_index.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<bool, StoreError> {
        match self.users.get_mut(&user_id) {
            Some(mut entry) => {
                entry.value_mut().verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_unverified_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .filter(|entry| !entry.value().verified && entry.value().created_utc < cutoff)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// In-memory verification code store, one active record per user.
#[derive(Debug, Default)]
pub struct MemoryVerificationCodeStore {
    codes: DashMap<Uuid, VerificationCode>,
}

impl MemoryVerificationCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationCodeStore for MemoryVerificationCodeStore {
    async fn put_active(&self, code: VerificationCode) -> Result<(), StoreError> {
        self.codes.insert(code.user_id, code);
        Ok(())
    }

    async fn find_active(&self, user_id: Uuid) -> Result<Option<VerificationCode>, StoreError> {
        Ok(self.codes.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn mark_consumed(&self, user_id: Uuid, code_id: Uuid) -> Result<bool, StoreError> {
        match self.codes.get_mut(&user_id) {
            Some(mut entry) => {
                let record = entry.value_mut();
                if record.code_id != code_id || record.is_consumed() {
                    return Ok(false);
                }
                record.consumed_utc = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
