use service_core::error::AppError;
use thiserror::Error;

use crate::services::{StoreError, TokenError, VerificationError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account not verified")]
    NotVerified,

    #[error("account disabled")]
    AccountDisabled,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("user not found")]
    UserNotFound,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ServiceError::EmailAlreadyRegistered,
            StoreError::Backend(e) => ServiceError::Internal(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            // Clients get one generic message for every token failure; the
            // precise cause stays in the logs.
            ServiceError::Token(e) => {
                tracing::warn!(reason = %e, "Token verification failed");
                AppError::AuthError(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::Verification(e) => match e {
                VerificationError::NotFound | VerificationError::Mismatch => {
                    AppError::NotFound(anyhow::anyhow!("Invalid verification code"))
                }
                VerificationError::Expired => {
                    AppError::BadRequest(anyhow::anyhow!("Verification code expired"))
                }
                VerificationError::AlreadyConsumed => {
                    AppError::Conflict(anyhow::anyhow!("Verification code already used"))
                }
            },
            // Deliberately identical for unknown email and wrong password.
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid email or password"))
            }
            ServiceError::NotVerified => {
                AppError::Forbidden(anyhow::anyhow!("Account not verified"))
            }
            ServiceError::AccountDisabled => {
                AppError::Forbidden(anyhow::anyhow!("Account disabled"))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
