//! Services layer for the authentication service.
//!
//! Business logic lives here; HTTP handlers only translate between the
//! wire and these services.

mod auth;
mod dispatch;
mod email;
pub mod error;
mod revocation;
mod store;
mod token;
mod verification;

pub use auth::AuthService;
pub use dispatch::{DeliveryJob, DispatchQueue};
pub use email::{EmailProvider, EmailService, MockEmailService, SentMessage};
pub use error::ServiceError;
pub use revocation::SessionRegistry;
pub use store::{
    MemoryUserStore, MemoryVerificationCodeStore, StoreError, UserStore, VerificationCodeStore,
};
pub use token::{Claims, TokenError, TokenKind, TokenResponse, TokenService};
pub use verification::{VerificationCodeService, VerificationError};
