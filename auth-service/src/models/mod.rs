pub mod user;
pub mod verification_code;

pub use user::{User, UserResponse, UserState};
pub use verification_code::VerificationCode;
