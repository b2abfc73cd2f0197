use std::sync::Arc;
use uuid::Uuid;

use crate::{
    dtos::auth::{RegisterRequest, RegisterResponse, VerifyResponse},
    models::{User, UserResponse},
    services::{
        Claims, DeliveryJob, DispatchQueue, ServiceError, SessionRegistry, TokenKind,
        TokenResponse, TokenService, UserStore, VerificationCodeService,
    },
    utils::{Password, PasswordHashString},
};

/// Façade coordinating tokens, verification codes, revocation, and
/// delivery. The HTTP layer calls only into this.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    codes: VerificationCodeService,
    tokens: TokenService,
    registry: Arc<SessionRegistry>,
    dispatch: Arc<DispatchQueue>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        codes: VerificationCodeService,
        tokens: TokenService,
        registry: Arc<SessionRegistry>,
        dispatch: Arc<DispatchQueue>,
    ) -> Self {
        Self {
            users,
            codes,
            tokens,
            registry,
            dispatch,
        }
    }

    /// Create an unverified user and schedule code delivery. Success means
    /// delivery was scheduled, not that anything was delivered.
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        let password_hash = Password::new(req.password)
            .hash()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        let user = User::new(
            req.email.trim().to_lowercase(),
            password_hash.into_string(),
            req.display_name,
        );
        let user_id = user.user_id;
        let recipient = user.email.clone();

        self.users.insert(user).await?;

        tracing::info!(user_id = %user_id, "User registered");

        let code = self.codes.generate(user_id).await?;
        self.dispatch.enqueue(DeliveryJob {
            recipient,
            user_id,
            code,
        });

        Ok(RegisterResponse {
            user_id: user_id.to_string(),
            message: "Registration successful. Please check your email to verify your account."
                .to_string(),
        })
    }

    /// Consume a verification code and mark the user verified.
    pub async fn verify_email(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<VerifyResponse, ServiceError> {
        self.codes.validate(user_id, code).await?;

        if !self.users.mark_verified(user_id).await? {
            return Err(ServiceError::UserNotFound);
        }

        tracing::info!(user_id = %user_id, "Email verified");

        Ok(VerifyResponse {
            message: "Email verified successfully".to_string(),
        })
    }

    /// Regenerate and re-schedule a code for an unverified account. Always
    /// succeeds from the caller's point of view, so the endpoint reveals
    /// nothing about which addresses are registered.
    pub async fn resend_verification(&self, email: &str) -> Result<(), ServiceError> {
        let Some(user) = self
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?
        else {
            return Ok(());
        };

        if user.verified {
            return Ok(());
        }

        let code = self.codes.generate(user.user_id).await?;
        self.dispatch.enqueue(DeliveryJob {
            recipient: user.email.clone(),
            user_id: user.user_id,
            code,
        });

        tracing::info!(user_id = %user.user_id, "Verification code resent");
        Ok(())
    }

    /// Authenticate and issue a token pair. Requires a verified, active
    /// account.
    pub async fn login(&self, email: &str, password: String) -> Result<TokenResponse, ServiceError> {
        let user = self
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        Password::new(password)
            .verify(&PasswordHashString::new(user.password_hash.clone()))
            .map_err(|_| ServiceError::InvalidCredentials)?;

        if !user.is_active() {
            return Err(ServiceError::AccountDisabled);
        }
        if !user.verified {
            return Err(ServiceError::NotVerified);
        }

        let pair = self
            .tokens
            .issue_pair(&user.user_id.to_string(), &user.email)?;

        tracing::info!(user_id = %user.user_id, "Login successful");
        Ok(pair)
    }

    /// Invalidate the presented access token, and the refresh token when
    /// one is included.
    pub async fn logout(
        &self,
        access: &Claims,
        refresh_token: Option<&str>,
    ) -> Result<(), ServiceError> {
        self.registry.invalidate(&access.jti, access.exp);

        if let Some(token) = refresh_token {
            match self.tokens.verify(token, TokenKind::Refresh) {
                Ok(claims) => self.registry.invalidate(&claims.jti, claims.exp),
                // A bad refresh token does not block revoking the access
                // token.
                Err(e) => tracing::warn!(reason = %e, "Ignoring invalid refresh token on logout"),
            }
        }

        tracing::info!(user_id = %access.sub, "User logged out");
        Ok(())
    }

    /// Rotate a refresh token into a new pair; the used token is revoked
    /// even when the follow-up account checks fail.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ServiceError> {
        let (claims, pair) = self.tokens.rotate(refresh_token)?;

        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| ServiceError::UserNotFound)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if !user.is_active() {
            return Err(ServiceError::AccountDisabled);
        }
        if !user.verified {
            return Err(ServiceError::NotVerified);
        }

        tracing::info!(user_id = %user.user_id, "Token refreshed");
        Ok(pair)
    }

    /// Profile of the authenticated subject.
    pub async fn current_user(&self, claims: &Claims) -> Result<UserResponse, ServiceError> {
        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| ServiceError::UserNotFound)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        Ok(user.sanitized())
    }
}
