use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::{RegisterRequest, ResendVerificationRequest, VerifyParams},
    utils::ValidatedJson,
    AppState,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, code delivery scheduled", body = RegisterResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// Verify a user's email via the emailed link
///
/// A GET by design: the side-effecting activation has to work from a plain
/// link click in a mail client.
#[utoipa::path(
    get,
    path = "/auth/verify",
    params(VerifyParams),
    responses(
        (status = 200, description = "Email verified successfully", body = VerifyResponse),
        (status = 400, description = "Code expired", body = ErrorResponse),
        (status = 404, description = "Invalid code", body = ErrorResponse),
        (status = 409, description = "Code already used", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .auth_service
        .verify_email(params.user, &params.code)
        .await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Resend the verification code
///
/// Responds 202 whether or not the address is registered.
#[utoipa::path(
    post,
    path = "/auth/verify/resend",
    request_body = ResendVerificationRequest,
    responses(
        (status = 202, description = "Delivery scheduled if the account exists and is unverified"),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendVerificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.resend_verification(&req.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "If the account exists, a new code is on its way"
        })),
    ))
}
