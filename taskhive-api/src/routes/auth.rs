/// Account endpoints
///
/// This module provides the public account lifecycle endpoints:
/// - Sign-up (registers a pending account and emails an activation link)
/// - Activation (flips the account active, then sends a welcome email)
/// - Sign-in (issues an access/refresh token pair)
/// - Token refresh
/// - Password reset request and completion
///
/// # Endpoints
///
/// - `POST /v1/auth/sign_up` - Register a new account
/// - `GET  /v1/auth/activate?token=...` - Activate a pending account
/// - `POST /v1/auth/sign_in` - Sign in and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `POST /v1/auth/request_password_reset` - Email a reset link
/// - `POST /v1/auth/password_reset` - Replace the password with a reset token
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskhive_shared::auth::store::Credential;
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    /// Username (unique)
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,

    /// Email address (unique)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Public view of a credential
///
/// Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID
    pub id: i64,

    /// Username
    pub username: String,

    /// Email address
    pub email: String,

    /// Whether the account has been activated
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl From<Credential> for UserResponse {
    fn from(credential: Credential) -> Self {
        Self {
            id: credential.id,
            username: credential.username,
            email: credential.email,
            is_active: credential.is_active,
            created_at: credential.created_at,
        }
    }
}

/// Activation query parameters
#[derive(Debug, Deserialize)]
pub struct ActivateParams {
    /// Activation token from the emailed link
    pub token: String,
}

/// Sign-in request
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Username
    pub username: String,

    /// Password
    pub password: String,
}

/// Sign-in response
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    /// Short-lived access token
    pub access_token: String,

    /// Long-lived refresh token
    pub refresh_token: String,

    /// Token scheme for the Authorization header
    pub token_type: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token
    pub access_token: String,

    /// Token scheme for the Authorization header
    pub token_type: String,
}

/// Password reset request
#[derive(Debug, Deserialize, Validate)]
pub struct RequestPasswordResetRequest {
    /// Email address of the account
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password reset completion request
#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    /// Reset token from the emailed link
    pub token: String,

    /// Replacement password
    pub new_password: String,

    /// Must match `new_password`
    pub confirm_password: String,
}

/// Plain confirmation message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Flattens `validator` failures into the API error shape
fn validation_details(errors: validator::ValidationErrors) -> ApiError {
    let details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(details)
}

/// Register a new account
///
/// The account starts inactive; an activation link is emailed out of band.
/// Password strength rules are enforced as a whole, so a rejection reports
/// every violated rule at once.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/sign_up
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "Xk9!mQ2p$vL7"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username or email already registered
/// - `422 Unprocessable Entity`: Validation failed
/// - `500 Internal Server Error`: Server error
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate().map_err(validation_details)?;

    let issued = state
        .auth
        .sign_up(&req.username, &req.email, &req.password)
        .await?;

    let link = state.config.activation_link(&issued.activation.token);
    state
        .mailer
        .send_activation(&issued.credential.username, &issued.credential.email, &link)
        .await;

    Ok((StatusCode::CREATED, Json(issued.credential.into())))
}

/// Activate a pending account
///
/// Consumed from the emailed link, so this is a GET. A welcome email goes
/// out once the flag flips.
///
/// # Errors
///
/// - `400 Bad Request`: Account is already active
/// - `401 Unauthorized`: Expired, tampered, or wrong-kind token
/// - `404 Not Found`: Account no longer exists
pub async fn activate(
    State(state): State<AppState>,
    Query(params): Query<ActivateParams>,
) -> ApiResult<Json<UserResponse>> {
    let credential = state.auth.activate_account(&params.token).await?;

    state
        .mailer
        .send_welcome(&credential.username, &credential.email)
        .await;

    Ok(Json(credential.into()))
}

/// Sign in and get a token pair
///
/// Unknown username and wrong password are indistinguishable: both produce
/// the same 401. An inactive account also reads as 401, with its own message.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/sign_in
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "Xk9!mQ2p$vL7"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Bad credentials or inactive account
/// - `500 Internal Server Error`: Server error
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let pair = state.auth.log_in(&req.username, &req.password).await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        token_type: "bearer".to_string(),
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, or wrong-kind refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access = state.auth.refresh_access_token(&req.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: access.token,
        token_type: "bearer".to_string(),
    }))
}

/// Email a password reset link
///
/// # Errors
///
/// - `404 Not Found`: No account with that email
/// - `422 Unprocessable Entity`: Validation failed
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<RequestPasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate().map_err(validation_details)?;

    let issued = state.auth.request_password_reset(&req.email).await?;

    let link = state.config.password_reset_link(&issued.activation.token);
    state
        .mailer
        .send_password_reset(&issued.credential.email, &link)
        .await;

    Ok(Json(MessageResponse {
        message: "Password reset email sent".to_string(),
    }))
}

/// Replace the password using a reset token
///
/// The new password must match its confirmation and pass the same strength
/// gate as sign-up.
///
/// # Errors
///
/// - `401 Unauthorized`: Expired, tampered, or wrong-kind token
/// - `404 Not Found`: Account no longer exists
/// - `422 Unprocessable Entity`: Mismatched confirmation or weak password
pub async fn password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .auth
        .password_reset(&req.token, &req.new_password, &req.confirm_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
