use axum::extract::{Extension, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use tracing::{info, instrument};

use crate::auth::basic::parse_basic;
use crate::auth::{AuthError, Principal};
use crate::dtos::auth::{ApiKeyResponse, LoginRequest, LoginResponse, MeResponse};
use crate::error::AppError;
use crate::state::AppState;

// POST /auth/login - Exchange username/password for an access token
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("Username required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }

    let auth = state.auth.clone();
    let token = tokio::task::spawn_blocking(move || auth.login(&payload.username, &payload.password))
        .await
        .map_err(|e| AppError::internal(format!("Login task failed: {e}")))??;

    info!("Access token issued");
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer",
        expires_in_seconds: state.auth.token_ttl_seconds(),
    }))
}

// POST /auth/api-key - Issue an API key to a caller presenting HTTP Basic credentials
#[instrument(skip(state, headers))]
pub async fn issue_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;
    let credentials = parse_basic(header_value)?;

    let auth = state.auth.clone();
    let api_key = tokio::task::spawn_blocking(move || {
        auth.issue_api_key(&credentials.username, &credentials.password)
    })
    .await
    .map_err(|e| AppError::internal(format!("API key task failed: {e}")))??;

    info!("API key issued");
    Ok(Json(ApiKeyResponse {
        api_key,
        message: "Use this API key in the Authorization header as 'Bearer <api_key>'",
    }))
}

// GET /auth/me - The authenticated principal
pub async fn me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse { principal })
}
