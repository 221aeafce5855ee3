use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::AppState;

/// Rejects the request unless it carries a valid `Authorization: Bearer` credential.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = match req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(h) => h,
        None => return AppError::unauthorized("Missing Authorization header").into_response(),
    };

    // Expect "Bearer <token>"; the scheme is case-insensitive
    let token = match auth_header.split_once(' ') {
        Some((scheme, t)) if scheme.eq_ignore_ascii_case("bearer") => t.trim(),
        _ => return AppError::unauthorized("Invalid Authorization format").into_response(),
    };

    let principal = match state.auth.authenticate_bearer(token) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "Bearer credential rejected");
            return AppError::from(e).into_response();
        }
    };

    tracing::debug!(subject = %principal.subject, kind = ?principal.kind, "Authenticated");
    req.extensions_mut().insert(principal);

    next.run(req).await
}
