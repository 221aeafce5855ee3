use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::auth::{issue_api_key, login, me};
use crate::state::AppState;

/// Credential issuance. These carry their own authentication.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/api-key", post(issue_api_key))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}
