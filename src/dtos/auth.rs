use serde::{Deserialize, Serialize};

use crate::auth::Principal;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_seconds: i64,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub principal: Principal,
}
