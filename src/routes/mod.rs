pub mod analytics;
pub mod auth;
pub mod customers;
pub mod inventory;
pub mod materials;
pub mod orders;
pub mod product_types;
pub mod purchases;

use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::routes())
        .merge(customers::routes())
        .merge(product_types::routes())
        .merge(materials::routes())
        .merge(inventory::routes())
        .merge(purchases::routes())
        .merge(orders::routes())
        .merge(analytics::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(|| async { "Besco API" }))
        .route("/health", get(health_check))
        .merge(auth::public_routes())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::sign_token;
    use crate::auth::tests::{test_authenticator, ADMIN_PASSWORD, TEST_API_KEY, TEST_SECRET};
    use crate::reports::OverheadRates;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::Value;
    use sqlx::mysql::MySqlPool;
    use tower::ServiceExt;

    // The pool never connects: every request here is answered before a handler
    // touches the database.
    fn app() -> Router {
        let pool = MySqlPool::connect_lazy("mysql://besco@localhost/besco_test").unwrap();
        create_router(AppState::new(pool, test_authenticator(), OverheadRates::default()))
    }

    fn get_with(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let response = app().oneshot(get_with("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let response = app().oneshot(get_with("/customers/", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing Authorization header");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let response = app()
            .oneshot(get_with("/customers/", Some("Token static-key-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_scheme_is_case_insensitive() {
        for scheme in ["bearer", "BEARER", "Bearer"] {
            let response = app()
                .oneshot(get_with("/auth/me", Some(&format!("{scheme} {TEST_API_KEY}"))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{scheme}");
        }
    }

    #[tokio::test]
    async fn oversized_order_amounts_are_a_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/orders/")
            .header(header::AUTHORIZATION, format!("Bearer {TEST_API_KEY}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"customer_name": "Cafe Mori", "product_type_id": 1,
                    "quantity": 1e20, "unit_price": 1e20, "order_date": "2025-05-02"}"#,
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let response = app()
            .oneshot(get_with("/orders/", Some("Bearer nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let token = sign_token("admin", "admin", TEST_SECRET, chrono::Duration::minutes(-5)).unwrap();
        let response = app()
            .oneshot(get_with("/auth/me", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn configured_api_key_is_accepted() {
        let response = app()
            .oneshot(get_with("/auth/me", Some(&format!("Bearer {TEST_API_KEY}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "static_key");
    }

    #[tokio::test]
    async fn valid_access_token_is_accepted() {
        let token = sign_token("admin", "admin", TEST_SECRET, chrono::Duration::minutes(30)).unwrap();
        let response = app()
            .oneshot(get_with("/auth/me", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["subject"], "admin");
        assert_eq!(body["kind"], "access_token");
    }

    #[tokio::test]
    async fn issued_api_key_opens_protected_routes() {
        let basic = STANDARD.encode(format!("admin:{ADMIN_PASSWORD}"));
        let request = Request::builder()
            .method("POST")
            .uri("/auth/api-key")
            .header(header::AUTHORIZATION, format!("Basic {basic}"))
            .body(Body::empty())
            .unwrap();

        let app = app();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let api_key = json_body(response).await["api_key"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(api_key.starts_with("besco_admin_"));

        let response = app
            .oneshot(get_with("/auth/me", Some(&format!("Bearer {api_key}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["kind"], "issued_key");
    }

    #[tokio::test]
    async fn wrong_basic_password_is_rejected() {
        let basic = STANDARD.encode("admin:wrong");
        let request = Request::builder()
            .method("POST")
            .uri("/auth/api-key")
            .header(header::AUTHORIZATION, format!("Basic {basic}"))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
