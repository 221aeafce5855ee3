use axum::{
    routing::{delete, get},
    Router,
};
use crate::handlers::customer::{create_customer, delete_customer, list_customers};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers/", get(list_customers).post(create_customer))
        .route("/customers/{name}", delete(delete_customer))
}
