use axum::{
    routing::{delete, get},
    Router,
};
use crate::handlers::order::{bulk_orders, create_order, delete_order, list_orders};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/", get(list_orders).post(create_order))
        .route("/orders/bulk/", get(bulk_orders))
        .route("/orders/{id}", delete(delete_order))
}
