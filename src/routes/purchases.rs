use axum::{
    routing::{delete, get},
    Router,
};
use crate::handlers::purchase::{create_purchase, delete_purchase, list_purchases};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/material-purchases/", get(list_purchases).post(create_purchase))
        .route("/material-purchases/{id}", delete(delete_purchase))
}
