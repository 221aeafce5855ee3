use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers::inventory::{
    create_inventory, list_inventory, low_stock_alerts, set_inventory_quantity, sync_inventory,
    update_inventory,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory/", get(list_inventory).post(create_inventory))
        .route("/inventory/alerts/", get(low_stock_alerts))
        .route("/inventory/sync/", post(sync_inventory))
        .route("/inventories/{id}/quantity/", put(set_inventory_quantity))
        .route("/inventories/{id}/", put(update_inventory))
}
