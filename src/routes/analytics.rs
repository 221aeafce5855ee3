use axum::{routing::get, Router};
use crate::handlers::analytics::{
    profit_by_customer, profit_by_product, profit_monthly, profit_summary,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/profit/summary", get(profit_summary))
        .route("/api/analytics/profit/by-product", get(profit_by_product))
        .route("/api/analytics/profit/by-customer", get(profit_by_customer))
        .route("/api/analytics/profit/monthly", get(profit_monthly))
}
