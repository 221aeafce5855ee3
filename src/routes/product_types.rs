use axum::{routing::get, Router};
use crate::handlers::product_type::{
    create_product_type, delete_product_type, get_composition, get_product_type,
    list_product_types, preview_requirements, replace_composition, update_product_type,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product-types/", get(list_product_types).post(create_product_type))
        .route(
            "/product-types/{id}",
            get(get_product_type)
                .put(update_product_type)
                .delete(delete_product_type),
        )
        .route(
            "/product-types/{id}/composition",
            get(get_composition).put(replace_composition),
        )
        .route("/product-types/{id}/requirements", get(preview_requirements))
}
