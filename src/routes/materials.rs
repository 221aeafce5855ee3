use axum::{
    routing::{get, put},
    Router,
};
use crate::handlers::material::{
    create_material, get_material, list_materials, update_material, update_material_ratio,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/materials/", get(list_materials).post(create_material))
        .route("/materials/{id}", get(get_material))
        .route("/materials/{id}/", put(update_material))
        .route("/materials/{id}/ratio/", put(update_material_ratio))
}
