use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::database::inserted_id;
use crate::dtos::customer::CreateCustomerRequest;
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::state::AppState;

// GET /customers/ - List all customers
#[instrument(skip(db_pool))]
pub async fn list_customers(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = sqlx::query_as::<_, Customer>(
        "SELECT id, name, created_at FROM customers ORDER BY name",
    )
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(customers))
}

// POST /customers/ - Create a customer
#[instrument(skip(db_pool, payload), fields(name = %payload.name))]
pub async fn create_customer(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Customer name required"));
    }

    let result = sqlx::query("INSERT INTO customers (name) VALUES (?)")
        .bind(name)
        .execute(&db_pool)
        .await
        .map_err(|e| AppError::from_write(e, "Customer already exists", "Invalid customer"))?;

    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, name, created_at FROM customers WHERE id = ?",
    )
    .bind(inserted_id(&result))
    .fetch_one(&db_pool)
    .await?;

    info!(id = customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

// DELETE /customers/{name} - Delete a customer and, by cascade, their orders
#[instrument(skip(db_pool))]
pub async fn delete_customer(
    Path(name): Path<String>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM customers WHERE name = ?")
        .bind(&name)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Customer not found"));
    }

    info!("Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
