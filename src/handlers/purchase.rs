use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use sqlx::MySqlExecutor;
use tracing::{info, instrument};

use crate::amounts;
use crate::database::inserted_id;
use crate::dtos::purchase::CreatePurchaseRequest;
use crate::error::AppError;
use crate::handlers::inventory::{adjust_stock, lock_stock};
use crate::handlers::material::find_material;
use crate::models::purchase::MaterialPurchase;
use crate::state::AppState;

const PURCHASE_COLUMNS: &str = "id, material_id, material_name, quantity, price, total, \
     purchase_date, supplier, note, created_at";

async fn find_purchase<'e, E>(executor: E, id: i64) -> Result<MaterialPurchase, AppError>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, MaterialPurchase>(&format!(
        "SELECT {PURCHASE_COLUMNS} FROM material_purchases WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("Material purchase not found"))
}

fn purchase_total(payload: &CreatePurchaseRequest) -> Result<Decimal, AppError> {
    amounts::positive_quantity(payload.quantity, "Quantity")?;
    amounts::price(payload.price, "Price")?;
    match payload.total {
        Some(total) => amounts::total(total, "Total"),
        None => amounts::line_total(payload.quantity, payload.price, "Total"),
    }
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// GET /material-purchases/ - All purchases, newest first
#[instrument(skip(db_pool))]
pub async fn list_purchases(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<MaterialPurchase>>, AppError> {
    let purchases = sqlx::query_as::<_, MaterialPurchase>(&format!(
        "SELECT {PURCHASE_COLUMNS} FROM material_purchases
         ORDER BY purchase_date DESC, id DESC"
    ))
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(purchases))
}

// POST /material-purchases/ - Record a purchase and add it to stock
#[instrument(skip(db_pool, payload), fields(material_id = payload.material_id))]
pub async fn create_purchase(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<MaterialPurchase>), AppError> {
    let total = purchase_total(&payload)?;

    let mut tx = db_pool.begin().await?;

    let material = find_material(&mut *tx, payload.material_id).await?;

    let result = sqlx::query(
        "INSERT INTO material_purchases
             (material_id, material_name, quantity, price, total, purchase_date, supplier, note)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(material.id)
    .bind(&material.name)
    .bind(payload.quantity)
    .bind(payload.price)
    .bind(total)
    .bind(payload.purchase_date)
    .bind(blank_to_none(payload.supplier.as_deref()))
    .bind(blank_to_none(payload.note.as_deref()))
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "Duplicate purchase", "Material not found"))?;
    let id = inserted_id(&result);

    // Creates the stock row on a material's first purchase. The unique
    // material_id makes concurrent first purchases add up instead of colliding.
    sqlx::query(
        "INSERT INTO inventory (material_id, name, quantity, safety_stock) VALUES (?, ?, ?, 0)
         ON DUPLICATE KEY UPDATE
             quantity = quantity + VALUES(quantity),
             updated_at = CURRENT_TIMESTAMP(6)",
    )
    .bind(material.id)
    .bind(&material.name)
    .bind(payload.quantity)
    .execute(&mut *tx)
    .await?;

    let purchase = find_purchase(&mut *tx, id).await?;
    tx.commit().await?;

    info!(id, quantity = %purchase.quantity, "Material purchase recorded");
    Ok((StatusCode::CREATED, Json(purchase)))
}

// DELETE /material-purchases/{id} - Remove a purchase and take it back out of stock
#[instrument(skip(db_pool))]
pub async fn delete_purchase(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<StatusCode, AppError> {
    let mut tx = db_pool.begin().await?;

    let purchase = find_purchase(&mut *tx, id).await?;

    let stock = lock_stock(&mut tx, &[purchase.material_id]).await?;
    if let Some(on_hand) = stock.get(&purchase.material_id) {
        if *on_hand < purchase.quantity {
            return Err(AppError::validation(format!(
                "Insufficient stock to reverse purchase (on hand: {on_hand:.3}, purchased: {:.3})",
                purchase.quantity
            )));
        }
        adjust_stock(&mut tx, purchase.material_id, -purchase.quantity).await?;
    }

    sqlx::query("DELETE FROM material_purchases WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Material purchase deleted");
    Ok(StatusCode::NO_CONTENT)
}
