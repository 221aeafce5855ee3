use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlExecutor, QueryBuilder, Transaction};
use tracing::{info, instrument, warn};

use crate::amounts::stock_quantity;
use crate::database::inserted_id;
use crate::dtos::inventory::{
    CreateInventoryRequest, InventoryResponse, SetQuantityRequest, SyncResponse,
    UpdateInventoryRequest,
};
use crate::error::AppError;
use crate::models::inventory::Inventory;
use crate::state::AppState;

const INVENTORY_COLUMNS: &str =
    "id, material_id, name, quantity, safety_stock, created_at, updated_at";

pub(crate) async fn find_inventory<'e, E>(executor: E, id: i64) -> Result<Inventory, AppError>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, Inventory>(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("Inventory not found"))
}

pub(crate) async fn inventory_for_material<'e, E>(
    executor: E,
    material_id: i64,
) -> Result<Option<Inventory>, sqlx::Error>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, Inventory>(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE material_id = ?"
    ))
    .bind(material_id)
    .fetch_optional(executor)
    .await
}

fn stock_query(material_ids: &[i64], for_update: bool) -> QueryBuilder<'static, MySql> {
    let mut builder =
        QueryBuilder::new("SELECT material_id, quantity FROM inventory WHERE material_id IN (");
    let mut separated = builder.separated(", ");
    for id in material_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    if for_update {
        builder.push(" FOR UPDATE");
    }
    builder
}

/// Quantity on hand per material. Materials without an inventory row are absent.
pub(crate) async fn stock_levels<'e, E>(
    executor: E,
    material_ids: &[i64],
) -> Result<HashMap<i64, Decimal>, sqlx::Error>
where
    E: MySqlExecutor<'e>,
{
    if material_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, Decimal)> = stock_query(material_ids, false)
        .build_query_as()
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Like [`stock_levels`], holding row locks until the transaction ends.
pub(crate) async fn lock_stock(
    tx: &mut Transaction<'_, MySql>,
    material_ids: &[i64],
) -> Result<HashMap<i64, Decimal>, sqlx::Error> {
    if material_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i64, Decimal)> = stock_query(material_ids, true)
        .build_query_as()
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Adds `delta` (possibly negative) to a material's stock. Callers check the
/// resulting quantity against locked stock first.
pub(crate) async fn adjust_stock(
    tx: &mut Transaction<'_, MySql>,
    material_id: i64,
    delta: Decimal,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE inventory
         SET quantity = quantity + ?, updated_at = CURRENT_TIMESTAMP(6)
         WHERE material_id = ?",
    )
    .bind(delta)
    .bind(material_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Inventory not found for material {material_id}"
        )));
    }
    Ok(())
}

/// Overwrites quantity and/or safety stock. `updated_at` is always refreshed,
/// even when the values do not change.
pub(crate) async fn write_inventory<'e, E>(
    executor: E,
    id: i64,
    quantity: Option<Decimal>,
    safety_stock: Option<Decimal>,
) -> Result<bool, sqlx::Error>
where
    E: MySqlExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE inventory SET
         quantity = COALESCE(?, quantity),
         safety_stock = COALESCE(?, safety_stock),
         updated_at = CURRENT_TIMESTAMP(6)
         WHERE id = ?",
    )
    .bind(quantity)
    .bind(safety_stock)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

// GET /inventory/ - All stock rows
#[instrument(skip(db_pool))]
pub async fn list_inventory(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<InventoryResponse>>, AppError> {
    let rows = sqlx::query_as::<_, Inventory>(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory ORDER BY name"
    ))
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(rows.into_iter().map(InventoryResponse::from).collect()))
}

// GET /inventory/alerts/ - Rows below their safety stock
#[instrument(skip(db_pool))]
pub async fn low_stock_alerts(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<InventoryResponse>>, AppError> {
    let rows = sqlx::query_as::<_, Inventory>(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory
         WHERE quantity < safety_stock
         ORDER BY (safety_stock - quantity) DESC"
    ))
    .fetch_all(&db_pool)
    .await?;

    if !rows.is_empty() {
        warn!(count = rows.len(), "Inventory below safety stock");
    }
    Ok(Json(rows.into_iter().map(InventoryResponse::from).collect()))
}

// POST /inventory/ - Create a stock row
#[instrument(skip(db_pool, payload), fields(name = %payload.name))]
pub async fn create_inventory(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<CreateInventoryRequest>,
) -> Result<(StatusCode, Json<InventoryResponse>), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Inventory name required"));
    }
    let quantity = stock_quantity(payload.quantity, "Quantity")?;
    let safety_stock = stock_quantity(payload.safety_stock, "Safety stock")?;

    let result = sqlx::query(
        "INSERT INTO inventory (material_id, name, quantity, safety_stock) VALUES (?, ?, ?, ?)",
    )
    .bind(payload.material_id)
    .bind(name)
    .bind(quantity)
    .bind(safety_stock)
    .execute(&db_pool)
    .await
    .map_err(|e| {
        AppError::from_write(e, "Material already has an inventory row", "Material not found")
    })?;

    let inventory = find_inventory(&db_pool, inserted_id(&result)).await?;
    info!(id = inventory.id, "Inventory created");
    Ok((StatusCode::CREATED, Json(inventory.into())))
}

// PUT /inventories/{id}/quantity/ - Set the quantity on hand
#[instrument(skip(db_pool, payload))]
pub async fn set_inventory_quantity(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<SetQuantityRequest>,
) -> Result<Json<InventoryResponse>, AppError> {
    let quantity = stock_quantity(payload.quantity, "Quantity")?;

    if !write_inventory(&db_pool, id, Some(quantity), None).await? {
        return Err(AppError::not_found("Inventory not found"));
    }

    let inventory = find_inventory(&db_pool, id).await?;
    info!(quantity = %inventory.quantity, "Inventory quantity set");
    Ok(Json(inventory.into()))
}

// PUT /inventories/{id}/ - Update quantity and/or safety stock
#[instrument(skip(db_pool, payload))]
pub async fn update_inventory(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<UpdateInventoryRequest>,
) -> Result<Json<InventoryResponse>, AppError> {
    let quantity = payload
        .quantity
        .map(|q| stock_quantity(q, "Quantity"))
        .transpose()?;
    let safety_stock = payload
        .safety_stock
        .map(|s| stock_quantity(s, "Safety stock"))
        .transpose()?;

    if !write_inventory(&db_pool, id, quantity, safety_stock).await? {
        return Err(AppError::not_found("Inventory not found"));
    }

    Ok(Json(find_inventory(&db_pool, id).await?.into()))
}

// POST /inventory/sync/ - Create empty stock rows for materials that have none
#[instrument(skip(db_pool))]
pub async fn sync_inventory(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<SyncResponse>, AppError> {
    let result = sqlx::query(
        "INSERT INTO inventory (material_id, name, quantity, safety_stock)
         SELECT m.id, m.name, 0, 0
         FROM materials m
         LEFT JOIN inventory i ON i.material_id = m.id
         WHERE i.id IS NULL",
    )
    .execute(&db_pool)
    .await?;

    let created = result.rows_affected();
    info!(created, "Inventory synchronised with materials");
    Ok(Json(SyncResponse { created }))
}
