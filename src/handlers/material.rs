// src/handlers/material.rs
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
use crate::dtos::material::{
    CreateMaterialRequest, MaterialDetail, UpdateMaterialRequest, UpdateRatioRequest,
};
use crate::error::AppError;
use crate::handlers::inventory::inventory_for_material;
use crate::models::material::Material;
use crate::state::AppState;

const MATERIAL_COLUMNS: &str = "id, name, unit, default_ratio, created_at";
const DEFAULT_UNIT: &str = "kg";

pub(crate) async fn find_material<'e, E>(executor: E, id: i64) -> Result<Material, AppError>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("Material not found"))
}

fn validate_ratio(ratio: Decimal) -> Result<Decimal, AppError> {
    if ratio <= Decimal::ZERO {
        return Err(AppError::validation("Default ratio must be greater than 0"));
    }
    amounts::ratio(ratio, "Default ratio")
}

fn validate_unit(unit: &str) -> Result<&str, AppError> {
    let unit = unit.trim();
    if unit.is_empty() || unit.len() > 10 {
        return Err(AppError::validation("Unit must be 1 to 10 characters"));
    }
    Ok(unit)
}

// GET /materials/ - List all materials
#[instrument(skip(db_pool))]
pub async fn list_materials(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<Material>>, AppError> {
    let materials = sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY name"
    ))
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(materials))
}

// GET /materials/{id} - Material with its stock row
#[instrument(skip(db_pool))]
pub async fn get_material(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<MaterialDetail>, AppError> {
    let material = find_material(&db_pool, id).await?;
    let inventory = inventory_for_material(&db_pool, id).await?;

    Ok(Json(MaterialDetail {
        material,
        inventory,
    }))
}

// POST /materials/ - Create a material together with its (empty) stock row
#[instrument(skip(db_pool, payload), fields(name = %payload.name))]
pub async fn create_material(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<MaterialDetail>), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Material name required"));
    }
    let unit = validate_unit(payload.unit.as_deref().unwrap_or(DEFAULT_UNIT))?;
    let default_ratio = validate_ratio(payload.default_ratio.unwrap_or(Decimal::ONE))?;
    let safety_stock =
        amounts::stock_quantity(payload.safety_stock.unwrap_or(Decimal::ZERO), "Safety stock")?;

    let mut tx = db_pool.begin().await?;

    let result = sqlx::query("INSERT INTO materials (name, unit, default_ratio) VALUES (?, ?, ?)")
        .bind(name)
        .bind(unit)
        .bind(default_ratio)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "Material name already exists", "Invalid material"))?;
    let id = inserted_id(&result);

    sqlx::query(
        "INSERT INTO inventory (material_id, name, quantity, safety_stock) VALUES (?, ?, 0, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(safety_stock)
    .execute(&mut *tx)
    .await?;

    let material = find_material(&mut *tx, id).await?;
    let inventory = inventory_for_material(&mut *tx, id).await?;
    tx.commit().await?;

    info!(id, "Material created");
    Ok((
        StatusCode::CREATED,
        Json(MaterialDetail {
            material,
            inventory,
        }),
    ))
}

// PUT /materials/{id}/ - Update name, unit or default ratio
#[instrument(skip(db_pool, payload))]
pub async fn update_material(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<UpdateMaterialRequest>,
) -> Result<Json<Material>, AppError> {
    let name = payload.name.as_deref().map(str::trim);
    if matches!(name, Some("")) {
        return Err(AppError::validation("Material name cannot be empty"));
    }
    let unit = payload.unit.as_deref().map(validate_unit).transpose()?;
    let default_ratio = payload.default_ratio.map(validate_ratio).transpose()?;

    let mut tx = db_pool.begin().await?;
    find_material(&mut *tx, id).await?;

    sqlx::query(
        "UPDATE materials SET
         name = COALESCE(?, name),
         unit = COALESCE(?, unit),
         default_ratio = COALESCE(?, default_ratio)
         WHERE id = ?",
    )
    .bind(name)
    .bind(unit)
    .bind(default_ratio)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "Material name already exists", "Invalid material"))?;

    // Keep the linked stock row's label in step with the material.
    if let Some(name) = name {
        sqlx::query(
            "UPDATE inventory SET name = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE material_id = ?",
        )
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    let material = find_material(&mut *tx, id).await?;
    tx.commit().await?;

    Ok(Json(material))
}

// PUT /materials/{id}/ratio/ - Update only the default ratio
#[instrument(skip(db_pool, payload))]
pub async fn update_material_ratio(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<UpdateRatioRequest>,
) -> Result<Json<Material>, AppError> {
    let ratio = validate_ratio(payload.default_ratio)?;

    let result = sqlx::query("UPDATE materials SET default_ratio = ? WHERE id = ?")
        .bind(ratio)
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Material not found"));
    }

    let material = find_material(&db_pool, id).await?;
    info!(ratio = %material.default_ratio, "Material ratio updated");
    Ok(Json(material))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ratio_must_be_positive() {
        assert!(validate_ratio(dec!(0)).is_err());
        assert!(validate_ratio(dec!(-1.2)).is_err());
        assert_eq!(validate_ratio(dec!(1.23)).unwrap(), dec!(1.23));
        assert!(validate_ratio(dec!(1000000)).is_err());
    }

    #[test]
    fn unit_is_trimmed_and_bounded() {
        assert_eq!(validate_unit(" g ").unwrap(), "g");
        assert!(validate_unit("").is_err());
        assert!(validate_unit("kilograms!!").is_err());
    }
}
