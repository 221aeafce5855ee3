use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{MySql, MySqlExecutor, Transaction};
use tracing::{info, instrument};

use crate::amounts;
use crate::database::inserted_id;
use crate::dtos::product_type::{
    CompositionItemRequest, CreateProductTypeRequest, ProductTypeDetail, RequirementLine,
    RequirementPreview, RequirementQuery, UpdateProductTypeRequest,
};
use crate::error::AppError;
use crate::handlers::inventory::stock_levels;
use crate::models::composition::ProductComposition;
use crate::models::product_type::ProductType;
use crate::requirements::{check_stock, compute_requirements, CompositionLine};
use crate::state::AppState;

const PRODUCT_TYPE_COLUMNS: &str = "id, name, description, created_at";

pub(crate) async fn find_product_type<'e, E>(executor: E, id: i64) -> Result<ProductType, AppError>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, ProductType>(&format!(
        "SELECT {PRODUCT_TYPE_COLUMNS} FROM product_types WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("Product type not found"))
}

/// Recipe of a product type joined with each material's unit and processing factor.
pub(crate) async fn composition_lines<'e, E>(
    executor: E,
    product_id: i64,
) -> Result<Vec<CompositionLine>, sqlx::Error>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, CompositionLine>(
        "SELECT pc.material_id, m.name AS material_name, m.unit,
                pc.ratio, m.default_ratio, pc.is_required
         FROM product_compositions pc
         JOIN materials m ON m.id = pc.material_id
         WHERE pc.product_id = ?
         ORDER BY pc.ratio DESC, pc.material_id",
    )
    .bind(product_id)
    .fetch_all(executor)
    .await
}

async fn composition_rows<'e, E>(executor: E, product_id: i64) -> Result<Vec<ProductComposition>, sqlx::Error>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, ProductComposition>(
        "SELECT pc.product_id, pc.material_id, m.name AS material_name, pc.ratio, pc.is_required
         FROM product_compositions pc
         JOIN materials m ON m.id = pc.material_id
         WHERE pc.product_id = ?
         ORDER BY pc.ratio DESC, pc.material_id",
    )
    .bind(product_id)
    .fetch_all(executor)
    .await
}

fn validate_composition(items: &[CompositionItemRequest]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for item in items {
        amounts::ratio(item.ratio, "Composition ratio")?;
        if !seen.insert(item.material_id) {
            return Err(AppError::validation(format!(
                "Material {} appears more than once in the composition",
                item.material_id
            )));
        }
    }
    Ok(())
}

async fn write_composition(
    tx: &mut Transaction<'_, MySql>,
    product_id: i64,
    items: &[CompositionItemRequest],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM product_compositions WHERE product_id = ?")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO product_compositions (product_id, material_id, ratio, is_required)
             VALUES (?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(item.material_id)
        .bind(item.ratio)
        .bind(item.is_required)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::from_write(
                e,
                "Duplicate composition entry",
                &format!("Material {} not found", item.material_id),
            )
        })?;
    }
    Ok(())
}

// GET /product-types/ - List all product types
#[instrument(skip(db_pool))]
pub async fn list_product_types(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<ProductType>>, AppError> {
    let product_types = sqlx::query_as::<_, ProductType>(&format!(
        "SELECT {PRODUCT_TYPE_COLUMNS} FROM product_types ORDER BY name"
    ))
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(product_types))
}

// GET /product-types/{id} - Product type with its composition
#[instrument(skip(db_pool))]
pub async fn get_product_type(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<ProductTypeDetail>, AppError> {
    let product_type = find_product_type(&db_pool, id).await?;
    let composition = composition_rows(&db_pool, id).await?;

    Ok(Json(ProductTypeDetail {
        product_type,
        composition,
    }))
}

// POST /product-types/ - Create a product type, optionally with its composition
#[instrument(skip(db_pool, payload), fields(name = %payload.name))]
pub async fn create_product_type(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<CreateProductTypeRequest>,
) -> Result<(StatusCode, Json<ProductTypeDetail>), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Product type name required"));
    }
    validate_composition(&payload.composition)?;

    let mut tx = db_pool.begin().await?;

    let result = sqlx::query("INSERT INTO product_types (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(&payload.description)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "Product type name already exists", "Invalid product type"))?;
    let id = inserted_id(&result);

    write_composition(&mut tx, id, &payload.composition).await?;

    let product_type = find_product_type(&mut *tx, id).await?;
    let composition = composition_rows(&mut *tx, id).await?;
    tx.commit().await?;

    info!(id, "Product type created");
    Ok((
        StatusCode::CREATED,
        Json(ProductTypeDetail {
            product_type,
            composition,
        }),
    ))
}

// PUT /product-types/{id} - Update name/description
#[instrument(skip(db_pool, payload))]
pub async fn update_product_type(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<UpdateProductTypeRequest>,
) -> Result<Json<ProductType>, AppError> {
    if matches!(payload.name.as_deref().map(str::trim), Some("")) {
        return Err(AppError::validation("Product type name cannot be empty"));
    }

    sqlx::query(
        "UPDATE product_types SET
         name = COALESCE(?, name),
         description = COALESCE(?, description)
         WHERE id = ?",
    )
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.description)
    .bind(id)
    .execute(&db_pool)
    .await
    .map_err(|e| AppError::from_write(e, "Product type name already exists", "Invalid product type"))?;

    let product_type = find_product_type(&db_pool, id).await?;
    Ok(Json(product_type))
}

// DELETE /product-types/{id} - Delete a product type and its composition
#[instrument(skip(db_pool))]
pub async fn delete_product_type(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM product_types WHERE id = ?")
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product type not found"));
    }

    info!("Product type deleted");
    Ok(StatusCode::NO_CONTENT)
}

// GET /product-types/{id}/composition
#[instrument(skip(db_pool))]
pub async fn get_composition(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<ProductComposition>>, AppError> {
    find_product_type(&db_pool, id).await?;
    let composition = composition_rows(&db_pool, id).await?;
    Ok(Json(composition))
}

// PUT /product-types/{id}/composition - Replace the whole composition
#[instrument(skip(db_pool, items))]
pub async fn replace_composition(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Json(items): Json<Vec<CompositionItemRequest>>,
) -> Result<Json<Vec<ProductComposition>>, AppError> {
    validate_composition(&items)?;

    let mut tx = db_pool.begin().await?;
    find_product_type(&mut *tx, id).await?;
    write_composition(&mut tx, id, &items).await?;
    let composition = composition_rows(&mut *tx, id).await?;
    tx.commit().await?;

    info!(lines = composition.len(), "Composition replaced");
    Ok(Json(composition))
}

// GET /product-types/{id}/requirements?quantity= - Materials needed and stock on hand
#[instrument(skip(db_pool))]
pub async fn preview_requirements(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
    Query(query): Query<RequirementQuery>,
) -> Result<Json<RequirementPreview>, AppError> {
    find_product_type(&db_pool, id).await?;
    let lines = composition_lines(&db_pool, id).await?;
    let requirements = compute_requirements(query.quantity, &lines)?;

    let material_ids: Vec<i64> = requirements.iter().map(|r| r.material_id).collect();
    let stock = stock_levels(&db_pool, &material_ids).await?;
    let can_fulfil = check_stock(&requirements, &stock).is_ok();

    let materials = requirements
        .into_iter()
        .map(|requirement| RequirementLine {
            available: stock.get(&requirement.material_id).copied(),
            requirement,
        })
        .collect();

    Ok(Json(RequirementPreview {
        product_type_id: id,
        quantity: query.quantity,
        materials,
        can_fulfil,
    }))
}
