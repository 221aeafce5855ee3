use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlExecutor, QueryBuilder};
use tracing::{info, instrument, warn};

use crate::amounts;
use crate::database::inserted_id;
use crate::dates::parse_query_date;
use crate::dtos::order::{
    BulkOrderQueryParams, BulkOrdersResponse, CreateOrderRequest, CustomerOrders,
    OrderQueryParams,
};
use crate::error::AppError;
use crate::handlers::inventory::{adjust_stock, lock_stock};
use crate::handlers::product_type::{composition_lines, find_product_type};
use crate::models::order::Order;
use crate::reports::order_cycle;
use crate::requirements::{check_stock, compute_requirements, stock_deltas};
use crate::state::AppState;

const ORDER_COLUMNS: &str = "id, customer_name, product_type_id, product_name, order_date, \
     quantity, unit_price, total_price, created_at";

async fn find_order<'e, E>(executor: E, id: i64) -> Result<Order, AppError>
where
    E: MySqlExecutor<'e>,
{
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

fn order_total(payload: &CreateOrderRequest) -> Result<Decimal, AppError> {
    amounts::positive_quantity(payload.quantity, "Quantity")?;
    amounts::price(payload.unit_price, "Unit price")?;
    match payload.total_price {
        Some(total) => amounts::total(total, "Total price"),
        None => amounts::line_total(payload.quantity, payload.unit_price, "Total price"),
    }
}

fn split_names(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_date_range(
    builder: &mut QueryBuilder<'_, MySql>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) {
    if let Some(start) = start {
        builder.push(" AND order_date >= ").push_bind(start);
    }
    if let Some(end) = end {
        builder.push(" AND order_date <= ").push_bind(end);
    }
}

// GET /orders/?customer_name=&start_date=&end_date= - Orders, newest first
#[instrument(skip(db_pool))]
pub async fn list_orders(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<OrderQueryParams>,
) -> Result<Json<Vec<Order>>, AppError> {
    let start = parse_query_date("start_date", params.start_date.as_deref())?;
    let end = parse_query_date("end_date", params.end_date.as_deref())?;

    let mut builder =
        QueryBuilder::<MySql>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"));
    if let Some(name) = params.customer_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        builder.push(" AND customer_name = ").push_bind(name.to_string());
    }
    push_date_range(&mut builder, start, end);
    builder.push(" ORDER BY order_date DESC, id DESC");

    let orders = builder.build_query_as::<Order>().fetch_all(&db_pool).await?;
    Ok(Json(orders))
}

// GET /orders/bulk/?customer_names=a,b&start_date=&end_date= - Orders grouped per customer
// with the customer's ordering rhythm
#[instrument(skip(db_pool))]
pub async fn bulk_orders(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<BulkOrderQueryParams>,
) -> Result<Json<BulkOrdersResponse>, AppError> {
    let start = parse_query_date("start_date", params.start_date.as_deref())?;
    let end = parse_query_date("end_date", params.end_date.as_deref())?;
    let names = split_names(params.customer_names.as_deref());

    let mut builder =
        QueryBuilder::<MySql>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"));
    if !names.is_empty() {
        builder.push(" AND customer_name IN (");
        let mut separated = builder.separated(", ");
        for name in &names {
            separated.push_bind(name.clone());
        }
        separated.push_unseparated(")");
    }
    push_date_range(&mut builder, start, end);
    builder.push(" ORDER BY customer_name, order_date DESC, id DESC");

    let orders = builder.build_query_as::<Order>().fetch_all(&db_pool).await?;

    let mut grouped: BTreeMap<String, Vec<Order>> = BTreeMap::new();
    for order in orders {
        grouped.entry(order.customer_name.clone()).or_default().push(order);
    }

    let today = Utc::now().date_naive();
    let response = grouped
        .into_iter()
        .map(|(customer, orders)| {
            let cycle = order_cycle(orders.iter().map(|o| (o.order_date, o.quantity)), today);
            (customer, CustomerOrders { orders, cycle })
        })
        .collect();

    Ok(Json(response))
}

// POST /orders/ - Place an order, consuming the product's required materials
#[instrument(skip(db_pool, payload), fields(customer = %payload.customer_name, product_type_id = payload.product_type_id))]
pub async fn create_order(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let total_price = order_total(&payload)?;
    let customer_name = payload.customer_name.trim();
    if customer_name.is_empty() {
        return Err(AppError::validation("Customer name required"));
    }

    let mut tx = db_pool.begin().await?;

    let customer_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM customers WHERE name = ?")
        .bind(customer_name)
        .fetch_optional(&mut *tx)
        .await?;
    if customer_exists.is_none() {
        return Err(AppError::not_found("Customer not found"));
    }

    let product_type = find_product_type(&mut *tx, payload.product_type_id).await?;
    let lines = composition_lines(&mut *tx, product_type.id).await?;
    let requirements = compute_requirements(payload.quantity, &lines)?;
    let deltas = stock_deltas(&requirements);

    let material_ids: Vec<i64> = requirements
        .iter()
        .filter(|r| r.is_required)
        .map(|r| r.material_id)
        .collect();
    let stock = lock_stock(&mut tx, &material_ids).await?;
    check_stock(&requirements, &stock)?;

    for (material_id, quantity) in &deltas {
        adjust_stock(&mut tx, *material_id, -*quantity).await?;
    }

    let result = sqlx::query(
        "INSERT INTO orders
             (customer_name, product_type_id, product_name, order_date, quantity, unit_price, total_price)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(customer_name)
    .bind(product_type.id)
    .bind(&product_type.name)
    .bind(payload.order_date)
    .bind(payload.quantity)
    .bind(payload.unit_price)
    .bind(total_price)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "Duplicate order", "Customer or product type not found"))?;

    let order = find_order(&mut *tx, inserted_id(&result)).await?;
    tx.commit().await?;

    info!(id = order.id, materials = deltas.len(), "Order created");
    Ok((StatusCode::CREATED, Json(order)))
}

// DELETE /orders/{id} - Cancel an order and return its materials to stock
#[instrument(skip(db_pool))]
pub async fn delete_order(
    Path(id): Path<i64>,
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<StatusCode, AppError> {
    let mut tx = db_pool.begin().await?;

    let order = find_order(&mut *tx, id).await?;

    // Restocking follows the product's current recipe.
    if let Some(product_type_id) = order.product_type_id {
        let lines = composition_lines(&mut *tx, product_type_id).await?;
        let deltas = stock_deltas(&compute_requirements(order.quantity, &lines)?);

        let material_ids: Vec<i64> = deltas.iter().map(|(id, _)| *id).collect();
        let stock = lock_stock(&mut tx, &material_ids).await?;
        for (material_id, quantity) in &deltas {
            if stock.contains_key(material_id) {
                adjust_stock(&mut tx, *material_id, *quantity).await?;
            } else {
                warn!(material_id, "No inventory row to restock");
            }
        }
    }

    sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
