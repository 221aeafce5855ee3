use std::collections::{BTreeSet, HashMap};

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::{debug, instrument};

use crate::dates::parse_query_date;
use crate::dtos::analytics::{Period, PeriodQuery, ProfitBreakdownResponse, ProfitSummaryResponse};
use crate::error::AppError;
use crate::handlers::product_type::composition_lines;
use crate::reports::{
    by_customer, by_product, cost_orders, monthly, months_spanned, net_profit,
    overheads as overhead_costs, summarize, CostedOrder, CustomerProfit, MonthlyProfit,
    OrderFact, PriceHistory, PricePoint, ProductProfit,
};
use crate::state::AppState;

const DEFAULT_PERIOD_DAYS: i64 = 365;

fn resolve_period(query: &PeriodQuery, today: NaiveDate) -> Result<Period, AppError> {
    let end_date = parse_query_date("end_date", query.end_date.as_deref())?.unwrap_or(today);
    let start_date = parse_query_date("start_date", query.start_date.as_deref())?
        .unwrap_or(end_date - Duration::days(DEFAULT_PERIOD_DAYS));

    if start_date > end_date {
        return Err(AppError::validation("start_date must not be after end_date"));
    }
    Ok(Period {
        start_date,
        end_date,
    })
}

/// Orders in the period, each costed from its product's recipe and the
/// purchase prices in effect on the order date.
async fn costed_orders(db_pool: &MySqlPool, period: &Period) -> Result<Vec<CostedOrder>, AppError> {
    let orders = sqlx::query_as::<_, OrderFact>(
        "SELECT id, customer_name, product_type_id, product_name, order_date, quantity, total_price
         FROM orders
         WHERE order_date BETWEEN ? AND ?
         ORDER BY order_date, id",
    )
    .bind(period.start_date)
    .bind(period.end_date)
    .fetch_all(db_pool)
    .await?;

    let product_ids: BTreeSet<i64> = orders.iter().filter_map(|o| o.product_type_id).collect();
    let mut recipes = HashMap::with_capacity(product_ids.len());
    for product_id in product_ids {
        recipes.insert(product_id, composition_lines(db_pool, product_id).await?);
    }

    let points = sqlx::query_as::<_, PricePoint>(
        "SELECT material_id, purchase_date, price
         FROM material_purchases
         WHERE purchase_date <= ?
         ORDER BY purchase_date, id",
    )
    .bind(period.end_date)
    .fetch_all(db_pool)
    .await?;

    debug!(
        orders = orders.len(),
        recipes = recipes.len(),
        prices = points.len(),
        "Costing orders"
    );
    Ok(cost_orders(orders, &recipes, &PriceHistory::new(points)))
}

// GET /api/analytics/profit/summary - Sales, material cost and profit for the period,
// then net of packaging, shipping boxes and rent
#[instrument(skip(db_pool, rates))]
pub async fn profit_summary(
    State(AppState {
        db_pool,
        overheads: rates,
        ..
    }): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ProfitSummaryResponse>, AppError> {
    let period = resolve_period(&query, Utc::now().date_naive())?;
    let orders = costed_orders(&db_pool, &period).await?;

    let summary = summarize(&orders);
    let months = months_spanned(period.start_date, period.end_date);
    let overheads = overhead_costs(&summary, months, &rates);
    let net = net_profit(&summary, &overheads);

    Ok(Json(ProfitSummaryResponse {
        period,
        summary,
        overheads,
        net,
    }))
}

// GET /api/analytics/profit/by-product
#[instrument(skip(db_pool))]
pub async fn profit_by_product(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ProfitBreakdownResponse<ProductProfit>>, AppError> {
    let period = resolve_period(&query, Utc::now().date_naive())?;
    let orders = costed_orders(&db_pool, &period).await?;

    Ok(Json(ProfitBreakdownResponse {
        rows: by_product(&orders),
        period,
    }))
}

// GET /api/analytics/profit/by-customer
#[instrument(skip(db_pool))]
pub async fn profit_by_customer(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ProfitBreakdownResponse<CustomerProfit>>, AppError> {
    let period = resolve_period(&query, Utc::now().date_naive())?;
    let orders = costed_orders(&db_pool, &period).await?;

    Ok(Json(ProfitBreakdownResponse {
        rows: by_customer(&orders),
        period,
    }))
}

// GET /api/analytics/profit/monthly
#[instrument(skip(db_pool))]
pub async fn profit_monthly(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ProfitBreakdownResponse<MonthlyProfit>>, AppError> {
    let period = resolve_period(&query, Utc::now().date_naive())?;
    let orders = costed_orders(&db_pool, &period).await?;

    Ok(Json(ProfitBreakdownResponse {
        rows: monthly(&orders),
        period,
    }))
}
