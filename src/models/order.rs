use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub product_type_id: Option<i64>,
    /// Name at the time the order was placed.
    pub product_name: Option<String>,
    pub order_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}
