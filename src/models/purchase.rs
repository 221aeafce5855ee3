use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow, Serialize)]
pub struct MaterialPurchase {
    pub id: i64,
    pub material_id: i64,
    pub material_name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub purchase_date: NaiveDate,
    pub supplier: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
