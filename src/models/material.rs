use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow, Serialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub unit: String,
    /// Processing factor applied to every requirement for this material.
    pub default_ratio: Decimal,
    pub created_at: DateTime<Utc>,
}
