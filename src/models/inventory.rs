use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow, Serialize)]
pub struct Inventory {
    pub id: i64,
    pub material_id: Option<i64>,
    pub name: String,
    pub quantity: Decimal,
    pub safety_stock: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    pub fn below_safety_stock(&self) -> bool {
        self.quantity < self.safety_stock
    }
}
