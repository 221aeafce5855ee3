use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow, Serialize)]
pub struct ProductComposition {
    pub product_id: i64,
    pub material_id: i64,
    pub material_name: String,
    pub ratio: Decimal,
    pub is_required: bool,
}
