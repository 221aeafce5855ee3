use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub material_id: i64,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Defaults to `quantity × price`.
    pub total: Option<Decimal>,
    #[serde(deserialize_with = "crate::dates::lenient")]
    pub purchase_date: NaiveDate,
    pub supplier: Option<String>,
    pub note: Option<String>,
}
