use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::inventory::Inventory;
use crate::models::material::Material;

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub name: String,
    pub unit: Option<String>,
    pub default_ratio: Option<Decimal>,
    pub safety_stock: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub default_ratio: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatioRequest {
    pub default_ratio: Decimal,
}

#[derive(Serialize)]
pub struct MaterialDetail {
    #[serde(flatten)]
    pub material: Material,
    pub inventory: Option<Inventory>,
}
