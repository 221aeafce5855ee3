use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::composition::ProductComposition;
use crate::models::product_type::ProductType;
use crate::requirements::MaterialRequirement;

#[derive(Debug, Deserialize)]
pub struct CreateProductTypeRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub composition: Vec<CompositionItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompositionItemRequest {
    pub material_id: i64,
    pub ratio: Decimal,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Serialize)]
pub struct ProductTypeDetail {
    #[serde(flatten)]
    pub product_type: ProductType,
    pub composition: Vec<ProductComposition>,
}

#[derive(Debug, Deserialize)]
pub struct RequirementQuery {
    pub quantity: Decimal,
}

#[derive(Serialize)]
pub struct RequirementPreview {
    pub product_type_id: i64,
    pub quantity: Decimal,
    pub materials: Vec<RequirementLine>,
    /// True when every required material is in stock.
    pub can_fulfil: bool,
}

#[derive(Serialize)]
pub struct RequirementLine {
    #[serde(flatten)]
    pub requirement: MaterialRequirement,
    pub available: Option<Decimal>,
}
