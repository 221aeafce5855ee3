use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::inventory::Inventory;

#[derive(Debug, Deserialize)]
pub struct CreateInventoryRequest {
    pub name: String,
    pub material_id: Option<i64>,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub safety_stock: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryRequest {
    pub quantity: Option<Decimal>,
    pub safety_stock: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: Decimal,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    #[serde(flatten)]
    pub inventory: Inventory,
    pub below_safety_stock: bool,
}

impl From<Inventory> for InventoryResponse {
    fn from(inventory: Inventory) -> Self {
        Self {
            below_safety_stock: inventory.below_safety_stock(),
            inventory,
        }
    }
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub created: u64,
}
