use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::order::Order;
use crate::reports::OrderCycle;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub product_type_id: i64,
    pub quantity: Decimal,
    #[serde(deserialize_with = "crate::dates::lenient")]
    pub order_date: NaiveDate,
    pub unit_price: Decimal,
    /// Defaults to `quantity × unit_price`.
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct OrderQueryParams {
    pub customer_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkOrderQueryParams {
    /// Comma-separated customer names.
    pub customer_names: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct CustomerOrders {
    pub orders: Vec<Order>,
    #[serde(flatten)]
    pub cycle: OrderCycle,
}

pub type BulkOrdersResponse = BTreeMap<String, CustomerOrders>;
