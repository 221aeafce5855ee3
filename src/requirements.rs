//! Material requirements for producing a quantity of a product type.
//!
//! Each composition line contributes `quantity × ratio × default_ratio` of
//! its material, where `default_ratio` is the material's processing factor
//! (e.g. 1.23 for green beans lost in roasting).

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::amounts;
use crate::error::AppError;

/// One row of a product type's recipe joined with its material.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompositionLine {
    pub material_id: i64,
    pub material_name: String,
    pub unit: String,
    pub ratio: Decimal,
    pub default_ratio: Decimal,
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRequirement {
    pub material_id: i64,
    pub material_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shortage {
    pub material_name: String,
    pub needed: Decimal,
    pub available: Option<Decimal>,
}

impl From<Shortage> for AppError {
    fn from(s: Shortage) -> Self {
        match s.available {
            Some(available) => AppError::validation(format!(
                "Insufficient stock for {} (needed: {:.3}, available: {:.3})",
                s.material_name, s.needed, available
            )),
            None => AppError::not_found(format!("No inventory record for {}", s.material_name)),
        }
    }
}

pub fn compute_requirements(
    quantity: Decimal,
    lines: &[CompositionLine],
) -> Result<Vec<MaterialRequirement>, AppError> {
    amounts::positive_quantity(quantity, "Quantity")?;

    lines
        .iter()
        .map(|line| {
            if line.ratio < Decimal::ZERO || line.default_ratio < Decimal::ZERO {
                return Err(AppError::validation(format!(
                    "Composition for {} has a negative ratio",
                    line.material_name
                )));
            }
            let what = format!("Requirement for {}", line.material_name);
            let needed = amounts::checked_product(quantity, line.ratio, &what)?;
            let needed = amounts::checked_product(needed, line.default_ratio, &what)?;
            Ok(MaterialRequirement {
                material_id: line.material_id,
                material_name: line.material_name.clone(),
                unit: line.unit.clone(),
                quantity: needed.round_dp(3),
                is_required: line.is_required,
            })
        })
        .collect()
}

/// Returns the first required material whose stock cannot cover the requirement.
///
/// Optional materials are never checked.
pub fn check_stock(
    requirements: &[MaterialRequirement],
    stock: &HashMap<i64, Decimal>,
) -> Result<(), Shortage> {
    for req in requirements.iter().filter(|r| r.is_required) {
        match stock.get(&req.material_id) {
            None => {
                return Err(Shortage {
                    material_name: req.material_name.clone(),
                    needed: req.quantity,
                    available: None,
                })
            }
            Some(available) if *available < req.quantity => {
                return Err(Shortage {
                    material_name: req.material_name.clone(),
                    needed: req.quantity,
                    available: Some(*available),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// The stock movements an order causes: required materials only.
pub fn stock_deltas(requirements: &[MaterialRequirement]) -> Vec<(i64, Decimal)> {
    requirements
        .iter()
        .filter(|r| r.is_required && r.quantity > Decimal::ZERO)
        .map(|r| (r.material_id, r.quantity))
        .collect()
}
