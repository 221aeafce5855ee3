pub mod analytics;
pub mod auth;
pub mod customer;
pub mod inventory;
pub mod material;
pub mod order;
pub mod product_type;
pub mod purchase;
