use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
}
