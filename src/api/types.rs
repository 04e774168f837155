// API type definitions module
// Request bodies and response bodies of the product endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Record;

// ============== Request bodies ==============

/// PATCH /product body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub product_id: Value,
    pub update_key: String,
    /// Any JSON value, including null
    pub update_value: Value,
}

/// DELETE /product body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub product_id: Value,
}

// ============== Response bodies ==============

/// `{"Message": ...}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

/// GET /products body
#[derive(Debug, Serialize)]
pub struct ProductsBody {
    pub products: Vec<Record>,
}

/// POST /product body
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveBody<'a> {
    pub operation: &'static str,
    pub message: &'static str,
    pub item: &'a Record,
}

/// PATCH /product body
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateBody {
    pub operation: &'static str,
    pub message: &'static str,
    pub updated_attributes: Record,
}

/// DELETE /product body
#[derive(Debug, Serialize)]
pub struct DeleteBody {
    #[serde(rename = "Operation")]
    pub operation: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
    #[serde(rename = "deletedItem")]
    pub deleted_item: Option<Record>,
}

pub const SUCCESS: &str = "SUCCESS";
