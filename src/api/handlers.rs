// Product accessors module
// Each accessor performs one storage operation and wraps the result in an envelope

use serde_json::Value;

use super::error::ApiError;
use super::response::{build_response, message_response, NOT_FOUND, OK};
use super::types::{
    DeleteBody, DeleteRequest, ProductsBody, SaveBody, UpdateBody, UpdateRequest, SUCCESS,
};
use crate::event::Envelope;
use crate::store::{record_key, ProductStore, Record, KEY_ATTRIBUTE};

/// Read one product by key
pub fn get_product(store: &dyn ProductStore, product_id: &str) -> Result<Envelope, ApiError> {
    match store.get(product_id)? {
        Some(record) => Ok(build_response(OK, Some(&record))),
        None => Ok(message_response(NOT_FOUND, "Product not found")),
    }
}

/// Read every product, following continuation keys until the scan is exhausted
pub fn get_products(store: &dyn ProductStore, page_size: usize) -> Result<Envelope, ApiError> {
    let mut page = store.scan(None, page_size)?;
    let mut products = std::mem::take(&mut page.items);

    while let Some(start_key) = page.last_evaluated_key.take() {
        page = store.scan(Some(&start_key), page_size)?;
        products.append(&mut page.items);
    }

    Ok(build_response(OK, Some(&ProductsBody { products })))
}

/// Create or overwrite a product with the request body
pub fn save_product(store: &dyn ProductStore, body: &str) -> Result<Envelope, ApiError> {
    let record: Record = parse_body(body)?;
    if record_key(&record).is_none() {
        return Err(ApiError::bad_request(
            "Request body must contain a string productId",
        ));
    }

    store.put(&record)?;
    let body = SaveBody {
        operation: "SAVE",
        message: SUCCESS,
        item: &record,
    };
    Ok(build_response(OK, Some(&body)))
}

/// Set a single attribute on a product
pub fn modify_product(store: &dyn ProductStore, body: &str) -> Result<Envelope, ApiError> {
    let request: UpdateRequest = parse_body(body)?;
    let product_id = key_string(&request.product_id)?;
    if request.update_key == KEY_ATTRIBUTE {
        return Err(ApiError::bad_request("productId cannot be updated"));
    }

    let updated_attributes =
        store.update_attribute(product_id, &request.update_key, request.update_value)?;
    let body = UpdateBody {
        operation: "UPDATE",
        message: SUCCESS,
        updated_attributes,
    };
    Ok(build_response(OK, Some(&body)))
}

/// Remove a product, returning what was stored
pub fn delete_product(store: &dyn ProductStore, body: &str) -> Result<Envelope, ApiError> {
    let request: DeleteRequest = parse_body(body)?;
    let product_id = key_string(&request.product_id)?;

    let deleted_item = store.delete(product_id)?;
    let body = DeleteBody {
        operation: "DELETE",
        message: SUCCESS,
        deleted_item,
    };
    Ok(build_response(OK, Some(&body)))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))
}

fn key_string(value: &Value) -> Result<&str, ApiError> {
    value
        .as_str()
        .ok_or_else(|| ApiError::bad_request("productId must be a string"))
}
