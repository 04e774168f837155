// API module entry
// Product inventory request dispatcher

mod error;
mod handlers;
mod response;
mod types;

use std::sync::Arc;

use crate::event::{Envelope, InboundEvent};
use crate::logger;
use crate::store::ProductStore;

use error::ApiError;
pub use response::*;

const HEALTH_PATH: &str = "/health";
const PRODUCT_PATH: &str = "/product";
const PRODUCTS_PATH: &str = "/products";

/// Routes inbound events to the product accessors.
///
/// Holds the storage handle opened by the process entry point; no other state.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn ProductStore>,
    page_size: usize,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ProductStore>, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Handle one event to completion. Always yields an envelope.
    pub fn dispatch(&self, event: &InboundEvent) -> Envelope {
        logger::log_event(event);

        let method = event.http_method.as_str();
        let path = event.path.as_str();
        let store = self.store.as_ref();

        let result = match (method, path) {
            ("GET", HEALTH_PATH) => Ok(empty_response(OK)),
            ("GET", PRODUCT_PATH) => match event.query_param("productId") {
                Some(product_id) => handlers::get_product(store, product_id),
                None => Err(ApiError::bad_request("Missing query parameter productId")),
            },
            ("GET", PRODUCTS_PATH) => handlers::get_products(store, self.page_size),
            ("POST", PRODUCT_PATH) => {
                require_body(event).and_then(|body| handlers::save_product(store, body))
            }
            ("PATCH", PRODUCT_PATH) => {
                require_body(event).and_then(|body| handlers::modify_product(store, body))
            }
            ("DELETE", PRODUCT_PATH) => {
                require_body(event).and_then(|body| handlers::delete_product(store, body))
            }
            // Unknown route
            _ => Ok(not_found()),
        };

        let envelope = match result {
            Ok(envelope) => envelope,
            Err(ApiError::BadRequest(message)) => {
                logger::log_warning(&format!("Rejected {method} {path}: {message}"));
                bad_request(&message)
            }
            Err(ApiError::Store(e)) => {
                logger::log_api_error(&format!("{method} {path} failed: {e}"));
                internal_error()
            }
        };

        logger::log_api_request(method, path, envelope.status_code);
        envelope
    }
}

fn require_body(event: &InboundEvent) -> Result<&str, ApiError> {
    event
        .body
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing request body"))
}
