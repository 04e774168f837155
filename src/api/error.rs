use thiserror::Error;

use crate::store::StoreError;

/// Failure of a single accessor call
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be decoded into the accessor's inputs
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}
