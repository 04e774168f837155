use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("record has no string productId")]
    MissingKey,
}
