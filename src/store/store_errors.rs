use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    OpenFailed(String),

    #[error("Store query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
