//! Cart store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("failed to access cart storage")]
    Io(#[from] std::io::Error),

    #[error("failed to encode cart state")]
    Encode(#[source] serde_json::Error),
}
