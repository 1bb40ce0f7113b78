use thiserror::Error;

use crate::database::StoreError;
use crate::filter::FilterError;
use crate::projection::ConfigurationError;

/// Failures that abort a whole CRUD operation
///
/// Per-document validation failures are not here: they are returned as data
/// in the batch result.
#[derive(Debug, Error)]
pub enum CrudError {
    #[error("{0}")]
    Input(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl CrudError {
    pub fn input(message: impl Into<String>) -> Self {
        CrudError::Input(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CrudError::NotFound(message.into())
    }
}
