use thiserror::Error;

/// Rejected list query input; surfaces as 400
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid kind name: {0}")]
    InvalidKind(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),
}
