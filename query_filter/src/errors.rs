use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unknown filter operator '{tag}' in key '{key}'")]
    UnknownOperator { key: String, tag: String },

    #[error("Malformed filter key '{0}': expected 'field' or 'field:operator'")]
    MalformedKey(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Statement has no columns to write")]
    NoColumns,
}
