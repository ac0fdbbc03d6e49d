//! Convenience re-exports for common query-filter usage

pub use crate::errors::FilterError;
pub use crate::query_builder::{
    compile, compile_strict, ColumnAdjustment, FilterOperator, FilterTerm, Predicate,
    QueryBuilder, SortOrder,
};
pub use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

pub use serde_json::{json, Map, Value};
