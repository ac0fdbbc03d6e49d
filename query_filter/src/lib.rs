//! Query Filter - the filter language and query context for SplitHaus
//!
//! Callers describe conditions as a flat mapping of `"field[:operator]"` to
//! a JSON value. This crate parses those entries into typed filter terms,
//! compiles them into parameterized MySQL predicates and assembles complete
//! statements around them.
//!
//! ```rust
//! use query_filter::compile;
//! use serde_json::json;
//!
//! let filters = json!({ "age:ge": 18, "name:lk": "ann" });
//! let predicates = compile(filters.as_object().unwrap());
//!
//! assert_eq!(predicates.len(), 2);
//! ```

pub mod errors;
pub mod prelude;
pub mod query_builder;
pub mod validation;

pub use errors::FilterError;
pub use query_builder::{
    compile, compile_strict, ColumnAdjustment, FilterOperator, FilterTerm, Predicate,
    QueryBuilder, SortOrder, SqlGenerator,
};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};
