//! Query builder utilities
//!
//! Filter terms, the map compiler, and SQL assembly for MySQL statements.

pub mod builder;
pub mod filter;
pub mod ordering;
pub mod sql_generation;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use filter::{compile, compile_strict, FilterOperator, FilterTerm, Predicate};
pub use ordering::SortOrder;
pub use sql_generation::{ColumnAdjustment, SqlGenerator};
