//! SQL generation utilities
//!
//! Assembles MySQL statement text around compiled predicates. All values
//! travel as `?` parameters; only validated identifiers are spliced in.

use crate::errors::FilterError;
use crate::query_builder::filter::Predicate;
use crate::query_builder::ordering::SortOrder;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use serde_json::{Map, Value};

/// MySQL has no OFFSET without LIMIT, so an offset alone uses the largest row count
const UNBOUNDED_LIMIT: u64 = u64::MAX;

/// Direction of an in-place counter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAdjustment {
    Increment,
    Decrement,
}

impl ColumnAdjustment {
    pub fn to_sql(&self) -> &'static str {
        match self {
            ColumnAdjustment::Increment => "+",
            ColumnAdjustment::Decrement => "-",
        }
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build WHERE clause from predicates
    pub fn build_where_clause(predicates: &[Predicate]) -> (String, Vec<Value>) {
        if predicates.is_empty() {
            return ("".to_string(), Vec::new());
        }

        let mut values = Vec::new();
        let conditions_sql = predicates
            .iter()
            .map(|predicate| {
                values.extend(predicate.params().iter().cloned());
                predicate.clause().to_string()
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        (format!("WHERE {}", conditions_sql), values)
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(ValidatedFieldName, SortOrder)]) -> String {
        if order_by.is_empty() {
            return "".to_string();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", field.quoted(), order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, None) => "".to_string(),
            (Some(limit), None) => format!("LIMIT {}", limit),
            (Some(limit), Some(offset)) => format!("LIMIT {} OFFSET {}", limit, offset),
            (None, Some(offset)) => format!("LIMIT {} OFFSET {}", UNBOUNDED_LIMIT, offset),
        }
    }

    /// Build SELECT column list; no fields selects every column
    pub fn build_select_clause(fields: &[ValidatedFieldName]) -> String {
        if fields.is_empty() {
            return "*".to_string();
        }

        fields
            .iter()
            .map(ValidatedFieldName::quoted)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Build `INSERT INTO ... (cols) VALUES (?, ...)` from a column map
    pub fn build_insert(
        table: &ValidatedTableName,
        data: &Map<String, Value>,
    ) -> Result<(String, Vec<Value>), FilterError> {
        if data.is_empty() {
            return Err(FilterError::NoColumns);
        }

        let mut columns = Vec::with_capacity(data.len());
        let mut values = Vec::with_capacity(data.len());
        for (column, value) in data {
            columns.push(ValidatedFieldName::new(column)?.quoted());
            values.push(value.clone());
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted(),
            columns.join(", "),
            placeholders
        );

        Ok((sql, values))
    }

    /// Build `UPDATE ... SET col = ? ... WHERE ...`; SET values precede WHERE values
    pub fn build_update(
        table: &ValidatedTableName,
        data: &Map<String, Value>,
        predicates: &[Predicate],
    ) -> Result<(String, Vec<Value>), FilterError> {
        if data.is_empty() {
            return Err(FilterError::NoColumns);
        }

        let mut assignments = Vec::with_capacity(data.len());
        let mut values = Vec::with_capacity(data.len());
        for (column, value) in data {
            assignments.push(format!("{} = ?", ValidatedFieldName::new(column)?.quoted()));
            values.push(value.clone());
        }

        let (where_clause, where_values) = Self::build_where_clause(predicates);
        values.extend(where_values);

        let sql = Self::join_parts(&[
            format!("UPDATE {} SET {}", table.quoted(), assignments.join(", ")),
            where_clause,
        ]);

        Ok((sql, values))
    }

    /// Build `UPDATE ... SET col = col +/- ? WHERE ...`
    pub fn build_adjust(
        table: &ValidatedTableName,
        column: &ValidatedFieldName,
        adjustment: ColumnAdjustment,
        amount: Value,
        predicates: &[Predicate],
    ) -> (String, Vec<Value>) {
        let column = column.quoted();
        let mut values = vec![amount];

        let (where_clause, where_values) = Self::build_where_clause(predicates);
        values.extend(where_values);

        let sql = Self::join_parts(&[
            format!(
                "UPDATE {} SET {} = {} {} ?",
                table.quoted(),
                column,
                column,
                adjustment.to_sql()
            ),
            where_clause,
        ]);

        (sql, values)
    }

    /// Join non-empty statement parts with single spaces
    pub(crate) fn join_parts(parts: &[String]) -> String {
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
