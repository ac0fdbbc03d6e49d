//! Query context for one table operation
//!
//! Holds the table, selected fields, predicates, ordering and paging of a
//! single CRUD call and renders the statements that call needs.

use crate::errors::FilterError;
use crate::query_builder::filter::{compile, compile_strict, FilterTerm, Predicate};
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::sql_generation::{ColumnAdjustment, SqlGenerator};
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use serde_json::{Map, Value};

/// Query builder for constructing MySQL statements against one table
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) table: ValidatedTableName,
    pub(crate) fields: Vec<ValidatedFieldName>,
    pub(crate) conditions: Vec<Predicate>,
    pub(crate) order_by: Vec<(ValidatedFieldName, SortOrder)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) count: bool,
}

impl QueryBuilder {
    pub fn new(table: ValidatedTableName) -> Self {
        Self {
            table,
            fields: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            count: false,
        }
    }

    pub fn table(&self) -> &ValidatedTableName {
        &self.table
    }

    /// Restrict the selected columns
    pub fn select(mut self, fields: Vec<ValidatedFieldName>) -> Self {
        self.fields = fields;
        self
    }

    /// Add a typed filter term; a LIKE term with a non-string value adds nothing
    pub fn filter(mut self, term: FilterTerm) -> Self {
        self.conditions.extend(term.to_predicate());
        self
    }

    /// Add every entry of a filter map, dropping entries that do not compile
    pub fn filters(mut self, filters: &Map<String, Value>) -> Self {
        self.conditions.extend(compile(filters));
        self
    }

    /// Add every entry of a filter map, failing on the first bad entry
    pub fn filters_strict(mut self, filters: &Map<String, Value>) -> Result<Self, FilterError> {
        self.conditions.extend(compile_strict(filters)?);
        Ok(self)
    }

    /// Add a caller-written condition with `?` placeholders
    pub fn where_raw(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.conditions.push(Predicate::raw(sql, params));
        self
    }

    /// Add ordering
    pub fn order_by(mut self, field: ValidatedFieldName, order: SortOrder) -> Self {
        self.order_by.push((field, order));
        self
    }

    /// Add limit
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add offset
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Also compute the total number of rows matching the conditions
    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn wants_count(&self) -> bool {
        self.count
    }

    pub fn conditions(&self) -> &[Predicate] {
        &self.conditions
    }

    /// Build WHERE clause
    pub fn build_where_clause(&self) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause(&self.conditions)
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(&self) -> String {
        SqlGenerator::build_order_clause(&self.order_by)
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(&self) -> String {
        SqlGenerator::build_limit_clause(self.limit, self.offset)
    }

    /// Build complete query parts (WHERE, ORDER BY, LIMIT, Values)
    pub fn build(&self) -> (String, String, String, Vec<Value>) {
        let (where_clause, values) = self.build_where_clause();
        let order_clause = self.build_order_clause();
        let limit_clause = self.build_limit_clause();

        (where_clause, order_clause, limit_clause, values)
    }

    /// Full SELECT statement with ordering and paging
    pub fn build_select(&self) -> (String, Vec<Value>) {
        let (where_clause, order_clause, limit_clause, values) = self.build();
        let sql = SqlGenerator::join_parts(&[
            format!(
                "SELECT {} FROM {}",
                SqlGenerator::build_select_clause(&self.fields),
                self.table.quoted()
            ),
            where_clause,
            order_clause,
            limit_clause,
        ]);

        (sql, values)
    }

    /// SELECT of at most one row; any limit or offset already set is ignored
    pub fn build_select_one(&self) -> (String, Vec<Value>) {
        let (where_clause, values) = self.build_where_clause();
        let sql = SqlGenerator::join_parts(&[
            format!(
                "SELECT {} FROM {}",
                SqlGenerator::build_select_clause(&self.fields),
                self.table.quoted()
            ),
            where_clause,
            self.build_order_clause(),
            "LIMIT 1".to_string(),
        ]);

        (sql, values)
    }

    /// COUNT over the same conditions, ignoring ordering and paging
    pub fn build_count(&self) -> (String, Vec<Value>) {
        let (where_clause, values) = self.build_where_clause();
        let sql = SqlGenerator::join_parts(&[
            format!("SELECT COUNT(*) AS total FROM {}", self.table.quoted()),
            where_clause,
        ]);

        (sql, values)
    }

    /// UPDATE of the given columns for every matching row
    pub fn build_update(&self, data: &Map<String, Value>) -> Result<(String, Vec<Value>), FilterError> {
        SqlGenerator::build_update(&self.table, data, &self.conditions)
    }

    /// In-place `column = column +/- amount` for every matching row
    pub fn build_adjust(
        &self,
        column: &ValidatedFieldName,
        adjustment: ColumnAdjustment,
        amount: Value,
    ) -> (String, Vec<Value>) {
        SqlGenerator::build_adjust(&self.table, column, adjustment, amount, &self.conditions)
    }

    /// INSERT of one row into this table
    pub fn build_insert(&self, data: &Map<String, Value>) -> Result<(String, Vec<Value>), FilterError> {
        SqlGenerator::build_insert(&self.table, data)
    }
}
