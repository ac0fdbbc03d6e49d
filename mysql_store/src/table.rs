//! CRUD facade over one table
//!
//! Reads go to the read pool and writes to the write pool. Conditions are
//! filter maps (`"field[:op]" -> value`); values are always bound as
//! statement parameters.

use std::sync::Arc;

use query_filter::validation::validate_fields;
use query_filter::{ColumnAdjustment, QueryBuilder, SortOrder, ValidatedFieldName, ValidatedTableName};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlQueryResult, MySqlRow};

use crate::broker::ConnectionBroker;
use crate::connector::MysqlConnector;
use crate::errors::StoreError;
use crate::role::Role;

/// A JSON value reduced to the MySQL parameter type it is bound as
#[derive(Debug, Clone, PartialEq)]
enum SqlParam {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
    Null,
}

impl From<Value> for SqlParam {
    // Strings stay text; MySQL converts them for DATETIME columns itself
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => SqlParam::Text(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlParam::Signed(i)
                } else if let Some(u) = n.as_u64() {
                    SqlParam::Unsigned(u)
                } else if let Some(f) = n.as_f64() {
                    SqlParam::Float(f)
                } else {
                    SqlParam::Text(n.to_string())
                }
            }
            Value::Bool(b) => SqlParam::Bool(b),
            Value::Null => SqlParam::Null,
            other => SqlParam::Text(other.to_string()),
        }
    }
}

// Binds a JSON value with the closest MySQL type
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match SqlParam::from($param) {
            SqlParam::Text(s) => $query.bind(s),
            SqlParam::Signed(i) => $query.bind(i),
            SqlParam::Unsigned(u) => $query.bind(u),
            SqlParam::Float(f) => $query.bind(f),
            SqlParam::Bool(b) => $query.bind(b),
            SqlParam::Null => $query.bind(Option::<String>::None),
        }
    };
}

/// Broker type used by the CRUD layer
pub type MysqlBroker = ConnectionBroker<MysqlConnector>;

/// Options for [`TableStore::find`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Columns to select; empty selects all
    pub fields: Vec<String>,
    pub order: Vec<(String, SortOrder)>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    /// Also count every row matching the filter, ignoring paging
    pub count: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((field.into(), order));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }
}

/// Rows returned by [`TableStore::find`]
#[derive(Debug, Clone)]
pub struct FindResult<T> {
    pub rows: Vec<T>,
    /// Total matching rows, present when counting was requested
    pub total: Option<i64>,
}

/// Operations on one (prefixed) table
#[derive(Clone)]
pub struct TableStore {
    broker: Arc<MysqlBroker>,
    table: ValidatedTableName,
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore").field("table", &self.table).finish()
    }
}

impl TableStore {
    /// `prefix` is prepended to `name`; names are never pluralized
    pub fn new(broker: Arc<MysqlBroker>, prefix: &str, name: &str) -> Result<Self, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::EmptyTableName);
        }

        Ok(Self {
            broker,
            table: ValidatedTableName::with_prefix(prefix, name)?,
        })
    }

    pub fn table(&self) -> &ValidatedTableName {
        &self.table
    }

    fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.table.clone())
    }

    /// Insert one row; returns the generated auto-increment id
    pub async fn insert(&self, data: &Map<String, Value>) -> Result<u64, StoreError> {
        let (sql, values) = self.query().build_insert(data)?;
        let result = self.execute("insert", &sql, values).await?;
        Ok(result.last_insert_id())
    }

    /// Insert a serializable record; its fields become the columns
    pub async fn insert_record<R: Serialize>(&self, record: &R) -> Result<u64, StoreError> {
        match serde_json::to_value(record) {
            Ok(Value::Object(data)) => self.insert(&data).await,
            Ok(other) => Err(StoreError::Serialization(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Err(err) => Err(StoreError::Serialization(err.to_string())),
        }
    }

    /// Update matching rows; returns the number of rows changed
    pub async fn update(
        &self,
        filter: &Map<String, Value>,
        data: &Map<String, Value>,
    ) -> Result<u64, StoreError> {
        let (sql, values) = self.query().filters_strict(filter)?.build_update(data)?;
        let result = self.execute("update", &sql, values).await?;
        Ok(result.rows_affected())
    }

    /// `column = column + amount` on matching rows
    pub async fn increment(
        &self,
        filter: &Map<String, Value>,
        column: &str,
        amount: i64,
    ) -> Result<u64, StoreError> {
        self.adjust("increment", filter, column, ColumnAdjustment::Increment, amount)
            .await
    }

    /// `column = column - amount` on matching rows
    pub async fn decrement(
        &self,
        filter: &Map<String, Value>,
        column: &str,
        amount: i64,
    ) -> Result<u64, StoreError> {
        self.adjust("decrement", filter, column, ColumnAdjustment::Decrement, amount)
            .await
    }

    async fn adjust(
        &self,
        operation: &'static str,
        filter: &Map<String, Value>,
        column: &str,
        adjustment: ColumnAdjustment,
        amount: i64,
    ) -> Result<u64, StoreError> {
        let column = ValidatedFieldName::new(column)?;
        let (sql, values) = self
            .query()
            .filters_strict(filter)?
            .build_adjust(&column, adjustment, Value::from(amount));
        let result = self.execute(operation, &sql, values).await?;
        Ok(result.rows_affected())
    }

    /// First matching row, or [`StoreError::NotFound`]
    pub async fn find_one<T>(&self, filter: &Map<String, Value>, fields: &[&str]) -> Result<T, StoreError>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let (sql, values) = self
            .query()
            .select(validate_fields(fields)?)
            .filters(filter)
            .build_select_one();
        self.fetch_one("find_one", &sql, values).await
    }

    /// Matching rows with optional projection, ordering, paging and total count
    pub async fn find<T>(
        &self,
        filter: &Map<String, Value>,
        options: &FindOptions,
    ) -> Result<FindResult<T>, StoreError>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let mut query = self
            .query()
            .select(validate_fields(options.fields.as_slice())?)
            .filters(filter)
            .with_count(options.count);
        for (field, order) in &options.order {
            query = query.order_by(ValidatedFieldName::new(field)?, *order);
        }
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = options.offset {
            query = query.offset(offset);
        }

        let (sql, values) = query.build_select();
        let rows = self.fetch_all("find", &sql, values).await?;

        let total = if query.wants_count() {
            let (sql, values) = query.build_count();
            Some(self.fetch_count(&sql, values).await?)
        } else {
            None
        };

        Ok(FindResult { rows, total })
    }

    /// First row matching a hand-written WHERE condition with `?` placeholders
    pub async fn find_one_by_sql<T>(&self, condition: &str, params: Vec<Value>) -> Result<T, StoreError>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let (sql, values) = self.raw_query(condition, params).build_select_one();
        self.fetch_one("find_one_by_sql", &sql, values).await
    }

    /// Rows matching a hand-written WHERE condition with `?` placeholders
    pub async fn find_by_sql<T>(&self, condition: &str, params: Vec<Value>) -> Result<Vec<T>, StoreError>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let (sql, values) = self.raw_query(condition, params).build_select();
        self.fetch_all("find_by_sql", &sql, values).await
    }

    fn raw_query(&self, condition: &str, params: Vec<Value>) -> QueryBuilder {
        let condition = condition.trim();
        if condition.is_empty() {
            self.query()
        } else {
            self.query().where_raw(condition, params)
        }
    }

    async fn execute(
        &self,
        operation: &'static str,
        sql: &str,
        values: Vec<Value>,
    ) -> Result<MySqlQueryResult, StoreError> {
        tracing::debug!(table = %self.table, operation, sql, "executing statement");
        let mut conn = self.broker.checkout(Role::Write).await?;

        let mut query = sqlx::query::<sqlx::MySql>(sql);
        for value in values {
            query = bind_json_param!(query, value);
        }

        let result = query.execute(conn.connection()).await;
        conn.observe(result).map_err(|err| self.fail(operation, err))
    }

    async fn fetch_all<T>(&self, operation: &'static str, sql: &str, values: Vec<Value>) -> Result<Vec<T>, StoreError>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        tracing::debug!(table = %self.table, operation, sql, "executing query");
        let mut conn = self.broker.checkout(Role::Read).await?;

        let mut query = sqlx::query_as::<sqlx::MySql, T>(sql);
        for value in values {
            query = bind_json_param!(query, value);
        }

        let result = query.fetch_all(conn.connection()).await;
        conn.observe(result).map_err(|err| self.fail(operation, err))
    }

    async fn fetch_one<T>(&self, operation: &'static str, sql: &str, values: Vec<Value>) -> Result<T, StoreError>
    where
        T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
    {
        tracing::debug!(table = %self.table, operation, sql, "executing query");
        let mut conn = self.broker.checkout(Role::Read).await?;

        let mut query = sqlx::query_as::<sqlx::MySql, T>(sql);
        for value in values {
            query = bind_json_param!(query, value);
        }

        // RowNotFound maps to StoreError::NotFound
        let result = query.fetch_one(conn.connection()).await;
        conn.observe(result).map_err(|err| self.fail(operation, err))
    }

    async fn fetch_count(&self, sql: &str, values: Vec<Value>) -> Result<i64, StoreError> {
        let mut conn = self.broker.checkout(Role::Read).await?;

        let mut query = sqlx::query_scalar::<sqlx::MySql, i64>(sql);
        for value in values {
            query = bind_json_param!(query, value);
        }

        let result = query.fetch_one(conn.connection()).await;
        conn.observe(result).map_err(|err| self.fail("count", err))
    }

    fn fail(&self, operation: &'static str, err: sqlx::Error) -> StoreError {
        let err = StoreError::query(self.table.as_str(), operation, err);
        if !err.is_not_found() {
            tracing::error!(table = %self.table, operation, error = %err, "database operation failed");
        }
        err
    }
}
