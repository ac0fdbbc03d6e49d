//! Filter terms and the filter-map compiler
//!
//! A filter map entry is `"field[:operator]" -> value`. The operator tag is
//! one of `eq ne ge gt le lt lk in ni fi`; without a tag the entry means
//! equality. Every entry becomes one [`Predicate`] and all predicates of a
//! map are AND-combined. Map iteration order is not guaranteed, so the
//! order of the compiled predicates is not either.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::FilterError;
use crate::validation::ValidatedFieldName;

/// Separator between the field name and the operator tag in a filter key
pub const OPERATOR_SEPARATOR: char = ':';

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    Eq,        // =
    Ne,        // <>
    Ge,        // >=
    Gt,        // >
    Le,        // <=
    Lt,        // <
    Like,      // LIKE '%value%'
    In,        // IN (...)
    NotIn,     // NOT IN (...)
    FindInSet, // FIND_IN_SET(value, field)
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 10] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Ge,
        FilterOperator::Gt,
        FilterOperator::Le,
        FilterOperator::Lt,
        FilterOperator::Like,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::FindInSet,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "eq" => Some(FilterOperator::Eq),
            "ne" => Some(FilterOperator::Ne),
            "ge" => Some(FilterOperator::Ge),
            "gt" => Some(FilterOperator::Gt),
            "le" => Some(FilterOperator::Le),
            "lt" => Some(FilterOperator::Lt),
            "lk" => Some(FilterOperator::Like),
            "in" => Some(FilterOperator::In),
            "ni" => Some(FilterOperator::NotIn),
            "fi" => Some(FilterOperator::FindInSet),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Ge => "ge",
            FilterOperator::Gt => "gt",
            FilterOperator::Le => "le",
            FilterOperator::Lt => "lt",
            FilterOperator::Like => "lk",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "ni",
            FilterOperator::FindInSet => "fi",
        }
    }

    fn comparison(&self) -> Option<&'static str> {
        match self {
            FilterOperator::Eq => Some("="),
            FilterOperator::Ne => Some("<>"),
            FilterOperator::Ge => Some(">="),
            FilterOperator::Gt => Some(">"),
            FilterOperator::Le => Some("<="),
            FilterOperator::Lt => Some("<"),
            _ => None,
        }
    }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::from_tag(tag).ok_or_else(|| FilterError::UnknownOperator {
            key: tag.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One parameterized SQL condition
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clause: String,
    params: Vec<Value>,
}

impl Predicate {
    /// Wrap a caller-written condition; `?` placeholders bind `params` in order
    pub fn raw(clause: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            params,
        }
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.clause, self.params)
    }

    /// Render the predicate with its parameters inlined as SQL literals.
    ///
    /// For logs and diagnostics only; statements are always executed with
    /// bound parameters. Assumes every `?` in the clause is a placeholder.
    pub fn to_inline_sql(&self) -> String {
        let mut params = self.params.iter();
        let mut rendered = String::with_capacity(self.clause.len() + 8 * self.params.len());
        for c in self.clause.chars() {
            match (c, params.as_slice().is_empty()) {
                ('?', false) => {
                    if let Some(value) = params.next() {
                        rendered.push_str(&sql_literal(value));
                    }
                }
                _ => rendered.push(c),
            }
        }
        rendered
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause)
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_text(s),
        other => quote_text(&other.to_string()),
    }
}

fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "''"))
}

/// A parsed `(field, operator, value)` filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    field: ValidatedFieldName,
    operator: FilterOperator,
    value: Value,
}

impl FilterTerm {
    pub fn new(field: &str, operator: FilterOperator, value: Value) -> Result<Self, FilterError> {
        Ok(Self {
            field: ValidatedFieldName::new(field)?,
            operator,
            value,
        })
    }

    /// Parse one filter map entry; a key with more than one separator is malformed
    pub fn parse(key: &str, value: Value) -> Result<Self, FilterError> {
        let (field, tag, extra) = split_key(key);
        if extra {
            return Err(FilterError::MalformedKey(key.to_string()));
        }
        Self::from_parts(key, field, tag, value)
    }

    /// Like [`FilterTerm::parse`], but a key with more than one separator
    /// means equality on the part before the first separator
    pub fn parse_lenient(key: &str, value: Value) -> Result<Self, FilterError> {
        match split_key(key) {
            (field, _, true) => Self::new(field, FilterOperator::Eq, value),
            (field, tag, false) => Self::from_parts(key, field, tag, value),
        }
    }

    fn from_parts(key: &str, field: &str, tag: Option<&str>, value: Value) -> Result<Self, FilterError> {
        let operator = match tag {
            None => FilterOperator::Eq,
            Some(tag) => {
                FilterOperator::from_tag(tag).ok_or_else(|| FilterError::UnknownOperator {
                    key: key.to_string(),
                    tag: tag.to_string(),
                })?
            }
        };

        Self::new(field, operator, value)
    }

    /// Equal condition
    pub fn eq(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Not equal condition
    pub fn ne(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Ne, value)
    }

    /// Greater than or equal condition
    pub fn ge(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Ge, value)
    }

    /// Greater than condition
    pub fn gt(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Gt, value)
    }

    /// Less than or equal condition
    pub fn le(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Le, value)
    }

    /// Less than condition
    pub fn lt(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Lt, value)
    }

    /// Substring match
    pub fn like(field: &str, needle: &str) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::Like, Value::String(needle.to_string()))
    }

    pub fn in_values(field: &str, values: Vec<Value>) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    pub fn not_in_values(field: &str, values: Vec<Value>) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::NotIn, Value::Array(values))
    }

    /// `value` is one element of the comma-separated list stored in `field`
    pub fn find_in_set(field: &str, value: Value) -> Result<Self, FilterError> {
        Self::new(field, FilterOperator::FindInSet, value)
    }

    pub fn field(&self) -> &ValidatedFieldName {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Compile into a predicate.
    ///
    /// Returns `None` for a LIKE term whose value is not a string.
    pub fn to_predicate(&self) -> Option<Predicate> {
        let field = self.field.quoted();

        if let Some(op) = self.operator.comparison() {
            let predicate = match (&self.operator, &self.value) {
                (FilterOperator::Eq, Value::Null) => Predicate::raw(format!("{} IS NULL", field), vec![]),
                (FilterOperator::Ne, Value::Null) => {
                    Predicate::raw(format!("{} IS NOT NULL", field), vec![])
                }
                (_, value) => Predicate::raw(format!("{} {} ?", field, op), vec![value.clone()]),
            };
            return Some(predicate);
        }

        match self.operator {
            FilterOperator::Like => match &self.value {
                Value::String(needle) => Some(Predicate::raw(
                    format!("{} LIKE ?", field),
                    vec![Value::String(format!("%{}%", needle))],
                )),
                _ => None,
            },
            FilterOperator::In => Some(membership(&field, "IN", "1=0", &self.value)),
            FilterOperator::NotIn => Some(membership(&field, "NOT IN", "1=1", &self.value)),
            FilterOperator::FindInSet => Some(Predicate::raw(
                format!("FIND_IN_SET(?, {})", field),
                vec![self.value.clone()],
            )),
            _ => None,
        }
    }
}

/// `(field, tag, has_extra_parts)`
fn split_key(key: &str) -> (&str, Option<&str>, bool) {
    let mut parts = key.split(OPERATOR_SEPARATOR);
    let field = parts.next().unwrap_or_default();
    let tag = parts.next();
    (field, tag, parts.next().is_some())
}

fn membership(field: &str, keyword: &str, when_empty: &str, value: &Value) -> Predicate {
    let values = match value {
        Value::Array(values) => values.clone(),
        scalar => vec![scalar.clone()],
    };

    if values.is_empty() {
        return Predicate::raw(when_empty, vec![]);
    }

    let placeholders = vec!["?"; values.len()].join(", ");
    Predicate::raw(format!("{} {} ({})", field, keyword, placeholders), values)
}

/// Compile a filter map, dropping entries that cannot be compiled.
///
/// A key with more than one separator (`"status:eq:x"`) compiles to
/// equality on its first part. Unknown operator tags and invalid field names
/// are logged at `warn` and skipped, as is a LIKE entry with a non-string
/// value. The returned predicates are AND-combined; their order is
/// unspecified.
pub fn compile<'a, I>(filters: I) -> Vec<Predicate>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    filters
        .into_iter()
        .filter_map(|(key, value)| match FilterTerm::parse_lenient(key, value.clone()) {
            Ok(term) => term.to_predicate(),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "dropping filter entry");
                None
            }
        })
        .collect()
}

/// Compile a filter map, failing on the first entry that cannot be parsed.
///
/// Unlike [`compile`], a key with more than one separator is rejected.
/// A LIKE entry with a non-string value is still skipped silently.
pub fn compile_strict<'a, I>(filters: I) -> Result<Vec<Predicate>, FilterError>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut predicates = Vec::new();
    for (key, value) in filters {
        if let Some(predicate) = FilterTerm::parse(key, value.clone())?.to_predicate() {
            predicates.push(predicate);
        }
    }
    Ok(predicates)
}
