//! Filter conditions over document fields
//!
//! Field names may be dotted paths (`address.city`) reaching into nested
//! objects. A missing field behaves like `null`.

use serde_json::Value;

/// Query condition operators
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

/// Single condition on a document field
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    pub value: Option<Value>, // None for IS NULL/IS NOT NULL
}

impl QueryCondition {
    /// Field path split on dots
    pub fn path(&self) -> Vec<&str> {
        self.field.split('.').collect()
    }
}

/// Logical operators for combining conditions
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Query filter that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
}

impl QueryFilter {
    /// Create a simple condition
    pub fn condition(field: &str, operator: QueryOperator, value: Option<Value>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            value,
        })
    }

    /// Create AND group
    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    /// Create OR group
    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Eq, Some(value.into()))
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Ne, Some(value.into()))
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gt, Some(value.into()))
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Gte, Some(value.into()))
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lt, Some(value.into()))
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::condition(field, QueryOperator::Lte, Some(value.into()))
    }

    pub fn in_values(field: &str, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::In, Some(Value::Array(values)))
    }

    pub fn not_in_values(field: &str, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::NotIn, Some(Value::Array(values)))
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, None)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, None)
    }
}
