//! In-process evaluation of queries over JSON documents
//!
//! Values order like PostgreSQL's `jsonb`: null < string < number < boolean <
//! array < object. Range comparisons (`gt`, `lt`, ...) only match values of
//! the same JSON type.

use crate::query::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query::ordering::SortOrder;
use crate::session::Document;
use serde_json::Value;
use std::cmp::Ordering;

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                match compare_values(left, right) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            match x.len().cmp(&y.len()) {
                Ordering::Equal => {}
                other => return other,
            }
            let mut left: Vec<_> = x.iter().collect();
            let mut right: Vec<_> = y.iter().collect();
            left.sort_by(|a, b| a.0.cmp(b.0));
            right.sort_by(|a, b| a.0.cmp(b.0));
            for ((lk, lv), (rk, rv)) in left.into_iter().zip(right) {
                match lk.cmp(rk).then_with(|| compare_values(lv, rv)) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

/// Look up a dotted field path in a document
pub fn lookup<'a>(document: &'a Document, field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Whether a document satisfies a filter
pub fn matches(filter: &QueryFilter, document: &Document) -> bool {
    match filter {
        QueryFilter::Condition(condition) => matches_condition(condition, document),
        QueryFilter::Group { operator, filters } => match operator {
            LogicalOperator::And => filters.iter().all(|f| matches(f, document)),
            LogicalOperator::Or => filters.iter().any(|f| matches(f, document)),
        },
    }
}

/// Whether a document satisfies every filter
pub fn matches_all(filters: &[QueryFilter], document: &Document) -> bool {
    filters.iter().all(|f| matches(f, document))
}

fn matches_condition(condition: &QueryCondition, document: &Document) -> bool {
    let field = lookup(document, &condition.field).unwrap_or(&Value::Null);

    match (&condition.operator, &condition.value) {
        (QueryOperator::IsNull, _) | (QueryOperator::Eq, None) => field.is_null(),
        (QueryOperator::IsNotNull, _) | (QueryOperator::Ne, None) => !field.is_null(),
        (QueryOperator::Eq, Some(value)) => values_equal(field, value),
        (QueryOperator::Ne, Some(value)) => !values_equal(field, value),
        (QueryOperator::In, Some(Value::Array(values))) => {
            values.iter().any(|v| values_equal(field, v))
        }
        (QueryOperator::NotIn, Some(Value::Array(values))) => {
            !values.iter().any(|v| values_equal(field, v))
        }
        (QueryOperator::Gt, Some(value)) => same_type_cmp(field, value, Ordering::is_gt),
        (QueryOperator::Gte, Some(value)) => same_type_cmp(field, value, Ordering::is_ge),
        (QueryOperator::Lt, Some(value)) => same_type_cmp(field, value, Ordering::is_lt),
        (QueryOperator::Lte, Some(value)) => same_type_cmp(field, value, Ordering::is_le),
        _ => false,
    }
}

fn same_type_cmp(field: &Value, value: &Value, accept: fn(Ordering) -> bool) -> bool {
    if field.is_null() || type_rank(field) != type_rank(value) {
        return false;
    }
    accept(compare_values(field, value))
}

/// Order two documents by a list of (field, direction) keys
pub fn compare_documents(a: &Document, b: &Document, order_by: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in order_by {
        let left = lookup(a, field).unwrap_or(&Value::Null);
        let right = lookup(b, field).unwrap_or(&Value::Null);
        let ordering = match order {
            SortOrder::Asc => compare_values(left, right),
            SortOrder::Desc => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
