//! Query translation for the PostgreSQL session
//!
//! Documents live in a `doc JSONB` column next to a `id TEXT` primary key.
//! Field paths and values are always bound as parameters; only validated
//! relation names and numeric limits are formatted into the statement.

use crate::query::builder::{Query, Selection};
use crate::query::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query::ordering::SortOrder;
use serde_json::Value;

/// A bind parameter for a generated statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Path(Vec<String>),
    Json(Value),
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build the `SELECT doc ...` statement for a query over `relation`
    pub fn select_sql(query: &Query, relation: &str) -> (String, Vec<SqlParam>) {
        let mut params = Vec::new();
        let mut clauses = Vec::new();

        if let Selection::Get(id) = &query.selection {
            params.push(SqlParam::Text(id.clone()));
            clauses.push(format!("id = ${}", params.len()));
        }

        for filter in &query.conditions {
            clauses.push(Self::build_filter_sql(filter, &mut params));
        }

        let mut sql = format!("SELECT doc FROM {}", relation);

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let order_clause = Self::build_order_clause(&query.order_by, &mut params);
        if !order_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&order_clause);
        }

        let limit_clause = Self::build_limit_clause(query.limit, query.offset);
        if !limit_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&limit_clause);
        }

        (sql, params)
    }

    fn build_filter_sql(filter: &QueryFilter, params: &mut Vec<SqlParam>) -> String {
        match filter {
            QueryFilter::Condition(condition) => Self::build_condition_sql(condition, params),
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    // Empty AND is vacuously true, empty OR matches nothing
                    return match operator {
                        LogicalOperator::And => "TRUE".to_string(),
                        LogicalOperator::Or => "FALSE".to_string(),
                    };
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group = filters
                    .iter()
                    .map(|f| Self::build_filter_sql(f, params))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group)
            }
        }
    }

    fn push(params: &mut Vec<SqlParam>, param: SqlParam) -> String {
        params.push(param);
        format!("${}", params.len())
    }

    fn build_condition_sql(condition: &QueryCondition, params: &mut Vec<SqlParam>) -> String {
        let path = Self::push(
            params,
            SqlParam::Path(condition.path().into_iter().map(str::to_string).collect()),
        );
        let field = format!("(doc #> {}::text[])", path);
        let is_null = format!("({field} IS NULL OR {field} = 'null'::jsonb)");

        match (&condition.operator, &condition.value) {
            (QueryOperator::IsNull, _) | (QueryOperator::Eq, None) => is_null,
            (QueryOperator::IsNotNull, _) | (QueryOperator::Ne, None) => format!("NOT {}", is_null),
            (QueryOperator::Eq, Some(Value::Null)) => is_null,
            (QueryOperator::Ne, Some(Value::Null)) => format!("NOT {}", is_null),
            (QueryOperator::Eq, Some(value)) => {
                let value = Self::push(params, SqlParam::Json(value.clone()));
                format!("{field} = {value}::jsonb")
            }
            (QueryOperator::Ne, Some(value)) => {
                let value = Self::push(params, SqlParam::Json(value.clone()));
                format!("{field} IS DISTINCT FROM {value}::jsonb")
            }
            (QueryOperator::In, Some(Value::Array(values))) => {
                let values = Self::push(params, SqlParam::Json(Value::Array(values.clone())));
                format!("{values}::jsonb @> jsonb_build_array(COALESCE({field}, 'null'::jsonb))")
            }
            (QueryOperator::NotIn, Some(Value::Array(values))) => {
                let values = Self::push(params, SqlParam::Json(Value::Array(values.clone())));
                format!(
                    "NOT ({values}::jsonb @> jsonb_build_array(COALESCE({field}, 'null'::jsonb)))"
                )
            }
            (QueryOperator::Gt, Some(value)) => Self::range_sql(&field, ">", value, params),
            (QueryOperator::Gte, Some(value)) => Self::range_sql(&field, ">=", value, params),
            (QueryOperator::Lt, Some(value)) => Self::range_sql(&field, "<", value, params),
            (QueryOperator::Lte, Some(value)) => Self::range_sql(&field, "<=", value, params),
            _ => "FALSE".to_string(),
        }
    }

    fn range_sql(field: &str, op: &str, value: &Value, params: &mut Vec<SqlParam>) -> String {
        let value = Self::push(params, SqlParam::Json(value.clone()));
        format!("(jsonb_typeof({field}) = jsonb_typeof({value}::jsonb) AND {field} {op} {value}::jsonb)")
    }

    fn build_order_clause(order_by: &[(String, SortOrder)], params: &mut Vec<SqlParam>) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let parts = order_by
            .iter()
            .map(|(field, order)| {
                let path = Self::push(
                    params,
                    SqlParam::Path(field.split('.').map(str::to_string).collect()),
                );
                // A missing field sorts as JSON null, like the in-memory evaluator
                format!(
                    "COALESCE(doc #> {}::text[], 'null'::jsonb) {}",
                    path,
                    order.to_sql()
                )
            })
            .collect::<Vec<_>>();

        format!("ORDER BY {}", parts.join(", "))
    }

    fn build_limit_clause(limit: Option<usize>, offset: Option<usize>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }
}
