use crate::query::filter::QueryFilter;
use crate::query::ordering::SortOrder;

/// Which documents of the table a query starts from
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Every document in the table
    Table,
    /// The document with the given primary key
    Get(String),
}

/// A query against a single table
///
/// ```
/// use record_object::query::{Query, QueryFilter, SortOrder};
///
/// let query = Query::table("nodes")
///     .in_db("rem_test")
///     .filter(QueryFilter::eq("name", "root"))
///     .order_by("created_at", SortOrder::Desc)
///     .limit(10);
///
/// assert_eq!(query.table_name(), "nodes");
/// assert_eq!(query.db(), Some("rem_test"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) db: Option<String>,
    pub(crate) table: String,
    pub(crate) selection: Selection,
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
}

impl Query {
    /// Start a query over every document in `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            db: None,
            table: table.into(),
            selection: Selection::Table,
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Run against the given database instead of the session default
    pub fn in_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Narrow to the document with the given primary key
    pub fn get(mut self, id: impl Into<String>) -> Self {
        self.selection = Selection::Get(id.into());
        self
    }

    /// Add a filter condition (conditions are combined with AND)
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn db(&self) -> Option<&str> {
        self.db.as_deref()
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }
}
