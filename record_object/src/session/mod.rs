//! Store sessions
//!
//! A `Session` is the store client the `Mapper` wraps. It owns all I/O:
//! namespace and table management, document writes, and query execution.
//! Namespaces ("databases") group tables; `None` selects the session's
//! default namespace.

pub mod errors;
pub mod memory;
pub mod postgres;
pub mod results;

pub use errors::SessionError;
pub use memory::MemorySession;
pub use postgres::PgSession;
pub use results::{QueryResult, WriteResult};

use crate::query::Query;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored document
pub type Document = Map<String, Value>;

/// Document key holding the primary key of every table
pub const PRIMARY_KEY: &str = "id";

/// Store client contract
#[async_trait]
pub trait Session: Send + Sync {
    /// Namespace used when an operation names none
    fn default_db(&self) -> &str;

    async fn db_create(&self, name: &str) -> Result<(), SessionError>;

    async fn db_drop(&self, name: &str) -> Result<(), SessionError>;

    /// Namespace names, sorted
    async fn db_list(&self) -> Result<Vec<String>, SessionError>;

    async fn table_create(&self, db: Option<&str>, table: &str) -> Result<(), SessionError>;

    async fn table_drop(&self, db: Option<&str>, table: &str) -> Result<(), SessionError>;

    /// Table names in a namespace, sorted
    async fn table_list(&self, db: Option<&str>) -> Result<Vec<String>, SessionError>;

    /// Create a secondary index over the document field of the same name
    async fn index_create(
        &self,
        db: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<(), SessionError>;

    async fn index_drop(&self, db: Option<&str>, table: &str, name: &str)
        -> Result<(), SessionError>;

    /// Index names of a table, sorted
    async fn index_list(&self, db: Option<&str>, table: &str) -> Result<Vec<String>, SessionError>;

    /// Insert a document. A document without a primary key gets a generated
    /// one, reported in `WriteResult::generated_keys`. A duplicate key is a
    /// write error, not a session error.
    async fn insert(
        &self,
        db: Option<&str>,
        table: &str,
        document: Document,
    ) -> Result<WriteResult, SessionError>;

    /// Merge `changes` into the document with primary key `id`
    async fn update(
        &self,
        db: Option<&str>,
        table: &str,
        id: &str,
        changes: Document,
    ) -> Result<WriteResult, SessionError>;

    /// Delete the document with primary key `id`
    async fn delete(&self, db: Option<&str>, table: &str, id: &str)
        -> Result<WriteResult, SessionError>;

    /// Execute a query and return the matching documents
    async fn run(&self, query: &Query) -> Result<QueryResult, SessionError>;
}

/// Resolve the primary key of a document about to be inserted, generating
/// one when absent. Returns the key and whether it was generated.
pub(crate) fn prepare_insert(document: &mut Document) -> Result<(String, bool), SessionError> {
    match document.get(PRIMARY_KEY) {
        None | Some(Value::Null) => {
            let id = uuid::Uuid::new_v4().to_string();
            document.insert(PRIMARY_KEY.to_string(), Value::String(id.clone()));
            Ok((id, true))
        }
        Some(Value::String(id)) if !id.is_empty() => Ok((id.clone(), false)),
        Some(other) => Err(SessionError::InvalidDocument(format!(
            "primary key `{}` must be a non-empty string, got {}",
            PRIMARY_KEY, other
        ))),
    }
}

/// Shallow-merge `changes` into `current`, rejecting a primary key change.
/// Returns the merged document, or the write error message.
pub(crate) fn merge_changes(
    current: &Document,
    id: &str,
    changes: Document,
) -> Result<Document, String> {
    if let Some(new_id) = changes.get(PRIMARY_KEY) {
        if new_id.as_str() != Some(id) {
            return Err(format!(
                "Primary key `{}` cannot be changed (`{}` -> `{}`)",
                PRIMARY_KEY, id, new_id
            ));
        }
    }

    let mut merged = current.clone();
    for (key, value) in changes {
        merged.insert(key, value);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_prepare_insert_generates_key() {
        let mut document = doc(json!({"name": "a"}));
        let (id, generated) = prepare_insert(&mut document).unwrap();
        assert!(generated);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(document.get(PRIMARY_KEY), Some(&json!(id)));
    }

    #[test]
    fn test_prepare_insert_keeps_given_key() {
        let mut document = doc(json!({"id": "fixed", "name": "a"}));
        assert_eq!(prepare_insert(&mut document).unwrap(), ("fixed".to_string(), false));
    }

    #[test]
    fn test_prepare_insert_rejects_bad_key() {
        let mut document = doc(json!({"id": 5}));
        assert!(matches!(
            prepare_insert(&mut document),
            Err(SessionError::InvalidDocument(_))
        ));
        let mut document = doc(json!({"id": ""}));
        assert!(prepare_insert(&mut document).is_err());
    }

    #[test]
    fn test_merge_changes() {
        let current = doc(json!({"id": "a", "name": "x", "size": 1}));
        let merged = merge_changes(&current, "a", doc(json!({"id": "a", "name": "y"}))).unwrap();
        assert_eq!(merged, doc(json!({"id": "a", "name": "y", "size": 1})));
    }

    #[test]
    fn test_merge_rejects_primary_key_change() {
        let current = doc(json!({"id": "a"}));
        assert!(merge_changes(&current, "a", doc(json!({"id": "b"}))).is_err());
    }
}
