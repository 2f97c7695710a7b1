//! In-memory document session
//!
//! Keeps every namespace, table and document in process behind an async
//! `RwLock`. Behaves like the PostgreSQL session for everything the mapper
//! relies on, which makes it the session of choice for tests.

use super::{merge_changes, prepare_insert, Document, Session, SessionError};
use super::{QueryResult, WriteResult};
use crate::query::evaluate::{compare_documents, matches_all};
use crate::query::{Query, Selection};
use crate::validation::{ValidatedIndexName, ValidatedTableName};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: BTreeMap<String, Document>,
    indexes: BTreeSet<String>,
}

type Namespace = HashMap<String, MemoryTable>;

pub struct MemorySession {
    default_db: String,
    databases: RwLock<HashMap<String, Namespace>>,
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession")
            .field("default_db", &self.default_db)
            .finish()
    }
}

impl MemorySession {
    /// Create a session whose default namespace already exists
    pub fn new(default_db: impl Into<String>) -> Self {
        let default_db = default_db.into();
        let mut databases = HashMap::new();
        databases.insert(default_db.clone(), Namespace::new());
        Self {
            default_db,
            databases: RwLock::new(databases),
        }
    }

    fn resolve<'a>(&'a self, db: Option<&'a str>) -> &'a str {
        db.unwrap_or(&self.default_db)
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new("test")
    }
}

fn namespace<'a>(
    databases: &'a HashMap<String, Namespace>,
    db: &str,
) -> Result<&'a Namespace, SessionError> {
    databases
        .get(db)
        .ok_or_else(|| SessionError::DatabaseNotFound(db.to_string()))
}

fn namespace_mut<'a>(
    databases: &'a mut HashMap<String, Namespace>,
    db: &str,
) -> Result<&'a mut Namespace, SessionError> {
    databases
        .get_mut(db)
        .ok_or_else(|| SessionError::DatabaseNotFound(db.to_string()))
}

fn table<'a>(
    databases: &'a HashMap<String, Namespace>,
    db: &str,
    name: &str,
) -> Result<&'a MemoryTable, SessionError> {
    namespace(databases, db)?
        .get(name)
        .ok_or_else(|| SessionError::table_not_found(db, name))
}

fn table_mut<'a>(
    databases: &'a mut HashMap<String, Namespace>,
    db: &str,
    name: &str,
) -> Result<&'a mut MemoryTable, SessionError> {
    namespace_mut(databases, db)?
        .get_mut(name)
        .ok_or_else(|| SessionError::table_not_found(db, name))
}

#[async_trait]
impl Session for MemorySession {
    fn default_db(&self) -> &str {
        &self.default_db
    }

    async fn db_create(&self, name: &str) -> Result<(), SessionError> {
        ValidatedTableName::new(name)?;
        let mut databases = self.databases.write().await;
        if databases.contains_key(name) {
            return Err(SessionError::DatabaseExists(name.to_string()));
        }
        databases.insert(name.to_string(), Namespace::new());
        Ok(())
    }

    async fn db_drop(&self, name: &str) -> Result<(), SessionError> {
        self.databases
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SessionError::DatabaseNotFound(name.to_string()))
    }

    async fn db_list(&self) -> Result<Vec<String>, SessionError> {
        let mut names: Vec<String> = self.databases.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn table_create(&self, db: Option<&str>, table: &str) -> Result<(), SessionError> {
        let db = self.resolve(db);
        ValidatedTableName::new(table)?;
        tracing::trace!(db, table, "memory table_create");

        let mut databases = self.databases.write().await;
        let namespace = namespace_mut(&mut databases, db)?;
        if namespace.contains_key(table) {
            return Err(SessionError::table_exists(db, table));
        }
        namespace.insert(table.to_string(), MemoryTable::default());
        Ok(())
    }

    async fn table_drop(&self, db: Option<&str>, table: &str) -> Result<(), SessionError> {
        let db = self.resolve(db);
        tracing::trace!(db, table, "memory table_drop");

        let mut databases = self.databases.write().await;
        namespace_mut(&mut databases, db)?
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| SessionError::table_not_found(db, table))
    }

    async fn table_list(&self, db: Option<&str>) -> Result<Vec<String>, SessionError> {
        let db = self.resolve(db);
        let databases = self.databases.read().await;
        let mut names: Vec<String> = namespace(&databases, db)?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn index_create(
        &self,
        db: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<(), SessionError> {
        let db = self.resolve(db);
        ValidatedIndexName::new(name)?;

        let mut databases = self.databases.write().await;
        let target = table_mut(&mut databases, db, table)?;
        if !target.indexes.insert(name.to_string()) {
            return Err(SessionError::index_exists(table, name));
        }
        Ok(())
    }

    async fn index_drop(
        &self,
        db: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<(), SessionError> {
        let db = self.resolve(db);

        let mut databases = self.databases.write().await;
        let target = table_mut(&mut databases, db, table)?;
        if !target.indexes.remove(name) {
            return Err(SessionError::index_not_found(table, name));
        }
        Ok(())
    }

    async fn index_list(&self, db: Option<&str>, table: &str) -> Result<Vec<String>, SessionError> {
        let db = self.resolve(db);
        let databases = self.databases.read().await;
        Ok(self::table(&databases, db, table)?
            .indexes
            .iter()
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        db: Option<&str>,
        table: &str,
        mut document: Document,
    ) -> Result<WriteResult, SessionError> {
        let db = self.resolve(db);
        let (id, generated) = prepare_insert(&mut document)?;
        tracing::trace!(db, table, id = %id, "memory insert");

        let mut databases = self.databases.write().await;
        let target = table_mut(&mut databases, db, table)?;
        if target.rows.contains_key(&id) {
            return Ok(WriteResult::error(format!(
                "Duplicate primary key `id`: \"{}\"",
                id
            )));
        }
        target.rows.insert(id.clone(), document);

        Ok(WriteResult::inserted(generated.then_some(id)))
    }

    async fn update(
        &self,
        db: Option<&str>,
        table: &str,
        id: &str,
        changes: Document,
    ) -> Result<WriteResult, SessionError> {
        let db = self.resolve(db);
        tracing::trace!(db, table, id, "memory update");

        let mut databases = self.databases.write().await;
        let target = table_mut(&mut databases, db, table)?;
        let Some(current) = target.rows.get_mut(id) else {
            return Ok(WriteResult::skipped());
        };

        match merge_changes(current, id, changes) {
            Ok(merged) if merged == *current => Ok(WriteResult::unchanged()),
            Ok(merged) => {
                *current = merged;
                Ok(WriteResult::replaced())
            }
            Err(message) => Ok(WriteResult::error(message)),
        }
    }

    async fn delete(
        &self,
        db: Option<&str>,
        table: &str,
        id: &str,
    ) -> Result<WriteResult, SessionError> {
        let db = self.resolve(db);
        tracing::trace!(db, table, id, "memory delete");

        let mut databases = self.databases.write().await;
        let target = table_mut(&mut databases, db, table)?;
        Ok(match target.rows.remove(id) {
            Some(_) => WriteResult::deleted(),
            None => WriteResult::skipped(),
        })
    }

    async fn run(&self, query: &Query) -> Result<QueryResult, SessionError> {
        let db = self.resolve(query.db());
        tracing::trace!(db, table = query.table_name(), "memory run");

        let databases = self.databases.read().await;
        let source = self::table(&databases, db, query.table_name())?;

        let mut documents: Vec<&Document> = match query.selection() {
            Selection::Table => source.rows.values().collect(),
            Selection::Get(id) => source.rows.get(id).into_iter().collect(),
        };
        documents.retain(|document| matches_all(query.conditions(), document));

        if !query.ordering().is_empty() {
            documents.sort_by(|a, b| compare_documents(a, b, query.ordering()));
        }

        let rows = documents
            .into_iter()
            .skip(query.offset_value().unwrap_or(0))
            .take(query.limit_value().unwrap_or(usize::MAX))
            .map(|document| Value::Object(document.clone()))
            .collect();

        Ok(QueryResult::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryFilter, SortOrder};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn session_with_table() -> MemorySession {
        let session = MemorySession::new("rem_test");
        session.table_create(None, "nodes").await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_default_db_exists() {
        let session = MemorySession::default();
        assert_eq!(session.default_db(), "test");
        assert_eq!(session.db_list().await.unwrap(), vec!["test".to_string()]);
    }

    #[tokio::test]
    async fn test_db_lifecycle() {
        let session = MemorySession::default();
        session.db_create("other").await.unwrap();
        assert!(matches!(
            session.db_create("other").await,
            Err(SessionError::DatabaseExists(_))
        ));
        assert_eq!(session.db_list().await.unwrap(), vec!["other", "test"]);
        session.db_drop("other").await.unwrap();
        assert!(matches!(
            session.db_drop("other").await,
            Err(SessionError::DatabaseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_table_lifecycle() {
        let session = session_with_table().await;
        assert_eq!(session.table_list(None).await.unwrap(), vec!["nodes"]);
        assert!(matches!(
            session.table_create(None, "nodes").await,
            Err(SessionError::TableExists { .. })
        ));
        session.table_drop(None, "nodes").await.unwrap();
        assert!(session.table_list(None).await.unwrap().is_empty());
        assert!(matches!(
            session.table_drop(None, "nodes").await,
            Err(SessionError::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_table_in_missing_db() {
        let session = MemorySession::default();
        assert!(matches!(
            session.table_create(Some("nope"), "nodes").await,
            Err(SessionError::DatabaseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_table_name() {
        let session = MemorySession::default();
        assert!(matches!(
            session.table_create(None, "bad name").await,
            Err(SessionError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let session = session_with_table().await;
        session.index_create(None, "nodes", "name").await.unwrap();
        session.index_create(None, "nodes", "kind").await.unwrap();
        assert_eq!(session.index_list(None, "nodes").await.unwrap(), vec!["kind", "name"]);
        assert!(matches!(
            session.index_create(None, "nodes", "name").await,
            Err(SessionError::IndexExists { .. })
        ));
        session.index_drop(None, "nodes", "name").await.unwrap();
        assert!(matches!(
            session.index_drop(None, "nodes", "name").await,
            Err(SessionError::IndexNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_generates_key() {
        let session = session_with_table().await;
        let result = session.insert(None, "nodes", doc(json!({"name": "a"}))).await.unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.generated_keys.len(), 1);

        let rows = session
            .run(&Query::table("nodes").get(result.generated_keys[0].clone()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0]["name"], json!("a"));
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_write_error() {
        let session = session_with_table().await;
        session.insert(None, "nodes", doc(json!({"id": "a"}))).await.unwrap();
        let result = session.insert(None, "nodes", doc(json!({"id": "a"}))).await.unwrap();
        assert_eq!(result.errors, 1);
        assert!(result.first_error.unwrap().contains("Duplicate primary key"));
    }

    #[tokio::test]
    async fn test_insert_into_missing_table() {
        let session = MemorySession::default();
        assert!(matches!(
            session.insert(None, "nodes", doc(json!({}))).await,
            Err(SessionError::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_outcomes() {
        let session = session_with_table().await;
        session
            .insert(None, "nodes", doc(json!({"id": "a", "name": "x"})))
            .await
            .unwrap();

        let replaced = session
            .update(None, "nodes", "a", doc(json!({"name": "y"})))
            .await
            .unwrap();
        assert_eq!(replaced.replaced, 1);

        let unchanged = session
            .update(None, "nodes", "a", doc(json!({"name": "y"})))
            .await
            .unwrap();
        assert_eq!(unchanged.unchanged, 1);

        let skipped = session
            .update(None, "nodes", "missing", doc(json!({"name": "y"})))
            .await
            .unwrap();
        assert_eq!(skipped.skipped, 1);
        assert_eq!(skipped.affected(), 0);

        let rejected = session
            .update(None, "nodes", "a", doc(json!({"id": "b"})))
            .await
            .unwrap();
        assert_eq!(rejected.errors, 1);
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let session = session_with_table().await;
        session.insert(None, "nodes", doc(json!({"id": "a"}))).await.unwrap();
        assert_eq!(session.delete(None, "nodes", "a").await.unwrap().deleted, 1);
        assert_eq!(session.delete(None, "nodes", "a").await.unwrap().skipped, 1);
        assert!(session.run(&Query::table("nodes").get("a")).await.unwrap().is_nil());
    }

    #[tokio::test]
    async fn test_run_filter_order_paginate() {
        let session = session_with_table().await;
        for (name, size) in [("c", 3), ("a", 1), ("b", 2), ("d", 4)] {
            session
                .insert(None, "nodes", doc(json!({"name": name, "size": size})))
                .await
                .unwrap();
        }

        let query = Query::table("nodes")
            .filter(QueryFilter::gt("size", 1))
            .order_by("name", SortOrder::Asc)
            .offset(1)
            .limit(2);
        let names: Vec<Value> = session
            .run(&query)
            .await
            .unwrap()
            .into_rows()
            .into_iter()
            .map(|row| row["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("c"), json!("d")]);
    }

    #[tokio::test]
    async fn test_run_in_other_db() {
        let session = MemorySession::default();
        session.db_create("other").await.unwrap();
        session.table_create(Some("other"), "nodes").await.unwrap();
        session
            .insert(Some("other"), "nodes", doc(json!({"id": "a"})))
            .await
            .unwrap();

        let rows = session
            .run(&Query::table("nodes").in_db("other"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(
            session.run(&Query::table("nodes")).await,
            Err(SessionError::TableNotFound { .. })
        ));
    }
}
