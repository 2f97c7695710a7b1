use super::Mapper;
use crate::errors::MapperError;
use crate::query::{Query, QueryFilter, SortOrder};
use crate::session::{Document, MemorySession, QueryResult, Session, SessionError, WriteResult};
use crate::traits::{Destination, LifecycleHooks, Record};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Node {
    id: String,
    name: String,
    size: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LifecycleHooks for Node {}

impl Destination for Node {}

impl Record for Node {
    fn type_name() -> &'static str {
        "Node"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Records which hooks ran and fails the one named in `fail_on`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tracked {
    id: String,
    label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    calls: Vec<String>,
    #[serde(skip)]
    fail_on: Option<String>,
}

impl Tracked {
    fn record(&mut self, hook: &'static str) -> anyhow::Result<()> {
        self.calls.push(hook.to_string());
        if self.fail_on.as_deref() == Some(hook) {
            anyhow::bail!("{} refused", hook);
        }
        Ok(())
    }
}

impl LifecycleHooks for Tracked {
    fn before_create(&mut self) -> anyhow::Result<()> {
        // Hooks see the timestamps already set
        anyhow::ensure!(self.created_at != DateTime::<Utc>::default(), "created_at unset");
        self.label = self.label.trim().to_string();
        self.record("before_create")
    }

    fn after_create(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.id.is_empty(), "id unset");
        self.record("after_create")
    }

    fn before_update(&mut self) -> anyhow::Result<()> {
        self.record("before_update")
    }

    fn after_update(&mut self) -> anyhow::Result<()> {
        self.record("after_update")
    }

    fn before_delete(&mut self) -> anyhow::Result<()> {
        self.record("before_delete")
    }

    fn after_delete(&mut self) -> anyhow::Result<()> {
        self.record("after_delete")
    }
}

impl Destination for Tracked {}

impl Record for Tracked {
    fn type_name() -> &'static str {
        "Tracked"
    }

    fn table_name() -> String {
        "tracked_items".to_string()
    }

    fn indexes() -> Vec<&'static str> {
        vec!["label"]
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Misnamed {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LifecycleHooks for Misnamed {}

impl Record for Misnamed {
    fn type_name() -> &'static str {
        "Misnamed"
    }

    fn table_name() -> String {
        "bad-name".to_string()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

fn node(name: &str, size: i64) -> Node {
    Node {
        name: name.to_string(),
        size,
        ..Node::default()
    }
}

async fn mapper() -> Mapper<MemorySession> {
    let mapper = Mapper::new(Arc::new(MemorySession::new("rem_test")), None);
    mapper.create_table::<Node>().await.unwrap();
    mapper.create_table::<Tracked>().await.unwrap();
    mapper
}

#[tokio::test]
async fn test_is_new() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    assert!(mapper.is_new(&record));

    mapper.insert(&mut record).await.unwrap();
    assert!(!mapper.is_new(&record));

    let mut found = Node::default();
    mapper
        .find(&mut found, mapper.query::<Node>().get(record.id.clone()))
        .await
        .unwrap();
    assert!(!mapper.is_new(&found));
    assert!(!mapper.is_new(&record));
}

#[tokio::test]
async fn test_insert_sets_identity_and_timestamps() {
    let mapper = mapper().await;
    let mut record = node("test", 3);

    let before = Utc::now();
    mapper.insert(&mut record).await.unwrap();
    let after = Utc::now();

    assert!(!record.id.is_empty());
    assert!(record.created_at >= before && record.created_at <= after);
    assert_eq!(record.created_at, record.updated_at);

    let found: Node = mapper.find_by_id(&record.id).await.unwrap();
    assert_eq!(found, record);
    assert_eq!(found.name, "test");
}

#[tokio::test]
async fn test_insert_persisted_record_fails() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    record.id = "existing".to_string();
    let snapshot = record.clone();

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::AlreadyPersisted { ref table } if table == "nodes"));
    assert_eq!(record, snapshot);
}

#[tokio::test]
async fn test_insert_into_missing_table() {
    let mapper = Mapper::new(Arc::new(MemorySession::new("rem_test")), None);
    let mut record = node("a", 1);

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::Store(SessionError::TableNotFound { .. })
    ));
}

#[tokio::test]
async fn test_insert_rejects_invalid_table_name() {
    let mapper = mapper().await;
    let mut record = Misnamed::default();

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::InvalidArgument(_)));
    assert!(record.created_at == DateTime::<Utc>::default());
}

#[tokio::test]
async fn test_update_new_record_fails() {
    let mapper = mapper().await;
    let mut record = node("a", 1);

    let err = mapper.update(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::NotPersisted { .. }));
}

#[tokio::test]
async fn test_update_advances_updated_at() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    mapper.insert(&mut record).await.unwrap();
    let created_at = record.created_at;
    let previous = record.updated_at;

    record.name = "renamed".to_string();
    mapper.update(&mut record).await.unwrap();

    assert!(record.updated_at > previous);
    assert_eq!(record.created_at, created_at);

    let found: Node = mapper.find_by_id(&record.id).await.unwrap();
    assert_eq!(found.name, "renamed");
    assert_eq!(found.updated_at, record.updated_at);
    assert_eq!(found.created_at, created_at);
}

#[tokio::test]
async fn test_update_is_monotonic_with_future_timestamp() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    mapper.insert(&mut record).await.unwrap();

    let future = Utc::now() + chrono::Duration::hours(1);
    record.updated_at = future;
    mapper.update(&mut record).await.unwrap();
    assert!(record.updated_at > future);
}

#[tokio::test]
async fn test_update_at_max_timestamp_fails_cleanly() {
    let mapper = mapper().await;
    let mut record = Tracked {
        label: "stored".to_string(),
        ..Tracked::default()
    };
    mapper.insert(&mut record).await.unwrap();
    record.calls.clear();

    record.label = "changed".to_string();
    record.updated_at = DateTime::<Utc>::MAX_UTC;
    let err = mapper.update(&mut record).await.unwrap_err();

    assert!(matches!(err, MapperError::InvalidArgument(_)));
    assert_eq!(record.updated_at, DateTime::<Utc>::MAX_UTC);
    assert!(record.calls.is_empty());

    let found: Tracked = mapper.find_by_id(&record.id).await.unwrap();
    assert_eq!(found.label, "stored");
}

#[tokio::test]
async fn test_update_missing_document() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    record.id = "missing".to_string();

    let err = mapper.update(&mut record).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    mapper.insert(&mut record).await.unwrap();
    let id = record.id.clone();

    mapper.delete(&mut record).await.unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.name, "a");

    let err = mapper.find_by_id::<Node>(&id).await.unwrap_err();
    assert!(err.is_not_found());

    let err = mapper.delete(&mut record).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_new_record_fails() {
    let mapper = mapper().await;
    let mut record = node("a", 1);

    let err = mapper.delete(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::NotPersisted { .. }));
}

#[tokio::test]
async fn test_find_many() {
    let mapper = mapper().await;
    for (name, size) in [("a", 3), ("b", 1), ("c", 2)] {
        mapper.insert(&mut node(name, size)).await.unwrap();
    }

    let mut found: Vec<Node> = Vec::new();
    mapper
        .find(
            &mut found,
            mapper
                .query::<Node>()
                .filter(QueryFilter::gte("size", 2))
                .order_by("size", SortOrder::Asc),
        )
        .await
        .unwrap();

    let names: Vec<&str> = found.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a"]);
}

#[tokio::test]
async fn test_find_single_takes_first_row() {
    let mapper = mapper().await;
    for (name, size) in [("a", 3), ("b", 1)] {
        mapper.insert(&mut node(name, size)).await.unwrap();
    }

    let mut found = Node::default();
    mapper
        .find(
            &mut found,
            mapper.query::<Node>().order_by("size", SortOrder::Desc),
        )
        .await
        .unwrap();
    assert_eq!(found.name, "a");
}

#[tokio::test]
async fn test_find_empty_result() {
    let mapper = mapper().await;

    let mut single = node("untouched", 0);
    let err = mapper
        .find(&mut single, mapper.query::<Node>().get("nope"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(single.name, "untouched");

    let mut many: Vec<Node> = Vec::new();
    let err = mapper
        .find(&mut many, mapper.query::<Node>())
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound { ref table } if table == "nodes"));
}

#[tokio::test]
async fn test_find_decode_error() {
    let mapper = mapper().await;
    let mut record = node("a", 1);
    mapper.insert(&mut record).await.unwrap();

    // node documents have no `label`
    let mut found = Tracked::default();
    let err = mapper
        .find(&mut found, mapper.query::<Node>())
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::Decode(_)));
}

#[tokio::test]
async fn test_hooks_run_in_order() {
    let mapper = mapper().await;
    let mut record = Tracked {
        label: "  padded ".to_string(),
        ..Tracked::default()
    };

    mapper.insert(&mut record).await.unwrap();
    mapper.update(&mut record).await.unwrap();
    mapper.delete(&mut record).await.unwrap();

    assert_eq!(
        record.calls,
        vec![
            "before_create",
            "after_create",
            "before_update",
            "after_update",
            "before_delete",
            "after_delete",
        ]
    );
    assert_eq!(record.label, "padded");
}

#[tokio::test]
async fn test_before_hook_error_aborts() {
    let mapper = mapper().await;
    let mut record = Tracked {
        label: "x".to_string(),
        fail_on: Some("before_create".to_string()),
        ..Tracked::default()
    };

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::Hook { hook: "before_create", .. }));
    assert!(record.is_new());
    assert_eq!(record.calls, vec!["before_create"]);

    let mut all: Vec<Tracked> = Vec::new();
    let err = mapper
        .find(&mut all, mapper.query::<Tracked>())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_after_hook_error_propagates() {
    let mapper = mapper().await;
    let mut record = Tracked {
        label: "x".to_string(),
        fail_on: Some("after_create".to_string()),
        ..Tracked::default()
    };

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::Hook { hook: "after_create", .. }));
    assert!(!record.is_new());

    // The write itself went through
    let found: Tracked = mapper.find_by_id(&record.id).await.unwrap();
    assert_eq!(found.label, "x");
}

#[tokio::test]
async fn test_before_delete_error_keeps_document() {
    let mapper = mapper().await;
    let mut record = Tracked {
        label: "x".to_string(),
        ..Tracked::default()
    };
    mapper.insert(&mut record).await.unwrap();

    record.fail_on = Some("before_delete".to_string());
    let err = mapper.delete(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::Hook { hook: "before_delete", .. }));
    assert!(mapper.find_by_id::<Tracked>(&record.id).await.is_ok());
}

#[tokio::test]
async fn test_create_and_drop_table() {
    let mapper = Mapper::new(Arc::new(MemorySession::new("rem_test")), None);

    mapper.create_table::<Node>().await.unwrap();
    assert!(mapper.table_list().await.unwrap().contains(&"nodes".to_string()));

    let err = mapper.create_table::<Node>().await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::Store(SessionError::TableExists { .. })
    ));

    mapper.drop_table::<Node>().await.unwrap();
    assert!(!mapper.table_list().await.unwrap().contains(&"nodes".to_string()));
}

#[tokio::test]
async fn test_index_create_and_drop() {
    let mapper = mapper().await;

    mapper.index_create::<Tracked>("label").await.unwrap();
    assert_eq!(
        mapper.index_list::<Tracked>().await.unwrap(),
        vec!["label".to_string()]
    );

    let err = mapper.index_create::<Tracked>("label").await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::Store(SessionError::IndexExists { .. })
    ));

    mapper.index_drop::<Tracked>("label").await.unwrap();
    assert!(mapper.index_list::<Tracked>().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_index_name_validated() {
    let mapper = mapper().await;
    let err = mapper.index_create::<Node>("no spaces").await.unwrap_err();
    assert!(matches!(err, MapperError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_namespace() {
    let session = Arc::new(MemorySession::new("rem_test"));
    let mapper = Mapper::new(Arc::clone(&session), Some("other".to_string()));
    assert_eq!(mapper.query::<Node>().db(), Some("other"));

    let err = mapper.create_table::<Node>().await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::Store(SessionError::DatabaseNotFound(_))
    ));

    session.db_create("other").await.unwrap();
    mapper.create_table::<Node>().await.unwrap();
    let mut record = node("a", 1);
    mapper.insert(&mut record).await.unwrap();

    assert!(session.table_list(None).await.unwrap().is_empty());
    assert_eq!(
        session.table_list(Some("other")).await.unwrap(),
        vec!["nodes".to_string()]
    );
}

/// Session whose writes answer with canned results
struct CannedSession {
    insert: WriteResult,
    update: WriteResult,
    delete: WriteResult,
}

impl CannedSession {
    fn failing() -> Self {
        Self {
            insert: WriteResult::error("disk full"),
            update: WriteResult::error("disk full"),
            delete: WriteResult::error("disk full"),
        }
    }
}

#[async_trait]
impl Session for CannedSession {
    fn default_db(&self) -> &str {
        "canned"
    }

    async fn db_create(&self, _name: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn db_drop(&self, _name: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn db_list(&self) -> Result<Vec<String>, SessionError> {
        Ok(vec!["canned".to_string()])
    }

    async fn table_create(&self, _db: Option<&str>, _table: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn table_drop(&self, _db: Option<&str>, _table: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn table_list(&self, _db: Option<&str>) -> Result<Vec<String>, SessionError> {
        Ok(Vec::new())
    }

    async fn index_create(
        &self,
        _db: Option<&str>,
        _table: &str,
        _name: &str,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn index_drop(
        &self,
        _db: Option<&str>,
        _table: &str,
        _name: &str,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn index_list(&self, _db: Option<&str>, _table: &str) -> Result<Vec<String>, SessionError> {
        Ok(Vec::new())
    }

    async fn insert(
        &self,
        _db: Option<&str>,
        _table: &str,
        _document: Document,
    ) -> Result<WriteResult, SessionError> {
        Ok(self.insert.clone())
    }

    async fn update(
        &self,
        _db: Option<&str>,
        _table: &str,
        _id: &str,
        _changes: Document,
    ) -> Result<WriteResult, SessionError> {
        Ok(self.update.clone())
    }

    async fn delete(
        &self,
        _db: Option<&str>,
        _table: &str,
        _id: &str,
    ) -> Result<WriteResult, SessionError> {
        Ok(self.delete.clone())
    }

    async fn run(&self, _query: &Query) -> Result<QueryResult, SessionError> {
        Ok(QueryResult::default())
    }
}

fn tracked(label: &str) -> Tracked {
    Tracked {
        label: label.to_string(),
        ..Tracked::default()
    }
}

#[tokio::test]
async fn test_insert_write_error() {
    let mapper = Mapper::new(Arc::new(CannedSession::failing()), None);
    let mut record = tracked("x");

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::WriteFailed { ref table, ref message }
            if table == "tracked_items" && message == "disk full"
    ));
    assert!(record.id.is_empty());
    assert_eq!(record.calls, vec!["before_create"]);
}

#[tokio::test]
async fn test_insert_without_generated_key() {
    let session = CannedSession {
        insert: WriteResult::inserted(None),
        ..CannedSession::failing()
    };
    let mapper = Mapper::new(Arc::new(session), None);
    let mut record = tracked("x");

    let err = mapper.insert(&mut record).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::MissingGeneratedKey { ref table } if table == "tracked_items"
    ));
    assert!(record.id.is_empty());
    assert_eq!(record.calls, vec!["before_create"]);
}

#[tokio::test]
async fn test_update_write_error() {
    let mapper = Mapper::new(Arc::new(CannedSession::failing()), None);
    let mut record = tracked("x");
    record.id = "existing".to_string();

    let err = mapper.update(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::WriteFailed { ref message, .. } if message == "disk full"));
    assert_eq!(record.calls, vec!["before_update"]);
}

#[tokio::test]
async fn test_delete_write_error() {
    let mapper = Mapper::new(Arc::new(CannedSession::failing()), None);
    let mut record = tracked("x");
    record.id = "existing".to_string();

    let err = mapper.delete(&mut record).await.unwrap_err();
    assert!(matches!(err, MapperError::WriteFailed { ref message, .. } if message == "disk full"));
    assert_eq!(record.calls, vec!["before_delete"]);
    assert_eq!(record.id, "existing");
}
