//! PostgreSQL document session
//!
//! Each namespace is a schema and each table is
//! `(id TEXT PRIMARY KEY, doc JSONB NOT NULL)`. A secondary index named
//! `name` is an expression index over `doc -> 'name'`, named `<table>$<name>`
//! and commented with `name` so listings report it.

use super::{merge_changes, prepare_insert, Document, Session, SessionError};
use super::{QueryResult, WriteResult};
use crate::query::sql_generation::{SqlGenerator, SqlParam};
use crate::query::Query;
use crate::validation::{ValidatedIndexName, ValidatedTableName};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

const UNIQUE_VIOLATION: &str = "23505";
const UNDEFINED_TABLE: &str = "42P01";
const DUPLICATE_TABLE: &str = "42P07";
const DUPLICATE_SCHEMA: &str = "42P06";
const INVALID_SCHEMA_NAME: &str = "3F000";
const UNDEFINED_OBJECT: &str = "42704";

const INDEX_SEPARATOR: char = '$';
const MAX_IDENTIFIER_LENGTH: usize = 63;
// prefix + separator + 32 hex digits fits the identifier limit
const HASHED_PREFIX_LENGTH: usize = 30;

#[derive(Clone)]
pub struct PgSession {
    pool: PgPool,
    default_db: String,
}

impl std::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession")
            .field("default_db", &self.default_db)
            .finish()
    }
}

fn sql_state(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|code| code.into_owned())
}

/// Quoted relation name of index `index` on `table`.
///
/// `$` never appears in a validated identifier, so `<table>$<index>` cannot
/// collide across tables. Names past the PostgreSQL identifier limit keep a
/// table prefix and a hash of the pair instead.
fn index_relation(table: &str, index: &ValidatedIndexName) -> String {
    let name = format!("{}{}{}", table, INDEX_SEPARATOR, index.as_str());
    if name.len() <= MAX_IDENTIFIER_LENGTH {
        return format!("\"{}\"", name);
    }

    let digest = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).simple();
    let prefix = &table[..table.len().min(HASHED_PREFIX_LENGTH)];
    format!("\"{}{}{}\"", prefix, INDEX_SEPARATOR, digest)
}

impl PgSession {
    /// Wrap an existing pool; `default_db` is the schema used when an
    /// operation names none (usually `public`).
    pub fn new(pool: PgPool, default_db: impl Into<String>) -> Self {
        Self {
            pool,
            default_db: default_db.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn schema(&self, db: Option<&str>) -> Result<ValidatedTableName, SessionError> {
        Ok(ValidatedTableName::new(db.unwrap_or(&self.default_db))?)
    }

    fn relation(&self, db: Option<&str>, table: &str) -> Result<(ValidatedTableName, ValidatedTableName), SessionError> {
        Ok((self.schema(db)?, ValidatedTableName::new(table)?))
    }

    async fn schema_exists(&self, schema: &str) -> Result<bool, SessionError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(schema)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool, SessionError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Map a failed statement on a table to the structural error it reports
    fn table_error(err: sqlx::Error, schema: &str, table: &str) -> SessionError {
        match sql_state(&err).as_deref() {
            Some(UNDEFINED_TABLE) => SessionError::table_not_found(schema, table),
            Some(INVALID_SCHEMA_NAME) => SessionError::DatabaseNotFound(schema.to_string()),
            _ => SessionError::Database(err),
        }
    }
}

#[async_trait]
impl Session for PgSession {
    fn default_db(&self) -> &str {
        &self.default_db
    }

    async fn db_create(&self, name: &str) -> Result<(), SessionError> {
        let schema = ValidatedTableName::new(name)?;
        let sql = format!("CREATE SCHEMA {}", schema.quoted());
        tracing::trace!(sql = %sql, "pg db_create");

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| match sql_state(&e).as_deref() {
                Some(DUPLICATE_SCHEMA) => SessionError::DatabaseExists(name.to_string()),
                _ => SessionError::Database(e),
            })?;
        Ok(())
    }

    async fn db_drop(&self, name: &str) -> Result<(), SessionError> {
        let schema = ValidatedTableName::new(name)?;
        let sql = format!("DROP SCHEMA {} CASCADE", schema.quoted());
        tracing::trace!(sql = %sql, "pg db_drop");

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| match sql_state(&e).as_deref() {
                Some(INVALID_SCHEMA_NAME) => SessionError::DatabaseNotFound(name.to_string()),
                _ => SessionError::Database(e),
            })?;
        Ok(())
    }

    async fn db_list(&self) -> Result<Vec<String>, SessionError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT schema_name::text FROM information_schema.schemata \
             WHERE schema_name NOT LIKE 'pg\\_%' AND schema_name <> 'information_schema' \
             ORDER BY schema_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn table_create(&self, db: Option<&str>, table: &str) -> Result<(), SessionError> {
        let (schema, name) = self.relation(db, table)?;
        let sql = format!(
            "CREATE TABLE {}.{} (id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
            schema.quoted(),
            name.quoted()
        );
        tracing::trace!(sql = %sql, "pg table_create");

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| match sql_state(&e).as_deref() {
                Some(DUPLICATE_TABLE) => SessionError::table_exists(schema.as_str(), table),
                _ => Self::table_error(e, schema.as_str(), table),
            })?;
        Ok(())
    }

    async fn table_drop(&self, db: Option<&str>, table: &str) -> Result<(), SessionError> {
        let (schema, name) = self.relation(db, table)?;
        let sql = format!("DROP TABLE {}.{}", schema.quoted(), name.quoted());
        tracing::trace!(sql = %sql, "pg table_drop");

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::table_error(e, schema.as_str(), table))?;
        Ok(())
    }

    async fn table_list(&self, db: Option<&str>) -> Result<Vec<String>, SessionError> {
        let schema = self.schema(db)?;
        if !self.schema_exists(schema.as_str()).await? {
            return Err(SessionError::DatabaseNotFound(schema.into_string()));
        }

        Ok(sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 ORDER BY table_name",
        )
        .bind(schema.as_str())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn index_create(
        &self,
        db: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<(), SessionError> {
        let (schema, relation) = self.relation(db, table)?;
        let index = ValidatedIndexName::new(name)?;
        let index_name = index_relation(relation.as_str(), &index);
        // The index name is a validated identifier, safe inside the literals
        let create = format!(
            "CREATE INDEX {} ON {}.{} ((doc -> '{}'))",
            index_name,
            schema.quoted(),
            relation.quoted(),
            index.as_str()
        );
        let comment = format!(
            "COMMENT ON INDEX {}.{} IS '{}'",
            schema.quoted(),
            index_name,
            index.as_str()
        );
        tracing::trace!(sql = %create, "pg index_create");

        let map_err = |e: sqlx::Error| match sql_state(&e).as_deref() {
            Some(DUPLICATE_TABLE) => SessionError::index_exists(table, name),
            _ => Self::table_error(e, schema.as_str(), table),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(&create).execute(&mut *tx).await.map_err(map_err)?;
        sqlx::query(&comment).execute(&mut *tx).await.map_err(map_err)?;
        tx.commit().await?;
        Ok(())
    }

    async fn index_drop(
        &self,
        db: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<(), SessionError> {
        let (schema, relation) = self.relation(db, table)?;
        let index_name = index_relation(relation.as_str(), &ValidatedIndexName::new(name)?);
        let sql = format!("DROP INDEX {}.{}", schema.quoted(), index_name);
        tracing::trace!(sql = %sql, "pg index_drop");

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| match sql_state(&e).as_deref() {
                Some(UNDEFINED_OBJECT) => SessionError::index_not_found(table, name),
                _ => Self::table_error(e, schema.as_str(), table),
            })?;
        Ok(())
    }

    async fn index_list(&self, db: Option<&str>, table: &str) -> Result<Vec<String>, SessionError> {
        let (schema, relation) = self.relation(db, table)?;
        if !self.table_exists(schema.as_str(), relation.as_str()).await? {
            return Err(SessionError::table_not_found(schema.as_str(), table));
        }

        // Only mapper-created indexes carry a comment; the primary key has none
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT obj_description(format('%I.%I', schemaname, indexname)::regclass, 'pg_class') AS name \
             FROM pg_indexes \
             WHERE schemaname = $1 AND tablename = $2 \
             AND obj_description(format('%I.%I', schemaname, indexname)::regclass, 'pg_class') IS NOT NULL \
             ORDER BY name",
        )
        .bind(schema.as_str())
        .bind(relation.as_str())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert(
        &self,
        db: Option<&str>,
        table: &str,
        mut document: Document,
    ) -> Result<WriteResult, SessionError> {
        let (schema, relation) = self.relation(db, table)?;
        let (id, generated) = prepare_insert(&mut document)?;
        let sql = format!(
            "INSERT INTO {}.{} (id, doc) VALUES ($1, $2)",
            schema.quoted(),
            relation.quoted()
        );
        tracing::trace!(sql = %sql, id = %id, "pg insert");

        let outcome = sqlx::query(&sql)
            .bind(&id)
            .bind(Json(Value::Object(document)))
            .execute(&self.pool)
            .await;

        match outcome {
            Ok(_) => Ok(WriteResult::inserted(generated.then_some(id))),
            Err(e) if sql_state(&e).as_deref() == Some(UNIQUE_VIOLATION) => Ok(
                WriteResult::error(format!("Duplicate primary key `id`: \"{}\"", id)),
            ),
            Err(e) => Err(Self::table_error(e, schema.as_str(), table)),
        }
    }

    async fn update(
        &self,
        db: Option<&str>,
        table: &str,
        id: &str,
        changes: Document,
    ) -> Result<WriteResult, SessionError> {
        let (schema, relation) = self.relation(db, table)?;
        let target = format!("{}.{}", schema.quoted(), relation.quoted());
        tracing::trace!(table = %target, id, "pg update");

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, Json<Value>>(&format!(
            "SELECT doc FROM {} WHERE id = $1 FOR UPDATE",
            target
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Self::table_error(e, schema.as_str(), table))?;

        let Some(Json(Value::Object(current))) = current else {
            return Ok(WriteResult::skipped());
        };

        let merged = match merge_changes(&current, id, changes) {
            Ok(merged) => merged,
            Err(message) => return Ok(WriteResult::error(message)),
        };
        if merged == current {
            return Ok(WriteResult::unchanged());
        }

        sqlx::query(&format!("UPDATE {} SET doc = $2 WHERE id = $1", target))
            .bind(id)
            .bind(Json(Value::Object(merged)))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(WriteResult::replaced())
    }

    async fn delete(
        &self,
        db: Option<&str>,
        table: &str,
        id: &str,
    ) -> Result<WriteResult, SessionError> {
        let (schema, relation) = self.relation(db, table)?;
        let sql = format!(
            "DELETE FROM {}.{} WHERE id = $1",
            schema.quoted(),
            relation.quoted()
        );
        tracing::trace!(sql = %sql, id, "pg delete");

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::table_error(e, schema.as_str(), table))?;

        Ok(if result.rows_affected() > 0 {
            WriteResult::deleted()
        } else {
            WriteResult::skipped()
        })
    }

    async fn run(&self, query: &Query) -> Result<QueryResult, SessionError> {
        let (schema, relation) = self.relation(query.db(), query.table_name())?;
        let target = format!("{}.{}", schema.quoted(), relation.quoted());
        let (sql, params) = SqlGenerator::select_sql(query, &target);
        tracing::trace!(sql = %sql, "pg run");

        let mut statement = sqlx::query_scalar::<_, Json<Value>>(&sql);
        for param in params {
            statement = match param {
                SqlParam::Text(text) => statement.bind(text),
                SqlParam::Path(path) => statement.bind(path),
                SqlParam::Json(value) => statement.bind(Json(value)),
            };
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::table_error(e, schema.as_str(), query.table_name()))?;

        Ok(QueryResult::new(rows.into_iter().map(|Json(doc)| doc).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(name: &str) -> ValidatedIndexName {
        ValidatedIndexName::new(name).unwrap()
    }

    #[test]
    fn test_index_relation_name() {
        assert_eq!(index_relation("nodes", &index("name")), "\"nodes$name\"");
    }

    #[test]
    fn test_index_relation_distinct_across_tables() {
        assert_ne!(
            index_relation("a_b", &index("c")),
            index_relation("a", &index("b_c"))
        );
    }

    #[test]
    fn test_index_relation_long_names() {
        let table = "n".repeat(60);
        let first = index_relation(&table, &index("name"));
        let second = index_relation(&table, &index("kind"));

        // quoted, so two more than the identifier itself
        assert!(first.len() <= MAX_IDENTIFIER_LENGTH + 2);
        assert!(first.starts_with(&format!("\"{}$", "n".repeat(HASHED_PREFIX_LENGTH))));
        assert_ne!(first, second);
        assert_eq!(first, index_relation(&table, &index("name")));
    }
}
