//! Record lifecycle operations
//!
//! Each operation is one round trip to the session, bracketed by the
//! record's lifecycle hooks. Records are mutated in place: insert writes the
//! generated identity and both timestamps back, update refreshes
//! `updated_at`.

use super::core::Mapper;
use crate::errors::MapperError;
use crate::query::Query;
use crate::session::{Document, Session, PRIMARY_KEY};
use crate::traits::{Destination, Record};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Current time, strictly after `previous`. `None` when `previous` is the
/// latest representable instant.
fn now_after(previous: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let now = Utc::now();
    if now > previous {
        Some(now)
    } else {
        previous.checked_add_signed(Duration::microseconds(1))
    }
}

fn to_document<T: Record>(record: &T, table: &str) -> Result<Document, MapperError> {
    let value = serde_json::to_value(record).map_err(|e| {
        MapperError::InvalidArgument(format!("cannot serialize record for '{}': {}", table, e))
    })?;

    match value {
        Value::Object(document) => Ok(document),
        other => Err(MapperError::InvalidArgument(format!(
            "record for '{}' must serialize to an object, got {}",
            table, other
        ))),
    }
}

impl<S: Session + ?Sized> Mapper<S> {
    /// Insert a new record.
    ///
    /// Fails with `AlreadyPersisted` (leaving the record untouched) when the
    /// record already has an identity.
    pub async fn insert<T: Record>(&self, record: &mut T) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        if !record.is_new() {
            return Err(MapperError::AlreadyPersisted { table });
        }

        let now = Utc::now();
        record.set_created_at(now);
        record.set_updated_at(now);

        record
            .before_create()
            .map_err(|e| MapperError::hook("before_create", e))?;

        let mut document = to_document(record, &table)?;
        document.remove(PRIMARY_KEY);

        tracing::debug!(table = %table, namespace = ?self.namespace, "inserting document");
        let result = self
            .session
            .insert(self.namespace(), &table, document)
            .await?;

        if result.errors > 0 {
            return Err(MapperError::write_failed(&table, result.first_error));
        }

        let id = result
            .generated_keys
            .into_iter()
            .next()
            .ok_or_else(|| MapperError::MissingGeneratedKey {
                table: table.clone(),
            })?;
        record.set_id(id);

        record
            .after_create()
            .map_err(|e| MapperError::hook("after_create", e))?;

        Ok(())
    }

    /// Persist changes to an existing record.
    ///
    /// `updated_at` always moves strictly forward; `created_at` is left as
    /// is. Fails with `NotFound` when the store has no document with the
    /// record's identity.
    pub async fn update<T: Record>(&self, record: &mut T) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        if record.is_new() {
            return Err(MapperError::NotPersisted { table });
        }

        let updated_at = now_after(record.updated_at()).ok_or_else(|| {
            MapperError::InvalidArgument(format!(
                "updated_at of '{}' record {} cannot advance past {}",
                table,
                record.id(),
                record.updated_at()
            ))
        })?;
        record.set_updated_at(updated_at);

        record
            .before_update()
            .map_err(|e| MapperError::hook("before_update", e))?;

        let document = to_document(record, &table)?;

        tracing::debug!(table = %table, id = record.id(), "updating document");
        let result = self
            .session
            .update(self.namespace(), &table, record.id(), document)
            .await?;

        if result.errors > 0 {
            return Err(MapperError::write_failed(&table, result.first_error));
        }
        if result.replaced + result.unchanged == 0 {
            return Err(MapperError::NotFound { table });
        }

        record
            .after_update()
            .map_err(|e| MapperError::hook("after_update", e))?;

        Ok(())
    }

    /// Delete a persisted record. The record value itself is left intact.
    pub async fn delete<T: Record>(&self, record: &mut T) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        if record.is_new() {
            return Err(MapperError::NotPersisted { table });
        }

        record
            .before_delete()
            .map_err(|e| MapperError::hook("before_delete", e))?;

        tracing::debug!(table = %table, id = record.id(), "deleting document");
        let result = self
            .session
            .delete(self.namespace(), &table, record.id())
            .await?;

        if result.errors > 0 {
            return Err(MapperError::write_failed(&table, result.first_error));
        }
        if result.deleted == 0 {
            return Err(MapperError::NotFound { table });
        }

        record
            .after_delete()
            .map_err(|e| MapperError::hook("after_delete", e))?;

        Ok(())
    }

    /// Run a query and decode the result into `destination`.
    ///
    /// A `Vec` destination receives every row, a record receives the first.
    /// An empty result is `NotFound` and leaves `destination` untouched.
    pub async fn find<D: Destination>(
        &self,
        destination: &mut D,
        query: Query,
    ) -> Result<(), MapperError> {
        tracing::debug!(table = query.table_name(), many = D::MANY, "running query");
        let result = self.session.run(&query).await?;
        if result.is_nil() {
            return Err(MapperError::NotFound {
                table: query.table_name().to_string(),
            });
        }

        let rows = result.into_rows();
        *destination = if D::MANY {
            serde_json::from_value(Value::Array(rows))?
        } else {
            let first = rows.into_iter().next().unwrap_or(Value::Null);
            serde_json::from_value(first)?
        };

        Ok(())
    }

    /// Fetch a single record of type `T` by identity
    pub async fn find_by_id<T: Record + Destination>(&self, id: &str) -> Result<T, MapperError> {
        let query = self.query::<T>().get(id);
        let result = self.session.run(&query).await?;
        result
            .one::<T>()?
            .ok_or_else(|| MapperError::NotFound {
                table: query.table_name().to_string(),
            })
    }
}
