//! Schema migration functionality
//!
//! This module provides automatic namespace, table and index creation for
//! record types, for any session.

use crate::errors::DocMapperError;
use record_object::{Mapper, Record, Session};

/// Automatically create table and indexes for a record type.
/// If recreate is true, drops the existing table (and its documents) first.
///
/// Existing tables and indexes are left alone, so running it twice is a
/// no-op the second time.
pub async fn auto_migrate<T, S>(mapper: &Mapper<S>, recreate: bool) -> Result<(), DocMapperError>
where
    T: Record,
    S: Session + ?Sized,
{
    let table_name = T::table_name();

    // Make sure the namespace exists
    if let Some(namespace) = mapper.namespace() {
        let databases = mapper.session().db_list().await?;
        if !databases.iter().any(|db| db == namespace) {
            crate::debug_log!(namespace, "creating namespace");
            mapper.session().db_create(namespace).await?;
        }
    }

    let mut exists = mapper.table_list().await?.contains(&table_name);

    // Drop table if recreate is requested
    if recreate && exists {
        crate::debug_log!(table = %table_name, "dropping table");
        mapper.drop_table::<T>().await?;
        exists = false;
    }

    if !exists {
        crate::debug_log!(table = %table_name, "creating table");
        mapper.create_table::<T>().await?;
    }

    // Create indexes
    let existing = mapper.index_list::<T>().await?;
    crate::trace_log!(table = %table_name, existing = ?existing, "existing indexes");
    for index in T::indexes() {
        if existing.iter().any(|name| name == index) {
            continue;
        }
        crate::debug_log!(table = %table_name, index, "creating index");
        mapper.index_create::<T>(index).await?;
    }

    Ok(())
}
