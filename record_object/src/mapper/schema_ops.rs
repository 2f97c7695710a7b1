//! Table and index management for record types

use super::core::Mapper;
use crate::errors::MapperError;
use crate::session::Session;
use crate::traits::Record;
use crate::validation::ValidatedIndexName;

impl<S: Session + ?Sized> Mapper<S> {
    /// Create `T`'s table. Fails if it already exists.
    pub async fn create_table<T: Record>(&self) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        tracing::debug!(table = %table, namespace = ?self.namespace, "creating table");
        self.session.table_create(self.namespace(), &table).await?;
        Ok(())
    }

    /// Drop `T`'s table with all its documents
    pub async fn drop_table<T: Record>(&self) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        tracing::debug!(table = %table, namespace = ?self.namespace, "dropping table");
        self.session.table_drop(self.namespace(), &table).await?;
        Ok(())
    }

    /// Create a secondary index on `T`'s table over the field `name`
    pub async fn index_create<T: Record>(&self, name: &str) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        let index = validate_index(name)?;
        tracing::debug!(table = %table, index, "creating index");
        self.session
            .index_create(self.namespace(), &table, index)
            .await?;
        Ok(())
    }

    pub async fn index_drop<T: Record>(&self, name: &str) -> Result<(), MapperError> {
        let table = self.resolve_table::<T>()?;
        let index = validate_index(name)?;
        tracing::debug!(table = %table, index, "dropping index");
        self.session
            .index_drop(self.namespace(), &table, index)
            .await?;
        Ok(())
    }

    /// Tables in this mapper's namespace
    pub async fn table_list(&self) -> Result<Vec<String>, MapperError> {
        Ok(self.session.table_list(self.namespace()).await?)
    }

    /// Indexes on `T`'s table
    pub async fn index_list<T: Record>(&self) -> Result<Vec<String>, MapperError> {
        let table = self.resolve_table::<T>()?;
        Ok(self.session.index_list(self.namespace(), &table).await?)
    }
}

fn validate_index(name: &str) -> Result<&str, MapperError> {
    ValidatedIndexName::new(name)
        .map_err(|e| MapperError::InvalidArgument(format!("index name is invalid: {}", e)))?;
    Ok(name)
}
