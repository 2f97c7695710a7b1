use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database '{0}' does not exist")]
    DatabaseNotFound(String),

    #[error("Database '{0}' already exists")]
    DatabaseExists(String),

    #[error("Table '{db}.{table}' does not exist")]
    TableNotFound { db: String, table: String },

    #[error("Table '{db}.{table}' already exists")]
    TableExists { db: String, table: String },

    #[error("Index '{index}' on table '{table}' does not exist")]
    IndexNotFound { table: String, index: String },

    #[error("Index '{index}' on table '{table}' already exists")]
    IndexExists { table: String, index: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl SessionError {
    pub(crate) fn table_not_found(db: &str, table: &str) -> Self {
        Self::TableNotFound {
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    pub(crate) fn table_exists(db: &str, table: &str) -> Self {
        Self::TableExists {
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    pub(crate) fn index_not_found(table: &str, index: &str) -> Self {
        Self::IndexNotFound {
            table: table.to_string(),
            index: index.to_string(),
        }
    }

    pub(crate) fn index_exists(table: &str, index: &str) -> Self {
        Self::IndexExists {
            table: table.to_string(),
            index: index.to_string(),
        }
    }
}
