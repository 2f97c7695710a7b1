use crate::session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Document in '{table}' is already persisted")]
    AlreadyPersisted { table: String },

    #[error("Document in '{table}' is new and has not been persisted")]
    NotPersisted { table: String },

    #[error("Not found in '{table}'")]
    NotFound { table: String },

    #[error("Store error: {0}")]
    Store(#[from] SessionError),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Write to '{table}' failed: {message}")]
    WriteFailed { table: String, message: String },

    #[error("Store returned no generated key for insert into '{table}'")]
    MissingGeneratedKey { table: String },

    #[error("Hook '{hook}' failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl MapperError {
    pub(crate) fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Self::Hook { hook, source }
    }

    pub(crate) fn write_failed(table: &str, message: Option<String>) -> Self {
        Self::WriteFailed {
            table: table.to_string(),
            message: message.unwrap_or_else(|| "unknown error".to_string()),
        }
    }

    /// Whether this error means the document or result set was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
