//! Convenience re-exports for common record-object usage

// Core traits
pub use crate::traits::{Destination, LifecycleHooks, Record};

// Error types
pub use crate::errors::MapperError;

// The mapper
pub use crate::mapper::Mapper;

// Sessions
pub use crate::session::{
    Document, MemorySession, PgSession, QueryResult, Session, SessionError, WriteResult,
};

// Validation
pub use crate::validation::{ValidatedIndexName, ValidatedTableName, ValidationError};

// Query building
pub use crate::query::{Query, QueryFilter, QueryOperator, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use sqlx::PgPool;
