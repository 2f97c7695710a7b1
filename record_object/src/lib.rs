//! Record Object - Core document mapping layer for docmapper
//!
//! This crate provides the record capability traits, table naming, the query
//! builder, the session contract with its in-memory and PostgreSQL
//! implementations, and the `Mapper` that ties them together.

pub mod errors;
pub mod mapper;
pub mod naming;
pub mod prelude;
pub mod query;
pub mod session;
pub mod traits;
pub mod validation;

pub use errors::MapperError;
pub use mapper::Mapper;
pub use naming::table_name_for;
pub use query::{Query, QueryFilter, QueryOperator, SortOrder};
pub use session::{
    Document, MemorySession, PgSession, QueryResult, Session, SessionError, WriteResult,
    PRIMARY_KEY,
};
pub use traits::*;
pub use validation::{ValidatedIndexName, ValidatedTableName, ValidationError};

// Used by code generated from `record_derive`
pub use chrono;
