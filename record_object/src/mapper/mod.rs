//! The document mapper
//!
//! `Mapper` wraps a session and an optional namespace and exposes the record
//! lifecycle (insert, update, delete, find) and schema pass-throughs.

pub mod core;
pub mod record_ops;
pub mod schema_ops;

#[cfg(test)]
mod tests;

pub use self::core::Mapper;
