//! Convenience re-exports for common docmapper usage
//!
//! This prelude module re-exports the most commonly used items, so a single
//! use statement is enough to define records and run the mapper.
//!
//! # Example
//!
//! ```rust
//! use docmapper::prelude::*;
//!
//! // Now you have access to all the common docmapper types and traits
//! ```

// Core docmapper components
pub use crate::core::DocMapper;
pub use crate::errors::DocMapperError;
pub use crate::migration::{self, auto_migrate};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, MapperConfig};

// Re-export commonly used record-object types for convenience
pub use record_object::prelude::*;
pub use record_object::Record;

// Re-export record_object module for macro-generated code
pub use record_object;

// Re-export record derive for model creation
pub use record_derive::{Record, model};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
