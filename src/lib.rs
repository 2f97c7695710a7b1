//! # docmapper
//!
//! A minimal object-document mapper: typed records map to JSON documents in
//! tables named after the pluralized record type, with `created_at` /
//! `updated_at` bookkeeping and optional lifecycle hooks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmapper::prelude::*;
//!
//! #[model]
//! pub struct Node {
//!     pub id: String,
//!
//!     #[index]
//!     pub name: String,
//!
//!     pub created_at: DateTime<Utc>,
//!     pub updated_at: DateTime<Utc>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "docmapper".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let docmapper = DocMapper::new(config, MapperConfig::new(Some("rem_test".to_string()))).await?;
//!     docmapper.auto_migrate::<Node>(false).await?;
//!
//!     let mapper = docmapper.mapper();
//!     let mut node = Node { name: "test".to_string(), ..Node::default() };
//!     mapper.insert(&mut node).await?;
//!
//!     let found: Node = mapper.find_by_id(&node.id).await?;
//!     println!("Found node: {}", found.name);
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod migration;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::DocMapper;
pub use errors::DocMapperError;
pub use migration::auto_migrate;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, MapperConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use record_derive;
pub use record_object;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
