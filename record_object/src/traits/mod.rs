//! Traits for document mapping
//!
//! This module contains the capability traits a record type implements to be
//! handled by the `Mapper`.

pub mod destination;
pub mod hooks;
pub mod record;

// Re-export all public items for convenience
pub use destination::Destination;
pub use hooks::LifecycleHooks;
pub use record::Record;
