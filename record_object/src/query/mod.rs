//! Store-native queries
//!
//! A `Query` is built by the caller and handed to `Mapper::find` untouched;
//! each session interprets it (the memory session evaluates it directly, the
//! PostgreSQL session translates it to SQL over JSONB).

pub mod builder;
pub mod evaluate;
pub mod filter;
pub mod ordering;
pub mod sql_generation;


pub use builder::{Query, Selection};
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use ordering::SortOrder;
