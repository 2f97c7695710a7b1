//! Trait definitions
//!
//! This module defines the record capability trait.

use super::hooks::LifecycleHooks;
use crate::naming;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// A typed document stored in a table.
///
/// The identity is a string that is empty until the store assigns one; it
/// must serialize under the document key `id`. The timestamps use
/// `DateTime::default()` as the unset value.
///
/// Derive it with `#[derive(Record)]` (or the `#[model]` attribute):
///
/// ```ignore
/// #[model]
/// pub struct Node {
///     pub id: String,
///     pub name: String,
///     pub created_at: DateTime<Utc>,
///     pub updated_at: DateTime<Utc>,
/// }
///
/// assert_eq!(Node::table_name(), "nodes");
/// ```
pub trait Record: Serialize + DeserializeOwned + LifecycleHooks + Send + Sync {
    /// Simple name of the record type
    fn type_name() -> &'static str;

    /// Table the record type lives in
    fn table_name() -> String {
        naming::table_name_for(Self::type_name())
    }

    /// Secondary indexes declared on the type
    fn indexes() -> Vec<&'static str> {
        Vec::new()
    }

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn created_at(&self) -> DateTime<Utc>;

    fn set_created_at(&mut self, at: DateTime<Utc>);

    fn updated_at(&self) -> DateTime<Utc>;

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// A record is new until it has an identity
    fn is_new(&self) -> bool {
        self.id().is_empty()
    }
}
