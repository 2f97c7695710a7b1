//! Lifecycle hooks
//!
//! Each hook runs against the record being persisted. Before-hooks run after
//! timestamps are set and before anything is sent to the store; after-hooks
//! run once the store has acknowledged the write. An error from any hook
//! aborts the operation and is returned to the caller as
//! `MapperError::Hook`.

/// Optional callbacks around create, update and delete.
///
/// Every method defaults to a no-op. `#[derive(Record)]` emits an empty impl
/// unless the struct is marked `#[record(hooks)]`, in which case the impl is
/// written by hand:
///
/// ```ignore
/// #[model]
/// #[record(hooks)]
/// pub struct Node {
///     pub id: String,
///     pub name: String,
///     pub created_at: DateTime<Utc>,
///     pub updated_at: DateTime<Utc>,
/// }
///
/// impl LifecycleHooks for Node {
///     fn before_create(&mut self) -> anyhow::Result<()> {
///         anyhow::ensure!(!self.name.is_empty(), "name is required");
///         Ok(())
///     }
/// }
/// ```
pub trait LifecycleHooks {
    fn before_create(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_create(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn before_update(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_update(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn before_delete(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_delete(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
