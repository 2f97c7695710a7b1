use crate::errors::MapperError;
use crate::query::Query;
use crate::session::Session;
use crate::traits::Record;
use crate::validation::ValidatedTableName;
use std::sync::Arc;

/// Maps records onto tables of a session
pub struct Mapper<S: Session + ?Sized> {
    pub(crate) session: Arc<S>,
    pub(crate) namespace: Option<String>,
}

impl<S: Session + ?Sized> Clone for Mapper<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            namespace: self.namespace.clone(),
        }
    }
}

impl<S: Session + ?Sized> std::fmt::Debug for Mapper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("namespace", &self.namespace)
            .field("default_db", &self.session.default_db())
            .finish()
    }
}

impl<S: Session + ?Sized> Mapper<S> {
    /// Wrap a session. `namespace` selects the database every record
    /// operation targets; `None` uses the session default.
    pub fn new(session: Arc<S>, namespace: Option<String>) -> Self {
        Self { session, namespace }
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Whether the record has not been persisted yet
    pub fn is_new<T: Record>(&self, record: &T) -> bool {
        record.is_new()
    }

    /// A query over `T`'s table in this mapper's namespace
    pub fn query<T: Record>(&self) -> Query {
        let query = Query::table(T::table_name());
        match &self.namespace {
            Some(namespace) => query.in_db(namespace.clone()),
            None => query,
        }
    }

    /// Resolve and validate `T`'s table name
    pub(crate) fn resolve_table<T: Record>(&self) -> Result<String, MapperError> {
        let table = T::table_name();
        ValidatedTableName::new(&table).map_err(|e| {
            MapperError::InvalidArgument(format!(
                "table name for {} is invalid: {}",
                T::type_name(),
                e
            ))
        })?;
        Ok(table)
    }
}
