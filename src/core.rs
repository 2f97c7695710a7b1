//! Core docmapper functionality
//!
//! This module contains the `DocMapper` coordinator, which owns the
//! PostgreSQL pool and the mapper built on top of it.

use record_object::{Mapper, PgSession, Record};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::DocMapperError;
use crate::migration;
use config::{AppConfig, DatabaseConfig, MapperConfig};

/// Schema used when the mapper config names no namespace
const DEFAULT_SCHEMA: &str = "public";

/// Main coordinator that manages the database connection and the mapper
pub struct DocMapper {
    pool: PgPool,
    mapper: Mapper<PgSession>,
}

impl DocMapper {
    /// Connect to the database and build a mapper over it
    pub async fn new(
        database: DatabaseConfig,
        mapper_config: MapperConfig,
    ) -> Result<Self, DocMapperError> {
        database.validate()?;
        mapper_config.validate()?;

        let connection_string = database.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        crate::debug_log!(
            host = %database.host,
            database = %database.database,
            namespace = ?mapper_config.namespace,
            "connecting"
        );
        let pool = pool_options.connect(&connection_string).await?;

        Ok(Self::from_pool(pool, mapper_config))
    }

    /// Build a mapper over an existing pool
    pub fn from_pool(pool: PgPool, mapper_config: MapperConfig) -> Self {
        let session = Arc::new(PgSession::new(pool.clone(), DEFAULT_SCHEMA));
        let mapper = Mapper::new(session, mapper_config.namespace);
        Self { pool, mapper }
    }

    pub async fn from_config(config: AppConfig) -> Result<Self, DocMapperError> {
        Self::new(config.database, config.mapper).await
    }

    /// Connect using the configuration file (see `AppConfig::load`)
    pub async fn load() -> Result<Self, DocMapperError> {
        let config = AppConfig::load()?;
        Self::from_config(config).await
    }

    pub fn mapper(&self) -> &Mapper<PgSession> {
        &self.mapper
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), DocMapperError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Create the namespace, table and indexes for `T` as needed.
    /// If recreate is true, drops the existing table first.
    pub async fn auto_migrate<T: Record>(&self, recreate: bool) -> Result<(), DocMapperError> {
        migration::auto_migrate::<T, _>(&self.mapper, recreate).await
    }
}
