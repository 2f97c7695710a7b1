//! Error types for the docmapper crate
//!
//! This module contains the error type returned by the coordinator and the
//! migration helpers.

use config::ConfigError;
use record_object::{MapperError, SessionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocMapperError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mapper error: {0}")]
    Mapper(#[from] MapperError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}
