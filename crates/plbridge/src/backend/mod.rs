//! Database access.
//!
//! The sync engine and the version probe only talk to the database through
//! [`Backend`]. [`PostgresBackend`] is the real thing; [`MemoryBackend`]
//! keeps an in-process catalog for tests and dry runs.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryBackend;
#[cfg(feature = "postgres")]
pub use self::postgres::PostgresBackend;

use thiserror::Error;

use crate::catalog::{Catalog, PlannedUnit};

/// Errors reported by a backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Could not connect to the database: {0}")]
    Connect(String),

    #[error("Could not read the procedure catalog: {0}")]
    Catalog(String),

    #[error("Installing '{unit}' failed: {message}")]
    Execute { unit: String, message: String },

    #[error("Query failed: {0}")]
    Query(String),
}

impl BackendError {
    /// The message without the leading context, for per-unit reports.
    pub fn message(&self) -> &str {
        match self {
            Self::Connect(message) | Self::Catalog(message) | Self::Query(message) => message,
            Self::Execute { message, .. } => message,
        }
    }
}

/// A database holding stored procedures.
pub trait Backend {
    /// Reads the procedures written in `language` that are visible on the
    /// search path, and every user trigger.
    fn fetch_catalog(&mut self, language: &str) -> Result<Catalog, BackendError>;

    /// Runs the statements of one planned unit.
    fn execute(&mut self, planned: &PlannedUnit) -> Result<(), BackendError>;

    /// Runs a query returning a single text value.
    fn query_text(&mut self, sql: &str) -> Result<String, BackendError>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn fetch_catalog(&mut self, language: &str) -> Result<Catalog, BackendError> {
        (**self).fetch_catalog(language)
    }

    fn execute(&mut self, planned: &PlannedUnit) -> Result<(), BackendError> {
        (**self).execute(planned)
    }

    fn query_text(&mut self, sql: &str) -> Result<String, BackendError> {
        (**self).query_text(sql)
    }
}
