//! # plbridge
//!
//! Declares Python functions and data-change handlers in an application,
//! compiles them into PL/Python stored procedures and triggers, and keeps a
//! PostgreSQL catalog in sync with the declarations.
//!
//! ## Architecture
//!
//! ```text
//! Declarations (@plfunction / @pltrigger, FunctionDecl)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  Introspection: name, annotations, source
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │  Signature   │  Annotations → semantic types, model → table
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Registry   │  Specs keyed by name, last declaration wins
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Codegen    │  Specs → CREATE OR REPLACE DDL + fingerprints
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │     Sync     │  Diff against the catalog, execute what changed
//! └──────────────┘
//! ```
//!
//! The version probe runs on its own and reports whether the database's
//! interpreter matches the local one closely enough for object-relational
//! access inside triggers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plbridge::{Bridge, BridgeConfig, PostgresBackend};
//!
//! let config = BridgeConfig::load("plbridge.toml".as_ref())?;
//! let mut backend = PostgresBackend::connect(config.database_url()?)?;
//!
//! let mut bridge = Bridge::new(config);
//! bridge.load_declarations()?;
//! let report = bridge.sync(&mut backend)?;
//! println!("{} created, {} replaced", report.created.len(), report.replaced.len());
//! ```

pub mod backend;
pub mod catalog;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod frontend;
pub mod ir;
pub mod model;
pub mod probe;
pub mod registry;
pub mod signature;
pub mod sync;
pub mod types;

use std::path::Path;

pub use backend::{Backend, BackendError, MemoryBackend};
#[cfg(feature = "postgres")]
pub use backend::PostgresBackend;
pub use catalog::SyncPlan;
pub use codegen::{CompileContext, CompiledUnit};
pub use config::{BridgeConfig, EnvEmbedding};
pub use diagnostic::BridgeError;
pub use frontend::{Declaration, FunctionDecl, FunctionOptions, TriggerOptions};
pub use probe::{Verdict, VersionReport};
pub use registry::Registry;
pub use sync::SyncReport;

use probe::{FixedVersion, LocalInterpreter, PythonExecutable};
use signature::ExtractContext;

/// Ties configuration, registry and backends together.
pub struct Bridge {
    config: BridgeConfig,
    registry: Registry,
}

impl Bridge {
    /// Creates a bridge with an empty registry. The registry is strict when
    /// `[declarations] strict` is set.
    pub fn new(config: BridgeConfig) -> Self {
        let registry = if config.declarations.strict {
            Registry::strict()
        } else {
            Registry::new()
        };
        Self { config, registry }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Extracts and registers one declaration.
    pub fn declare(&mut self, declaration: Declaration) -> Result<(), BridgeError> {
        let ctx = ExtractContext {
            language: &self.config.database.language,
            models: &self.config.models,
            orm_enabled: self.config.orm.enabled,
        };
        let spec = signature::extract(&declaration, &ctx)?;
        self.registry.add(spec)
    }

    /// Loads declarations from a file or directory of Python sources.
    /// Returns how many were registered.
    pub fn load_path(&mut self, path: &Path) -> Result<usize, BridgeError> {
        let mut frontend = frontend::create_frontend("python")?;
        let declarations = frontend.parse_path(path)?;
        let count = declarations.len();
        for declaration in declarations {
            self.declare(declaration)?;
        }
        tracing::info!(path = %path.display(), count, "loaded declarations");
        Ok(count)
    }

    /// Loads every path listed under `[declarations] paths`.
    pub fn load_declarations(&mut self) -> Result<usize, BridgeError> {
        let mut total = 0;
        for path in self.config.declaration_paths() {
            total += self.load_path(&path)?;
        }
        Ok(total)
    }

    /// Compiles every registered declaration.
    pub fn compile(&self) -> Result<Vec<CompiledUnit>, BridgeError> {
        codegen::compile_all(&self.registry, &self.config.compile_context()?)
    }

    /// Computes what a sync would do, without executing it.
    pub fn plan<B: Backend>(&self, backend: &mut B) -> Result<SyncPlan, BridgeError> {
        sync::plan(&self.registry, backend, &self.config.compile_context()?)
    }

    /// Installs new and changed declarations.
    pub fn sync<B: Backend>(&self, backend: &mut B) -> Result<SyncReport, BridgeError> {
        sync::sync(&self.registry, backend, &self.config.compile_context()?)
    }

    /// Compares the local and database interpreter versions.
    pub fn check_environment<B: Backend>(&self, backend: &mut B) -> Result<VersionReport, BridgeError> {
        let local: Box<dyn LocalInterpreter> = match &self.config.runtime.local_version {
            Some(version) => Box::new(FixedVersion(version.clone())),
            None => Box::new(PythonExecutable::new(self.config.runtime.python.clone())),
        };
        probe::check(local.as_ref(), backend, &self.config.database.language)
    }
}
