//! Procedure compiler: specs to PL/Python DDL.
//!
//! Every spec compiles to one [`CompiledUnit`]: the DDL that installs it and
//! the catalog entries the database will hold once that DDL has run. The
//! sync engine diffs the latter against the live catalog.
//!
//! Declared bodies are copied verbatim. They run inside the database's own
//! interpreter, so nothing the declaring process imported or captured is
//! visible to them unless the remote runtime provisions it independently.

mod builtins;
mod function;
mod orm;
pub mod python;
mod trigger;

pub use builtins::{pl_enable_orm, pl_python_version, ENABLE_ORM, PYTHON_VERSION};
pub use function::compile_function;
pub use trigger::compile_trigger;

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{CatalogFunction, CatalogTrigger};
use crate::diagnostic::BridgeError;
use crate::ir::DEFAULT_LANGUAGE;
use crate::registry::Registry;

/// Common prologue of every generated procedure.
const PRELUDE: &str = "from typing import Dict, List\nimport json\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Function,
    Trigger,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => f.write_str("function"),
            Self::Trigger => f.write_str("trigger"),
        }
    }
}

/// DDL for one declaration plus what it leaves in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub name: String,
    pub kind: UnitKind,
    pub ddl: String,
    /// The procedure as the catalog will report it.
    pub fingerprint: CatalogFunction,
    /// The trigger as the catalog will report it, for trigger units.
    pub binding: Option<CatalogTrigger>,
}

impl CompiledUnit {
    pub fn drop_statement(&self) -> String {
        format!("DROP FUNCTION IF EXISTS {}", self.fingerprint.signature())
    }
}

/// Settings for object-relational trigger prologues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrmRuntime {
    /// Interpreter search paths appended inside the database.
    pub env_paths: Vec<String>,
    pub project_path: Option<String>,
    pub settings_module: Option<String>,
    /// Environment snapshot written into trigger bodies as a literal.
    pub extra_env: BTreeMap<String, String>,
}

/// Compiler inputs that do not come from the specs themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileContext {
    pub language: String,
    /// `None` disables object-relational prologues.
    pub orm: Option<OrmRuntime>,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            orm: None,
        }
    }
}

/// Compiles every declaration in the registry.
///
/// Units come out in a stable order: built-in helpers, then functions, then
/// triggers, each in declaration order. When any trigger needs
/// object-relational access, `pl_enable_orm` is included unless the registry
/// already declares it.
pub fn compile_all(registry: &Registry, ctx: &CompileContext) -> Result<Vec<CompiledUnit>, BridgeError> {
    let mut units = Vec::new();

    let needs_orm = registry.all_triggers().any(|t| t.uses_orm());
    if needs_orm && registry.function(ENABLE_ORM).is_none() {
        units.push(compile_function(&pl_enable_orm(&ctx.language)?));
    }

    for spec in registry.all_functions() {
        units.push(compile_function(spec));
    }
    for spec in registry.all_triggers() {
        units.push(compile_trigger(spec, ctx)?);
    }

    tracing::debug!(count = units.len(), "compiled units");
    Ok(units)
}

/// Wraps a procedure source in its dollar quotes.
fn quoted(source: &str) -> String {
    let tag = python::dollar_tag(source);
    format!("{tag}{source}{tag}")
}
