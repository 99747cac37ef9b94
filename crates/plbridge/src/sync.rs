//! Sync engine.
//!
//! One catalog read, then one create-or-replace batch per changed unit.
//! Units are independent: a failing unit is recorded and the rest still
//! run. Nothing is ever dropped for lack of a declaration; stale procedures
//! are left to the operator.

use crate::backend::Backend;
use crate::catalog::{diff, Action, SyncPlan};
use crate::codegen::{compile_all, CompileContext, UnitKind};
use crate::diagnostic::BridgeError;
use crate::registry::Registry;

/// Outcome of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub replaced: Vec<String>,
    pub unchanged: Vec<String>,
    /// Trigger units installed or already current.
    pub triggers: usize,
    /// Units whose DDL the database rejected, with the reason.
    pub failures: Vec<(String, String)>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of catalog mutations performed.
    pub fn mutations(&self) -> usize {
        self.created.len() + self.replaced.len()
    }
}

/// Compiles the registry and diffs it against the catalog without
/// executing anything.
///
/// Compile errors are returned before the database is touched.
pub fn plan<B: Backend>(registry: &Registry, backend: &mut B, ctx: &CompileContext) -> Result<SyncPlan, BridgeError> {
    let units = compile_all(registry, ctx)?;
    let catalog = backend.fetch_catalog(&ctx.language)?;
    Ok(diff(units, &catalog))
}

/// Brings the catalog in line with the registry.
pub fn sync<B: Backend>(registry: &Registry, backend: &mut B, ctx: &CompileContext) -> Result<SyncReport, BridgeError> {
    let plan = plan(registry, backend, ctx)?;
    Ok(execute(&plan, backend))
}

/// Executes a computed plan.
pub fn execute<B: Backend>(plan: &SyncPlan, backend: &mut B) -> SyncReport {
    let mut report = SyncReport::default();

    for entry in &plan.entries {
        let name = entry.unit.name.clone();
        let outcome = match &entry.action {
            Action::Unchanged => {
                tracing::debug!(name = %name, "unchanged");
                Ok(())
            }
            _ => backend.execute(entry),
        };

        match outcome {
            Ok(()) => {
                match entry.action {
                    Action::Create => report.created.push(name.clone()),
                    Action::Replace(_) => report.replaced.push(name.clone()),
                    Action::Unchanged => report.unchanged.push(name.clone()),
                }
                if entry.unit.kind == UnitKind::Trigger {
                    report.triggers += 1;
                }
                if entry.action != Action::Unchanged {
                    tracing::info!(name = %name, action = entry.action.label(), "installed");
                }
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "install failed");
                report.failures.push((name, e.message().to_string()));
            }
        }
    }

    tracing::info!(
        created = report.created.len(),
        replaced = report.replaced.len(),
        unchanged = report.unchanged.len(),
        triggers = report.triggers,
        failed = report.failures.len(),
        "sync finished"
    );
    report
}
