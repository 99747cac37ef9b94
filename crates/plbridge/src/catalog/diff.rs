//! Diff of compiled units against the installed catalog.
//!
//! Each unit is classified as:
//!
//! - **Create**: no procedure with that name and those arguments exists
//! - **Replace**: it exists but its source, result type or trigger binding
//!   differs
//! - **Unchanged**: the catalog already holds exactly what the unit installs
//!
//! Catalog entries without a matching unit are never touched.

use super::Catalog;
use crate::codegen::CompiledUnit;

/// Why a unit is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Procedure source differs.
    Source,

    /// Result type differs. The database refuses to change it in place,
    /// so the old procedure is dropped first.
    Result { old: String, new: String },

    /// The trigger is missing, or bound differently.
    Binding,
}

/// What the sync engine will do with a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Replace(Vec<Change>),
    Unchanged,
}

impl Action {
    /// Whether executing the unit must be preceded by `DROP FUNCTION`.
    pub fn requires_drop(&self) -> bool {
        match self {
            Action::Replace(changes) => changes.iter().any(|c| matches!(c, Change::Result { .. })),
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Replace(_) => "replace",
            Action::Unchanged => "unchanged",
        }
    }
}

/// A compiled unit with its classification.
#[derive(Debug, Clone)]
pub struct PlannedUnit {
    pub unit: CompiledUnit,
    pub action: Action,
}

impl PlannedUnit {
    /// SQL to execute for this unit; empty when unchanged.
    pub fn statements(&self) -> String {
        match &self.action {
            Action::Unchanged => String::new(),
            action if action.requires_drop() => {
                format!("{};\n{}", self.unit.drop_statement(), self.unit.ddl)
            }
            _ => self.unit.ddl.clone(),
        }
    }

    /// One-line description for display.
    pub fn describe(&self) -> String {
        let mut line = format!("{} {} {}", self.action.label(), self.unit.kind, self.unit.name);
        if let Action::Replace(changes) = &self.action {
            let reasons: Vec<String> = changes
                .iter()
                .map(|c| match c {
                    Change::Source => "source changed".to_string(),
                    Change::Result { old, new } => format!("result {old} -> {new}"),
                    Change::Binding => "trigger binding changed".to_string(),
                })
                .collect();
            line.push_str(&format!(" ({})", reasons.join(", ")));
        }
        line
    }
}

/// The outcome of a diff, in unit order. Discarded after execution.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub entries: Vec<PlannedUnit>,
}

impl SyncPlan {
    pub fn creates(&self) -> impl Iterator<Item = &PlannedUnit> {
        self.entries.iter().filter(|e| e.action == Action::Create)
    }

    pub fn replaces(&self) -> impl Iterator<Item = &PlannedUnit> {
        self.entries
            .iter()
            .filter(|e| matches!(e.action, Action::Replace(_)))
    }

    pub fn unchanged(&self) -> impl Iterator<Item = &PlannedUnit> {
        self.entries.iter().filter(|e| e.action == Action::Unchanged)
    }

    /// Units that need DDL executed.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedUnit> {
        self.entries.iter().filter(|e| e.action != Action::Unchanged)
    }

    pub fn is_noop(&self) -> bool {
        self.pending().next().is_none()
    }
}

/// Classifies every unit against `catalog`.
pub fn diff(units: Vec<CompiledUnit>, catalog: &Catalog) -> SyncPlan {
    let entries = units
        .into_iter()
        .map(|unit| {
            let action = classify(&unit, catalog);
            tracing::debug!(name = %unit.name, action = action.label(), "classified");
            PlannedUnit { unit, action }
        })
        .collect();
    SyncPlan { entries }
}

fn classify(unit: &CompiledUnit, catalog: &Catalog) -> Action {
    let expected = &unit.fingerprint;
    let Some(installed) = catalog.function(&expected.name, &expected.arguments) else {
        for other in catalog.overloads(&expected.name) {
            tracing::info!(
                name = %expected.name,
                arguments = %other.arguments,
                "leaving other overload in place"
            );
        }
        return Action::Create;
    };

    let mut changes = Vec::new();
    if installed.result != expected.result {
        changes.push(Change::Result {
            old: installed.result.clone(),
            new: expected.result.clone(),
        });
    }
    if installed.source != expected.source {
        changes.push(Change::Source);
    }
    if let Some(binding) = &unit.binding {
        if catalog.trigger(&binding.name, &binding.table) != Some(binding) {
            changes.push(Change::Binding);
        }
    }

    if changes.is_empty() {
        Action::Unchanged
    } else {
        Action::Replace(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogFunction, CatalogTrigger, TriggerBinding};
    use crate::codegen::UnitKind;
    use crate::ir::{TriggerEvent, TriggerTiming};

    fn function_unit(source: &str, result: &str) -> CompiledUnit {
        CompiledUnit {
            name: "f".to_string(),
            kind: UnitKind::Function,
            ddl: format!("CREATE OR REPLACE FUNCTION f(a integer) RETURNS {result} AS $${source}$$ LANGUAGE plpython3u"),
            fingerprint: CatalogFunction {
                name: "f".to_string(),
                arguments: "a integer".to_string(),
                result: result.to_string(),
                source: source.to_string(),
            },
            binding: None,
        }
    }

    fn trigger_unit(event: TriggerEvent) -> CompiledUnit {
        CompiledUnit {
            name: "t".to_string(),
            kind: UnitKind::Trigger,
            ddl: "BEGIN; ... COMMIT;".to_string(),
            fingerprint: CatalogFunction {
                name: "t".to_string(),
                arguments: String::new(),
                result: "trigger".to_string(),
                source: "body".to_string(),
            },
            binding: Some(CatalogTrigger {
                name: "t_trigger".to_string(),
                table: "books_book".to_string(),
                function: "t".to_string(),
                binding: Some(TriggerBinding {
                    timing: TriggerTiming::Before,
                    event,
                }),
            }),
        }
    }

    fn installed(unit: &CompiledUnit) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.upsert_function(unit.fingerprint.clone());
        if let Some(binding) = &unit.binding {
            catalog.upsert_trigger(binding.clone());
        }
        catalog
    }

    #[test]
    fn test_missing_is_created() {
        let plan = diff(vec![function_unit("v1", "integer")], &Catalog::new());
        assert_eq!(plan.creates().count(), 1);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_identical_is_unchanged() {
        let unit = function_unit("v1", "integer");
        let catalog = installed(&unit);
        let plan = diff(vec![unit], &catalog);
        assert_eq!(plan.unchanged().count(), 1);
        assert!(plan.is_noop());
        assert_eq!(plan.entries[0].statements(), "");
    }

    #[test]
    fn test_source_change_is_replaced_without_drop() {
        let catalog = installed(&function_unit("v1", "integer"));
        let plan = diff(vec![function_unit("v2", "integer")], &catalog);
        let entry = &plan.entries[0];
        assert_eq!(entry.action, Action::Replace(vec![Change::Source]));
        assert!(!entry.action.requires_drop());
        assert!(entry.statements().starts_with("CREATE OR REPLACE"));
    }

    #[test]
    fn test_result_change_drops_first() {
        let catalog = installed(&function_unit("v1", "integer"));
        let plan = diff(vec![function_unit("v1", "character varying")], &catalog);
        let entry = &plan.entries[0];
        assert!(entry.action.requires_drop());
        assert!(entry.statements().starts_with("DROP FUNCTION IF EXISTS f(a integer);\n"));
        assert!(entry.describe().contains("result integer -> character varying"));
    }

    #[test]
    fn test_other_overload_does_not_count() {
        let mut catalog = Catalog::new();
        catalog.upsert_function(CatalogFunction {
            name: "f".to_string(),
            arguments: "a character varying".to_string(),
            result: "integer".to_string(),
            source: "v1".to_string(),
        });
        let plan = diff(vec![function_unit("v1", "integer")], &catalog);
        assert_eq!(plan.creates().count(), 1);
    }

    #[test]
    fn test_trigger_binding_change_is_replaced() {
        let catalog = installed(&trigger_unit(TriggerEvent::Insert));
        let plan = diff(vec![trigger_unit(TriggerEvent::Update)], &catalog);
        assert_eq!(plan.entries[0].action, Action::Replace(vec![Change::Binding]));

        let plan = diff(vec![trigger_unit(TriggerEvent::Insert)], &catalog);
        assert_eq!(plan.entries[0].action, Action::Unchanged);
    }

    #[test]
    fn test_dropped_trigger_is_reinstalled() {
        let unit = trigger_unit(TriggerEvent::Insert);
        let mut catalog = installed(&unit);
        catalog.triggers.clear();
        let plan = diff(vec![unit], &catalog);
        assert_eq!(plan.replaces().count(), 1);
    }
}
