//! In-process backend.
//!
//! Executing a unit writes the unit's catalog fingerprint instead of
//! interpreting its DDL, so the catalog afterwards is exactly what the
//! database would report.

use std::collections::HashMap;

use super::{Backend, BackendError};
use crate::catalog::{Catalog, CatalogFunction, CatalogTrigger, PlannedUnit};
use crate::codegen::PYTHON_VERSION;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    catalog: Catalog,
    executed: Vec<String>,
    failures: HashMap<String, String>,
    remote_version: Option<String>,
    catalog_error: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Version reported by `pl_python_version()`.
    pub fn with_remote_version(mut self, version: &str) -> Self {
        self.remote_version = Some(version.to_string());
        self
    }

    pub fn seed_function(&mut self, function: CatalogFunction) {
        self.catalog.upsert_function(function);
    }

    pub fn seed_trigger(&mut self, trigger: CatalogTrigger) {
        self.catalog.upsert_trigger(trigger);
    }

    /// Makes executing the unit named `name` fail with `message`.
    pub fn fail_on(&mut self, name: &str, message: &str) {
        self.failures.insert(name.to_string(), message.to_string());
    }

    /// Makes every catalog fetch fail, as an unreachable database would.
    pub fn fail_catalog(&mut self, message: &str) {
        self.catalog_error = Some(message.to_string());
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Statements executed so far, one entry per unit.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl Backend for MemoryBackend {
    fn fetch_catalog(&mut self, _language: &str) -> Result<Catalog, BackendError> {
        match &self.catalog_error {
            Some(message) => Err(BackendError::Catalog(message.clone())),
            None => Ok(self.catalog.clone()),
        }
    }

    fn execute(&mut self, planned: &PlannedUnit) -> Result<(), BackendError> {
        let unit = &planned.unit;
        if let Some(message) = self.failures.get(&unit.name) {
            return Err(BackendError::Execute {
                unit: unit.name.clone(),
                message: message.clone(),
            });
        }

        if planned.action.requires_drop() {
            self.catalog
                .remove_function(&unit.fingerprint.name, &unit.fingerprint.arguments);
        }
        self.catalog.upsert_function(unit.fingerprint.clone());
        if let Some(binding) = &unit.binding {
            self.catalog.upsert_trigger(binding.clone());
        }
        self.executed.push(planned.statements());
        Ok(())
    }

    fn query_text(&mut self, sql: &str) -> Result<String, BackendError> {
        let probe = format!("select {PYTHON_VERSION}()");
        if !sql.trim().eq_ignore_ascii_case(&probe) {
            return Err(BackendError::Query(format!("unsupported query: {sql}")));
        }
        if self.catalog.function(PYTHON_VERSION, "").is_none() {
            return Err(BackendError::Query(format!(
                "function {PYTHON_VERSION}() does not exist"
            )));
        }
        self.remote_version
            .clone()
            .ok_or_else(|| BackendError::Query("language \"plpython3u\" does not exist".to_string()))
    }
}
