//! Declaration registry.
//!
//! Holds the normalized specs of one process, keyed by name, in the order
//! they were first declared. Functions and triggers live in separate maps
//! but share one namespace, since both become a procedure of that name.
//! Re-declaring a name replaces the earlier spec unless the registry is
//! strict.

use indexmap::IndexMap;

use crate::diagnostic::BridgeError;
use crate::ir::{FunctionSpec, TriggerSpec};
use crate::signature::Spec;

#[derive(Debug, Default)]
pub struct Registry {
    functions: IndexMap<String, FunctionSpec>,
    triggers: IndexMap<String, TriggerSpec>,
    strict: bool,
}

impl Registry {
    /// A registry where the last declaration of a name wins.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that rejects a name already declared in either kind.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn add_function(&mut self, spec: FunctionSpec) -> Result<(), BridgeError> {
        self.check_duplicate(&spec.name)?;
        if let Some(previous) = self.functions.get(&spec.name) {
            tracing::debug!(name = %spec.name, previous = %previous.span, "function re-declared");
        }
        if let Some(previous) = self.triggers.shift_remove(&spec.name) {
            tracing::debug!(name = %spec.name, previous = %previous.span, "trigger re-declared as function");
        }
        self.functions.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn add_trigger(&mut self, spec: TriggerSpec) -> Result<(), BridgeError> {
        self.check_duplicate(&spec.name)?;
        if let Some(previous) = self.triggers.get(&spec.name) {
            tracing::debug!(name = %spec.name, previous = %previous.span, "trigger re-declared");
        }
        if let Some(previous) = self.functions.shift_remove(&spec.name) {
            tracing::debug!(name = %spec.name, previous = %previous.span, "function re-declared as trigger");
        }
        self.triggers.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn add(&mut self, spec: Spec) -> Result<(), BridgeError> {
        match spec {
            Spec::Function(f) => self.add_function(f),
            Spec::Trigger(t) => self.add_trigger(t),
        }
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn all_triggers(&self) -> impl Iterator<Item = &TriggerSpec> {
        self.triggers.values()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn trigger(&self, name: &str) -> Option<&TriggerSpec> {
        self.triggers.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.triggers.is_empty()
    }

    fn check_duplicate(&self, name: &str) -> Result<(), BridgeError> {
        let taken = self.functions.contains_key(name) || self.triggers.contains_key(name);
        if self.strict && taken {
            return Err(BridgeError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
