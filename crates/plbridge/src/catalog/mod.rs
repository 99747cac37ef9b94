//! The database's procedure catalog, as seen by the sync engine.
//!
//! Entries are fetched read-only and compared against compiled units. The
//! same types describe what a compiled unit expects the catalog to hold
//! after installation, so comparison is plain equality.

pub mod diff;

pub use diff::{diff, Action, Change, PlannedUnit, SyncPlan};

use crate::ir::{TriggerEvent, TriggerTiming};

// pg_trigger.tgtype bits
const TRIGGER_TYPE_ROW: i16 = 1 << 0;
const TRIGGER_TYPE_BEFORE: i16 = 1 << 1;
const TRIGGER_TYPE_INSERT: i16 = 1 << 2;
const TRIGGER_TYPE_DELETE: i16 = 1 << 3;
const TRIGGER_TYPE_UPDATE: i16 = 1 << 4;
const TRIGGER_TYPE_TRUNCATE: i16 = 1 << 5;
const TRIGGER_TYPE_INSTEAD: i16 = 1 << 6;

/// A stored procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFunction {
    pub name: String,
    /// Identity arguments as the catalog spells them, e.g.
    /// `a integer, b character varying`. Empty for no arguments.
    pub arguments: String,
    /// Result type as the catalog spells it, e.g. `integer` or `trigger`.
    pub result: String,
    /// Procedure source: the text between the dollar quotes.
    pub source: String,
}

impl CatalogFunction {
    /// `name(arguments)`, the form `DROP FUNCTION` accepts.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.arguments)
    }
}

/// Timing and event of a row-level trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerBinding {
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
}

impl TriggerBinding {
    /// Decodes `pg_trigger.tgtype`. Returns `None` for shapes this tool never
    /// generates: statement-level, `INSTEAD OF`, `TRUNCATE` or multi-event.
    pub fn from_tgtype(tgtype: i16) -> Option<Self> {
        if tgtype & TRIGGER_TYPE_ROW == 0 || tgtype & (TRIGGER_TYPE_INSTEAD | TRIGGER_TYPE_TRUNCATE) != 0 {
            return None;
        }
        let timing = if tgtype & TRIGGER_TYPE_BEFORE != 0 {
            TriggerTiming::Before
        } else {
            TriggerTiming::After
        };
        let events = tgtype & (TRIGGER_TYPE_INSERT | TRIGGER_TYPE_DELETE | TRIGGER_TYPE_UPDATE);
        let event = match events {
            TRIGGER_TYPE_INSERT => TriggerEvent::Insert,
            TRIGGER_TYPE_DELETE => TriggerEvent::Delete,
            TRIGGER_TYPE_UPDATE => TriggerEvent::Update,
            _ => return None,
        };
        Some(Self { timing, event })
    }

    pub fn to_tgtype(self) -> i16 {
        let mut bits = TRIGGER_TYPE_ROW;
        if self.timing == TriggerTiming::Before {
            bits |= TRIGGER_TYPE_BEFORE;
        }
        bits |= match self.event {
            TriggerEvent::Insert => TRIGGER_TYPE_INSERT,
            TriggerEvent::Delete => TRIGGER_TYPE_DELETE,
            TriggerEvent::Update => TRIGGER_TYPE_UPDATE,
        };
        bits
    }
}

/// A trigger bound to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrigger {
    pub name: String,
    /// Unqualified table name.
    pub table: String,
    /// Name of the trigger function.
    pub function: String,
    /// `None` when the trigger has a shape this tool does not generate.
    pub binding: Option<TriggerBinding>,
}

/// Snapshot of the procedures and triggers currently installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub functions: Vec<CatalogFunction>,
    pub triggers: Vec<CatalogTrigger>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a procedure by name and identity arguments.
    pub fn function(&self, name: &str, arguments: &str) -> Option<&CatalogFunction> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.arguments == arguments)
    }

    /// Every procedure with the given name, whatever its arguments.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CatalogFunction> + 'a {
        self.functions.iter().filter(move |f| f.name == name)
    }

    /// Looks up a trigger by name on a (possibly schema-qualified) table.
    pub fn trigger(&self, name: &str, table: &str) -> Option<&CatalogTrigger> {
        let table = unqualified(table);
        self.triggers.iter().find(|t| t.name == name && t.table == table)
    }

    /// Inserts or replaces a procedure with the same name and arguments.
    pub fn upsert_function(&mut self, function: CatalogFunction) {
        match self
            .functions
            .iter_mut()
            .find(|f| f.name == function.name && f.arguments == function.arguments)
        {
            Some(existing) => *existing = function,
            None => self.functions.push(function),
        }
    }

    /// Inserts or replaces a trigger with the same name on the same table.
    pub fn upsert_trigger(&mut self, trigger: CatalogTrigger) {
        match self
            .triggers
            .iter_mut()
            .find(|t| t.name == trigger.name && t.table == trigger.table)
        {
            Some(existing) => *existing = trigger,
            None => self.triggers.push(trigger),
        }
    }

    /// Removes a procedure. Only used to mirror `DROP FUNCTION` issued
    /// ahead of a result-type change.
    pub fn remove_function(&mut self, name: &str, arguments: &str) {
        self.functions.retain(|f| !(f.name == name && f.arguments == arguments));
    }
}

/// Strips a schema qualifier: `public.books_book` becomes `books_book`.
pub fn unqualified(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}
