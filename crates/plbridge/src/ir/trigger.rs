//! Trigger declarations.

use std::fmt;
use std::str::FromStr;

use crate::diagnostic::Span;

/// Data-change event a trigger fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

/// When the trigger fires relative to the row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerTiming {
    Before,
    After,
}

impl TriggerEvent {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl TriggerTiming {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
        }
    }
}

impl FromStr for TriggerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unknown event '{other}', expected INSERT, UPDATE or DELETE")),
        }
    }
}

impl FromStr for TriggerTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Ok(Self::Before),
            "AFTER" => Ok(Self::After),
            other => Err(format!("unknown timing '{other}', expected BEFORE or AFTER")),
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Storage metadata of an entity model, as reported by the model layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMeta {
    /// Class name, e.g. `Book`.
    pub object_name: String,
    /// Application the model belongs to, e.g. `books`.
    pub app_label: String,
    /// Underlying table, e.g. `books_book`.
    pub db_table: String,
}

/// Where a trigger is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerTarget {
    /// Bound to a raw table; the handler sees only the row-delta payload.
    Table(String),
    /// Bound to a model's table; the handler also receives `new`/`old`
    /// model instances rebuilt from the row-delta payload.
    Model(ModelMeta),
}

impl TriggerTarget {
    pub fn table(&self) -> &str {
        match self {
            Self::Table(table) => table,
            Self::Model(meta) => &meta.db_table,
        }
    }

    pub fn model(&self) -> Option<&ModelMeta> {
        match self {
            Self::Table(_) => None,
            Self::Model(meta) => Some(meta),
        }
    }
}

/// A data-change handler compiled into a trigger function plus its binding.
///
/// A trigger has no SQL parameters and its handler's return value is never
/// passed back to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    /// Name of the trigger function; the trigger itself is `<name>_trigger`.
    pub name: String,

    /// Handler parameter names, as declared.
    pub handler_params: Vec<String>,

    pub body: String,

    pub language: String,

    pub event: TriggerEvent,

    pub timing: TriggerTiming,

    pub target: TriggerTarget,

    pub span: Span,
}

impl TriggerSpec {
    /// Name of the trigger object bound to the table.
    pub fn trigger_name(&self) -> String {
        format!("{}_trigger", self.name)
    }

    /// Whether the body is wrapped with the object-relational prologue.
    pub fn uses_orm(&self) -> bool {
        self.target.model().is_some()
    }

    /// Whether changes made to the new row image are written back.
    pub fn modifies_row(&self) -> bool {
        self.timing == TriggerTiming::Before && self.event != TriggerEvent::Delete
    }
}
