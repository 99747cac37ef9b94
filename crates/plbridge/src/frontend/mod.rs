//! Declaration front-ends.
//!
//! A front-end turns some surface syntax into [`Declaration`]s: a function
//! that can be introspected (name, annotated parameters, return annotation,
//! literal source) plus the options given by its capability marker.
//!
//! Two front-ends exist:
//! - [`FunctionDecl`], a builder for declarations made in Rust code
//! - [`python::PythonFrontend`], which reads `@plfunction` / `@pltrigger`
//!   decorated functions out of `.py` files

mod builder;
pub mod python;

pub use builder::FunctionDecl;

use std::path::Path;

use crate::diagnostic::{BridgeError, Span};

/// A parameter as written, before type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    /// Annotation text, e.g. `List[str]`. `None` when unannotated.
    pub annotation: Option<String>,
    /// `*args` / `**kwargs`.
    pub variadic: bool,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, annotation: Option<&str>) -> Self {
        Self {
            name: name.into(),
            annotation: annotation.map(str::to_string),
            variadic: false,
        }
    }
}

/// What the signature extractor needs to know about a declared function.
pub trait Introspect {
    /// Function name as declared.
    fn name(&self) -> &str;

    /// Parameters in declaration order.
    fn parameters(&self) -> &[ParamDecl];

    /// Return annotation text, if any.
    fn return_annotation(&self) -> Option<&str>;

    /// Literal source text of the function definition, without decorators.
    fn source_text(&self) -> &str;

    /// Where the declaration came from.
    fn span(&self) -> Span {
        Span::builder()
    }
}

/// Options of the plain function marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionOptions {
    /// Publish the function in `GD` for use by other procedures.
    pub global: bool,
}

/// Options of the trigger marker, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerOptions {
    pub event: String,
    pub when: String,
    pub table: Option<String>,
    pub model: Option<String>,
}

impl TriggerOptions {
    /// Trigger bound to a raw table.
    pub fn table(event: &str, when: &str, table: &str) -> Self {
        Self {
            event: event.to_string(),
            when: when.to_string(),
            table: Some(table.to_string()),
            model: None,
        }
    }

    /// Trigger bound to an entity model.
    pub fn model(event: &str, when: &str, model: &str) -> Self {
        Self {
            event: event.to_string(),
            when: when.to_string(),
            table: None,
            model: Some(model.to_string()),
        }
    }
}

/// Which marker was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Function(FunctionOptions),
    Trigger(TriggerOptions),
}

/// A function together with the marker applied to it.
pub struct Declaration {
    pub function: Box<dyn Introspect>,
    pub marker: Marker,
}

impl std::fmt::Debug for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.function.name())
            .field("marker", &self.marker)
            .finish()
    }
}

/// Trait for declaration front-ends.
pub trait Frontend {
    /// Returns the language name (e.g. "python").
    fn language(&self) -> &str;

    /// Returns file extensions this front-end handles.
    fn extensions(&self) -> &[&str];

    /// Parses a file, or every matching file below a directory.
    fn parse_path(&mut self, path: &Path) -> Result<Vec<Declaration>, BridgeError>;
}

/// Creates a front-end for the given declaration language.
pub fn create_frontend(language: &str) -> Result<Box<dyn Frontend>, BridgeError> {
    match language {
        "python" | "py" | "plpython3u" => Ok(Box::new(python::PythonFrontend::new()?)),
        _ => Err(BridgeError::ConfigInvalid {
            path: "plbridge.toml".into(),
            message: format!("no declaration front-end for language '{language}'"),
        }),
    }
}
