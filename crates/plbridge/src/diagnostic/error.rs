//! Error types for declaration, compilation and synchronisation.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur while loading declarations, compiling them, or
/// talking to the database.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum BridgeError {
    // =========================================================================
    // IO / Configuration Errors
    // =========================================================================
    #[error("Failed to read '{path}': {message}")]
    #[diagnostic(code(plbridge::io::read_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    #[error("Invalid configuration in '{path}': {message}")]
    #[diagnostic(
        code(plbridge::config::invalid),
        help("See the [database], [declarations], [runtime], [orm] and [models] sections of plbridge.toml")
    )]
    ConfigInvalid {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize the Python parser")]
    #[diagnostic(code(plbridge::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(plbridge::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    #[error("Syntax error in {}:{line}", file.display())]
    #[diagnostic(
        code(plbridge::parse::syntax_error),
        help("Declaration files must be valid Python; fix the file before syncing")
    )]
    SyntaxError {
        file: PathBuf,
        line: usize,
    },

    #[error("Invalid decorator on '{function}': {message}")]
    #[diagnostic(
        code(plbridge::parse::invalid_decorator),
        help("Use @plfunction, @plfunction(global_=True) or @pltrigger(event=..., when=..., table=... | model=...)")
    )]
    InvalidDecorator {
        function: String,
        message: String,
    },

    // =========================================================================
    // Declaration Errors
    // =========================================================================
    #[error("Function '{function}' is missing a type annotation on {}", describe_slot(parameter))]
    #[diagnostic(
        code(plbridge::declare::incomplete_annotation),
        help("Every parameter and the return value must be annotated so the SQL signature is unambiguous")
    )]
    IncompleteAnnotation {
        function: String,
        /// `None` means the return value.
        parameter: Option<String>,
    },

    #[error("Function '{function}' uses unsupported type '{annotation}' on {}", describe_slot(parameter))]
    #[diagnostic(
        code(plbridge::declare::unsupported_type),
        help("Supported: int, str, bool, float, List[str], List[int], Dict[str, str], and None as a return type")
    )]
    UnsupportedType {
        function: String,
        parameter: Option<String>,
        annotation: String,
    },

    #[error("'{function}' has no source text")]
    #[diagnostic(
        code(plbridge::declare::missing_source),
        help("Declarations built in code must carry the literal `def` statement via .source(...)")
    )]
    MissingSource {
        function: String,
    },

    #[error("Parameter '{parameter}' of '{function}' is not supported: {reason}")]
    #[diagnostic(code(plbridge::declare::unsupported_parameter))]
    UnsupportedParameter {
        function: String,
        parameter: String,
        reason: String,
    },

    #[error("Invalid {kind} name '{name}'")]
    #[diagnostic(
        code(plbridge::declare::invalid_identifier),
        help("Names must be lowercase identifiers ([a-z_][a-z0-9_]*) so they match the database catalog")
    )]
    InvalidIdentifier {
        kind: &'static str,
        name: String,
    },

    #[error("Invalid trigger '{trigger}': {reason}")]
    #[diagnostic(code(plbridge::declare::invalid_trigger))]
    InvalidTrigger {
        trigger: String,
        reason: String,
    },

    #[error("Trigger '{trigger}' references unknown model '{model}'")]
    #[diagnostic(
        code(plbridge::declare::unknown_model),
        help("Declare the model under [models.<Name>] with its table and app_label")
    )]
    UnknownModel {
        trigger: String,
        model: String,
    },

    #[error("'{name}' is already declared")]
    #[diagnostic(
        code(plbridge::registry::duplicate),
        help("Strict mode rejects re-declaration; rename one of the declarations or disable [declarations] strict")
    )]
    DuplicateDeclaration {
        name: String,
    },

    // =========================================================================
    // Compilation Errors
    // =========================================================================
    #[error("Trigger '{trigger}' needs object-relational access but {missing} is not configured")]
    #[diagnostic(
        code(plbridge::compile::orm_not_configured),
        help("Set [orm] settings_module and [runtime] project_path, or bind the trigger with table= instead of model=")
    )]
    OrmNotConfigured {
        trigger: String,
        missing: &'static str,
    },

    // =========================================================================
    // Database Errors
    // =========================================================================
    #[error(transparent)]
    #[diagnostic(code(plbridge::database::error))]
    Backend(#[from] BackendError),

    // =========================================================================
    // Environment Errors
    // =========================================================================
    #[error("Could not determine the local Python version: {message}")]
    #[diagnostic(
        code(plbridge::env::local_interpreter),
        help("Set [runtime] python to the application's interpreter, or pin [runtime] local_version")
    )]
    LocalInterpreter {
        message: String,
    },
}

fn describe_slot(parameter: &Option<String>) -> String {
    match parameter {
        Some(name) => format!("parameter '{name}'"),
        None => "the return value".to_string(),
    }
}

impl BridgeError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid trigger error.
    pub fn invalid_trigger(trigger: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTrigger {
            trigger: trigger.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_annotation_names_the_slot() {
        let err = BridgeError::IncompleteAnnotation {
            function: "pl_max".to_string(),
            parameter: Some("b".to_string()),
        };
        assert!(err.to_string().contains("parameter 'b'"));

        let err = BridgeError::IncompleteAnnotation {
            function: "pl_max".to_string(),
            parameter: None,
        };
        assert!(err.to_string().contains("the return value"));
    }

    #[test]
    fn test_unsupported_type_message() {
        let err = BridgeError::UnsupportedType {
            function: "f".to_string(),
            parameter: Some("arg".to_string()),
            annotation: "Book".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'Book'"));
        assert!(msg.contains("parameter 'arg'"));
    }
}
