//! Signature extraction: introspected declarations to normalized specs.
//!
//! Partial inference is not allowed. Every function parameter and the
//! return value must carry an annotation that resolves through the type
//! table, because the SQL signature of the procedure has to be unambiguous.

use crate::diagnostic::BridgeError;
use crate::frontend::{Declaration, FunctionOptions, Introspect, Marker, TriggerOptions};
use crate::ir::{
    is_identifier, is_table_name, FunctionSpec, Param, TriggerEvent, TriggerSpec, TriggerTarget,
    TriggerTiming,
};
use crate::model::ModelResolver;
use crate::types::SemanticType;

/// Handler parameters of a trigger bound to a raw table.
const PLAIN_HANDLER_ARITY: usize = 2;
/// Handler parameters of a trigger with object-relational access.
const ORM_HANDLER_ARITY: usize = 4;

/// Everything extraction needs besides the declaration itself.
pub struct ExtractContext<'a> {
    /// Procedural language tag written into specs.
    pub language: &'a str,
    /// Resolves `model=` references.
    pub models: &'a dyn ModelResolver,
    /// When false, model-bound triggers are installed on the model's table
    /// as plain triggers.
    pub orm_enabled: bool,
}

/// A normalized declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    Function(FunctionSpec),
    Trigger(TriggerSpec),
}

impl Spec {
    pub fn name(&self) -> &str {
        match self {
            Self::Function(f) => &f.name,
            Self::Trigger(t) => &t.name,
        }
    }
}

/// Extracts whichever spec the declaration's marker asks for.
pub fn extract(declaration: &Declaration, ctx: &ExtractContext<'_>) -> Result<Spec, BridgeError> {
    let function = declaration.function.as_ref();
    match &declaration.marker {
        Marker::Function(options) => {
            extract_function(function, options, ctx.language).map(Spec::Function)
        }
        Marker::Trigger(options) => extract_trigger(function, options, ctx).map(Spec::Trigger),
    }
}

/// Produces a [`FunctionSpec`] with every type resolved.
pub fn extract_function(
    function: &dyn Introspect,
    options: &FunctionOptions,
    language: &str,
) -> Result<FunctionSpec, BridgeError> {
    let name = function.name();
    check_name(name)?;
    let body = check_source(function)?;

    let mut params = Vec::with_capacity(function.parameters().len());
    for param in function.parameters() {
        if param.variadic {
            return Err(BridgeError::UnsupportedParameter {
                function: name.to_string(),
                parameter: param.name.clone(),
                reason: "variadic parameters have no SQL equivalent".to_string(),
            });
        }
        if !is_identifier(&param.name) {
            return Err(BridgeError::InvalidIdentifier {
                kind: "parameter",
                name: param.name.clone(),
            });
        }
        let annotation = param
            .annotation
            .as_deref()
            .ok_or_else(|| BridgeError::IncompleteAnnotation {
                function: name.to_string(),
                parameter: Some(param.name.clone()),
            })?;
        let ty = resolve(name, Some(&param.name), annotation)?;
        if ty == SemanticType::Void {
            return Err(BridgeError::UnsupportedType {
                function: name.to_string(),
                parameter: Some(param.name.clone()),
                annotation: annotation.to_string(),
            });
        }
        params.push(Param {
            name: param.name.clone(),
            ty,
        });
    }

    let returns = function
        .return_annotation()
        .ok_or_else(|| BridgeError::IncompleteAnnotation {
            function: name.to_string(),
            parameter: None,
        })?;
    let returns = resolve(name, None, returns)?;

    Ok(FunctionSpec {
        name: name.to_string(),
        params,
        returns,
        body,
        language: language.to_string(),
        global: options.global,
        span: function.span(),
    })
}

/// Produces a [`TriggerSpec`], resolving the target table through the model
/// layer when the trigger is declared against a model.
pub fn extract_trigger(
    function: &dyn Introspect,
    options: &TriggerOptions,
    ctx: &ExtractContext<'_>,
) -> Result<TriggerSpec, BridgeError> {
    let name = function.name();
    check_name(name)?;
    let body = check_source(function)?;

    let event: TriggerEvent = options
        .event
        .parse()
        .map_err(|reason: String| BridgeError::invalid_trigger(name, reason))?;
    let timing: TriggerTiming = options
        .when
        .parse()
        .map_err(|reason: String| BridgeError::invalid_trigger(name, reason))?;

    let target = match (&options.table, &options.model) {
        (Some(_), Some(_)) => {
            return Err(BridgeError::invalid_trigger(name, "table and model are mutually exclusive"));
        }
        (None, None) => {
            return Err(BridgeError::invalid_trigger(name, "either table or model must be set"));
        }
        (Some(table), None) => TriggerTarget::Table(table.clone()),
        (None, Some(model)) => {
            let meta = ctx.models.resolve(model).ok_or_else(|| BridgeError::UnknownModel {
                trigger: name.to_string(),
                model: model.clone(),
            })?;
            if ctx.orm_enabled {
                TriggerTarget::Model(meta)
            } else {
                TriggerTarget::Table(meta.db_table)
            }
        }
    };
    if !is_table_name(target.table()) {
        return Err(BridgeError::InvalidIdentifier {
            kind: "table",
            name: target.table().to_string(),
        });
    }

    let expected = match target {
        TriggerTarget::Table(_) => PLAIN_HANDLER_ARITY,
        TriggerTarget::Model(_) => ORM_HANDLER_ARITY,
    };
    let params = function.parameters();
    if params.len() != expected || params.iter().any(|p| p.variadic) {
        let shape = if expected == ORM_HANDLER_ARITY {
            "(new, old, td, plpy)"
        } else {
            "(td, plpy)"
        };
        return Err(BridgeError::invalid_trigger(
            name,
            format!("handler must take exactly {shape}, found {} parameter(s)", params.len()),
        ));
    }

    // The database ignores a handler's return value; declaring one is a mistake
    if let Some(annotation) = function.return_annotation() {
        if SemanticType::from_annotation(annotation) != Ok(SemanticType::Void) {
            return Err(BridgeError::invalid_trigger(
                name,
                format!("trigger handlers cannot return a value (annotated '{annotation}')"),
            ));
        }
    }

    Ok(TriggerSpec {
        name: name.to_string(),
        handler_params: params.iter().map(|p| p.name.clone()).collect(),
        body,
        language: ctx.language.to_string(),
        event,
        timing,
        target,
        span: function.span(),
    })
}

fn resolve(function: &str, parameter: Option<&str>, annotation: &str) -> Result<SemanticType, BridgeError> {
    SemanticType::from_annotation(annotation).map_err(|e| BridgeError::UnsupportedType {
        function: function.to_string(),
        parameter: parameter.map(str::to_string),
        annotation: e.annotation,
    })
}

fn check_name(name: &str) -> Result<(), BridgeError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(BridgeError::InvalidIdentifier {
            kind: "function",
            name: name.to_string(),
        })
    }
}

fn check_source(function: &dyn Introspect) -> Result<String, BridgeError> {
    let source = function.source_text();
    if source.trim().is_empty() {
        return Err(BridgeError::MissingSource {
            function: function.name().to_string(),
        });
    }
    Ok(source.to_string())
}
