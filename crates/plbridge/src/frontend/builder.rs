//! Builder front-end for declarations made in code.

use super::{Declaration, FunctionOptions, Introspect, Marker, ParamDecl, TriggerOptions};

/// An explicitly described function.
///
/// ```
/// use plbridge::frontend::FunctionDecl;
///
/// let decl = FunctionDecl::new("pl_max")
///     .param("a", "int")
///     .param("b", "int")
///     .returns("int")
///     .source("def pl_max(a, b):\n    return a if a > b else b\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FunctionDecl {
    name: String,
    params: Vec<ParamDecl>,
    returns: Option<String>,
    source: String,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an annotated parameter.
    pub fn param(mut self, name: &str, annotation: &str) -> Self {
        self.params.push(ParamDecl::new(name, Some(annotation)));
        self
    }

    /// Adds a parameter without annotation (trigger handlers).
    pub fn untyped_param(mut self, name: &str) -> Self {
        self.params.push(ParamDecl::new(name, None));
        self
    }

    pub fn returns(mut self, annotation: &str) -> Self {
        self.returns = Some(annotation.to_string());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Marks the function as a plain remote function.
    pub fn into_function(self, options: FunctionOptions) -> Declaration {
        Declaration {
            function: Box::new(self),
            marker: Marker::Function(options),
        }
    }

    /// Marks the function as a trigger handler.
    pub fn into_trigger(self, options: TriggerOptions) -> Declaration {
        Declaration {
            function: Box::new(self),
            marker: Marker::Trigger(options),
        }
    }
}

impl Introspect for FunctionDecl {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[ParamDecl] {
        &self.params
    }

    fn return_annotation(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    fn source_text(&self) -> &str {
        &self.source
    }
}
