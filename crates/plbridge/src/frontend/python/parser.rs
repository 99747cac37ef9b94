//! Python declaration parser using tree-sitter.

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::diagnostic::{BridgeError, Span};
use crate::frontend::{FunctionOptions, Marker, ParamDecl, TriggerOptions};

/// Marker name for plain functions.
pub const FUNCTION_MARKER: &str = "plfunction";
/// Marker name for triggers.
pub const TRIGGER_MARKER: &str = "pltrigger";

/// A module-level function carrying one of the capability markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonFunction {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub returns: Option<String>,
    /// The `def` statement through the end of its body.
    pub source: String,
    pub span: Span,
}

/// Python parser.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Creates a new Python parser.
    pub fn new() -> Result<Self, BridgeError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|_| BridgeError::ParserInitFailed)?;
        Ok(Self { parser })
    }

    /// Parses a Python source file and returns its marked functions.
    pub fn parse(
        &mut self,
        source: &str,
        path: &Path,
    ) -> Result<Vec<(PythonFunction, Marker)>, BridgeError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| BridgeError::ParseFailed { path: path.to_path_buf() })?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map_or(1, |n| n.start_position().row + 1);
            return Err(BridgeError::SyntaxError {
                file: path.to_path_buf(),
                line,
            });
        }

        let visitor = Visitor { source, path };
        let mut found = Vec::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "decorated_definition" {
                if let Some(marked) = visitor.visit_decorated(child)? {
                    found.push(marked);
                }
            }
        }
        Ok(found)
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Extracts marked functions from tree-sitter nodes.
struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
}

impl<'a> Visitor<'a> {
    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn visit_decorated(&self, node: Node) -> Result<Option<(PythonFunction, Marker)>, BridgeError> {
        let Some(definition) = node.child_by_field_name("definition") else {
            return Ok(None);
        };
        if definition.kind() != "function_definition" {
            return Ok(None);
        }
        let name = definition
            .child_by_field_name("name")
            .map(|n| self.node_text(n).to_string())
            .unwrap_or_default();

        let mut marker = None;
        let mut cursor = node.walk();
        for decorator in node.children(&mut cursor) {
            if decorator.kind() != "decorator" {
                continue;
            }
            if let Some(found) = self.visit_decorator(decorator, &name)? {
                if marker.is_some() {
                    return Err(BridgeError::InvalidDecorator {
                        function: name,
                        message: "only one of @plfunction / @pltrigger may be applied".to_string(),
                    });
                }
                marker = Some(found);
            }
        }
        let Some(marker) = marker else {
            return Ok(None);
        };

        let function = PythonFunction {
            params: self.visit_parameters(definition),
            returns: definition
                .child_by_field_name("return_type")
                .map(|n| self.node_text(n).trim().to_string()),
            source: self.node_text(definition).to_string(),
            span: Span::new(self.path.to_path_buf(), node.start_position().row + 1),
            name,
        };
        Ok(Some((function, marker)))
    }

    /// Returns the marker if the decorator is one of ours, `None` for
    /// unrelated decorators.
    fn visit_decorator(&self, node: Node, function: &str) -> Result<Option<Marker>, BridgeError> {
        let Some(expr) = node.named_child(0) else {
            return Ok(None);
        };

        let (callee, arguments) = match expr.kind() {
            "call" => (expr.child_by_field_name("function"), expr.child_by_field_name("arguments")),
            _ => (Some(expr), None),
        };
        let callee = callee.map(|n| self.node_text(n)).unwrap_or("");
        // `@plbridge.pltrigger(...)` is as good as `@pltrigger(...)`
        let marker_name = callee.rsplit('.').next().unwrap_or(callee);

        let keywords = match arguments {
            Some(args) => self.visit_keywords(args, function)?,
            None => Vec::new(),
        };

        match marker_name {
            FUNCTION_MARKER => {
                let mut options = FunctionOptions::default();
                for (key, value) in keywords {
                    match key.as_str() {
                        "global_" => {
                            options.global = match value {
                                KeywordValue::Bool(flag) => flag,
                                other => {
                                    return Err(BridgeError::InvalidDecorator {
                                        function: function.to_string(),
                                        message: format!("global_ must be True or False, got '{}'", other.text()),
                                    })
                                }
                            }
                        }
                        other => return Err(unknown_keyword(function, FUNCTION_MARKER, other)),
                    }
                }
                Ok(Some(Marker::Function(options)))
            }
            TRIGGER_MARKER => {
                if arguments.is_none() {
                    return Err(BridgeError::InvalidDecorator {
                        function: function.to_string(),
                        message: "@pltrigger needs event=, when= and table= or model=".to_string(),
                    });
                }
                let mut options = TriggerOptions::default();
                for (key, value) in keywords {
                    let text = value.text();
                    match key.as_str() {
                        "event" => options.event = text,
                        "when" => options.when = text,
                        "table" => options.table = Some(text),
                        "model" => options.model = Some(text),
                        other => return Err(unknown_keyword(function, TRIGGER_MARKER, other)),
                    }
                }
                Ok(Some(Marker::Trigger(options)))
            }
            _ => Ok(None),
        }
    }

    fn visit_keywords(
        &self,
        args: Node,
        function: &str,
    ) -> Result<Vec<(String, KeywordValue)>, BridgeError> {
        let mut keywords = Vec::new();
        let mut cursor = args.walk();
        for arg in args.named_children(&mut cursor) {
            if arg.kind() == "comment" {
                continue;
            }
            if arg.kind() != "keyword_argument" {
                return Err(BridgeError::InvalidDecorator {
                    function: function.to_string(),
                    message: format!("positional argument '{}' is not allowed", self.node_text(arg)),
                });
            }
            let key = arg
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())
                .unwrap_or_default();
            let value = arg
                .child_by_field_name("value")
                .map(|n| self.visit_value(n))
                .unwrap_or(KeywordValue::Other(String::new()));
            keywords.push((key, value));
        }
        Ok(keywords)
    }

    fn visit_value(&self, node: Node) -> KeywordValue {
        match node.kind() {
            "string" => KeywordValue::Str(unquote(self.node_text(node))),
            "true" => KeywordValue::Bool(true),
            "false" => KeywordValue::Bool(false),
            _ => KeywordValue::Other(self.node_text(node).to_string()),
        }
    }

    fn visit_parameters(&self, definition: Node) -> Vec<ParamDecl> {
        let Some(params) = definition.child_by_field_name("parameters") else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            let decl = match param.kind() {
                "identifier" => ParamDecl::new(self.node_text(param), None),
                "default_parameter" => ParamDecl::new(self.field_text(param, "name"), None),
                "typed_default_parameter" => {
                    let annotation = self.field_text(param, "type");
                    ParamDecl::new(self.field_text(param, "name"), Some(annotation.trim()))
                }
                "typed_parameter" => {
                    let annotation = self.field_text(param, "type");
                    match param.named_child(0) {
                        Some(inner) if inner.kind() == "identifier" => {
                            ParamDecl::new(self.node_text(inner), Some(annotation.trim()))
                        }
                        Some(inner) => variadic(self.node_text(inner)),
                        None => continue,
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => variadic(self.node_text(param)),
                // `*` and `/` separators carry no parameter
                _ => continue,
            };
            out.push(decl);
        }
        out
    }

    fn field_text(&self, node: Node, field: &str) -> &'a str {
        node.child_by_field_name(field)
            .map(|n| self.node_text(n))
            .unwrap_or("")
    }
}

fn variadic(text: &str) -> ParamDecl {
    ParamDecl {
        name: text.trim_start_matches('*').to_string(),
        annotation: None,
        variadic: true,
    }
}

fn unknown_keyword(function: &str, marker: &str, keyword: &str) -> BridgeError {
    BridgeError::InvalidDecorator {
        function: function.to_string(),
        message: format!("@{marker} does not accept '{keyword}='"),
    }
}

/// A decorator keyword value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeywordValue {
    Str(String),
    Bool(bool),
    /// Anything else, kept as source text (e.g. `model=Book`).
    Other(String),
}

impl KeywordValue {
    fn text(&self) -> String {
        match self {
            Self::Str(s) | Self::Other(s) => s.clone(),
            Self::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        }
    }
}

/// Strips string prefixes and quotes from a Python string literal.
fn unquote(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    body.to_string()
}
