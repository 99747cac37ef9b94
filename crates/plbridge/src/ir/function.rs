//! Plain stored procedure declarations.

use crate::diagnostic::Span;
use crate::types::SemanticType;

/// A declared parameter with its resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: SemanticType,
}

/// A remote-callable function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    /// Unique key in the registry and the procedure name in the database.
    pub name: String,

    /// Parameters in declaration order.
    pub params: Vec<Param>,

    pub returns: SemanticType,

    /// The `def` statement, decorators stripped, reproduced verbatim in the
    /// procedure body.
    pub body: String,

    /// Procedural language tag, e.g. `plpython3u`.
    pub language: String,

    /// Also publish the function in the interpreter-wide `GD` dictionary.
    pub global: bool,

    pub span: Span,
}
