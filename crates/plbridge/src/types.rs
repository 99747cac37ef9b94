//! Mapping from declared Python annotations to PL/Python SQL types.
//!
//! The table is closed on purpose: a declaration whose annotation is not
//! listed here fails loudly instead of being coerced to some default type.

use std::fmt;

use thiserror::Error;

/// A value type a declared procedure may accept or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Integer,
    Text,
    Boolean,
    Real,
    TextList,
    IntegerList,
    TextMap,
    /// Only valid as a return type.
    Void,
}

/// SQL-side spelling of a [`SemanticType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteType {
    /// Name used when rendering DDL.
    pub ddl: &'static str,
    /// Name the catalog reports back (`pg_get_function_arguments` and friends).
    pub catalog: &'static str,
}

/// The enumerated mapping. Every [`SemanticType`] appears exactly once.
pub const TYPE_TABLE: &[(SemanticType, RemoteType)] = &[
    (SemanticType::Integer, RemoteType { ddl: "integer", catalog: "integer" }),
    (SemanticType::Text, RemoteType { ddl: "varchar", catalog: "character varying" }),
    (SemanticType::Boolean, RemoteType { ddl: "boolean", catalog: "boolean" }),
    (SemanticType::Real, RemoteType { ddl: "real", catalog: "real" }),
    (SemanticType::TextList, RemoteType { ddl: "varchar[]", catalog: "character varying[]" }),
    (SemanticType::IntegerList, RemoteType { ddl: "int[]", catalog: "integer[]" }),
    (SemanticType::TextMap, RemoteType { ddl: "jsonb", catalog: "jsonb" }),
    (SemanticType::Void, RemoteType { ddl: "void", catalog: "void" }),
];

/// An annotation that has no entry in [`TYPE_TABLE`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported type '{annotation}'")]
pub struct UnsupportedType {
    pub annotation: String,
}

impl SemanticType {
    /// Resolves annotation text such as `int`, `List[str]` or
    /// `typing.Dict[str, str]`.
    pub fn from_annotation(annotation: &str) -> Result<Self, UnsupportedType> {
        let unsupported = || UnsupportedType {
            annotation: annotation.trim().to_string(),
        };
        let expr = TypeExpr::parse(annotation).ok_or_else(unsupported)?;

        let resolved = match (expr.name.as_str(), expr.args.as_slice()) {
            ("int", []) => Some(Self::Integer),
            ("str", []) => Some(Self::Text),
            ("bool", []) => Some(Self::Boolean),
            ("float", []) => Some(Self::Real),
            ("None", []) => Some(Self::Void),
            ("List" | "list", [inner]) if inner.is_bare("str") => Some(Self::TextList),
            ("List" | "list", [inner]) if inner.is_bare("int") => Some(Self::IntegerList),
            ("Dict" | "dict", [key, value]) if key.is_bare("str") && value.is_bare("str") => {
                Some(Self::TextMap)
            }
            _ => None,
        };
        resolved.ok_or_else(unsupported)
    }

    /// Looks the type up in [`TYPE_TABLE`]. Total over the enum.
    pub fn remote(self) -> RemoteType {
        TYPE_TABLE
            .iter()
            .find(|(semantic, _)| *semantic == self)
            .map(|(_, remote)| *remote)
            .unwrap_or(RemoteType { ddl: "void", catalog: "void" })
    }

    /// Whether the value crosses the boundary as JSON text.
    pub fn is_json(self) -> bool {
        matches!(self, Self::TextMap)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Integer => "int",
            Self::Text => "str",
            Self::Boolean => "bool",
            Self::Real => "float",
            Self::TextList => "List[str]",
            Self::IntegerList => "List[int]",
            Self::TextMap => "Dict[str, str]",
            Self::Void => "None",
        };
        f.write_str(text)
    }
}

/// Maps an annotation straight to its SQL spelling.
pub fn map(annotation: &str) -> Result<RemoteType, UnsupportedType> {
    SemanticType::from_annotation(annotation).map(SemanticType::remote)
}

/// A parsed annotation: a (possibly dotted) name with optional subscript
/// arguments, e.g. `typing.Dict[str, str]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeExpr {
    name: String,
    args: Vec<TypeExpr>,
}

impl TypeExpr {
    fn parse(text: &str) -> Option<Self> {
        let mut parser = ExprParser {
            chars: text.trim().chars().peekable(),
        };
        let expr = parser.expr()?;
        parser.skip_ws();
        match parser.chars.next() {
            None => Some(expr),
            Some(_) => None,
        }
    }

    fn is_bare(&self, name: &str) -> bool {
        self.name == name && self.args.is_empty()
    }
}

struct ExprParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl ExprParser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn expr(&mut self) -> Option<TypeExpr> {
        self.skip_ws();
        let mut dotted = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                dotted.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if dotted.is_empty() {
            return None;
        }
        let name = dotted.strip_prefix("typing.").unwrap_or(&dotted).to_string();

        let mut args = Vec::new();
        self.skip_ws();
        if self.chars.peek() == Some(&'[') {
            self.chars.next();
            loop {
                args.push(self.expr()?);
                self.skip_ws();
                match self.chars.next()? {
                    ',' => continue,
                    ']' => break,
                    _ => return None,
                }
            }
        }
        Some(TypeExpr { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_entry_is_reachable_from_an_annotation() {
        let annotations = [
            "int",
            "str",
            "bool",
            "float",
            "List[str]",
            "List[int]",
            "Dict[str, str]",
            "None",
        ];
        let mut seen: Vec<SemanticType> = annotations
            .iter()
            .map(|a| SemanticType::from_annotation(a).unwrap())
            .collect();
        seen.dedup();
        assert_eq!(seen.len(), TYPE_TABLE.len());
        for (semantic, remote) in TYPE_TABLE {
            assert!(seen.contains(semantic));
            assert_eq!(semantic.remote(), *remote);
        }
    }

    #[test]
    fn test_mapping_is_deterministic() {
        for annotation in ["int", "List[int]", "Dict[str,str]", "typing.List[str]"] {
            assert_eq!(map(annotation), map(annotation));
        }
        assert_eq!(map("int").unwrap().ddl, "integer");
        assert_eq!(map("str").unwrap().catalog, "character varying");
        assert_eq!(map("typing.Dict[ str , str ]").unwrap().ddl, "jsonb");
        assert_eq!(map("list[int]").unwrap().ddl, "int[]");
    }

    #[test]
    fn test_unknown_annotations_fail() {
        for annotation in [
            "Book",
            "Optional[int]",
            "List[List[int]]",
            "Dict[str, int]",
            "List",
            "bytes",
            "",
            "List[str",
            "int]",
        ] {
            let err = map(annotation).unwrap_err();
            assert_eq!(err.annotation, annotation.trim());
        }
    }
}
