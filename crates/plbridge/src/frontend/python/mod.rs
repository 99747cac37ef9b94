//! Python front-end: discovers decorated functions in `.py` files.

pub mod parser;

use std::path::Path;
use walkdir::WalkDir;

use crate::diagnostic::{BridgeError, Span};
use super::{Declaration, Frontend, Introspect, ParamDecl};
use parser::{PythonFunction, PythonParser};

/// Python front-end implementation.
pub struct PythonFrontend {
    parser: PythonParser,
}

impl PythonFrontend {
    /// Creates a new Python front-end.
    pub fn new() -> Result<Self, BridgeError> {
        Ok(Self {
            parser: PythonParser::new()?,
        })
    }

    /// Parses declarations out of in-memory source.
    pub fn parse_source(&mut self, source: &str, path: &Path) -> Result<Vec<Declaration>, BridgeError> {
        let found = self.parser.parse(source, path)?;
        Ok(found
            .into_iter()
            .map(|(function, marker)| Declaration {
                function: Box::new(function),
                marker,
            })
            .collect())
    }

    fn parse_file(&mut self, path: &Path) -> Result<Vec<Declaration>, BridgeError> {
        let source = std::fs::read_to_string(path).map_err(|e| BridgeError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let declarations = self.parse_source(&source, path)?;
        tracing::debug!(file = %path.display(), count = declarations.len(), "parsed declarations");
        Ok(declarations)
    }
}

impl Frontend for PythonFrontend {
    fn language(&self) -> &str {
        "python"
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse_path(&mut self, path: &Path) -> Result<Vec<Declaration>, BridgeError> {
        if path.is_file() {
            return self.parse_file(path);
        }
        if !path.exists() {
            return Err(BridgeError::io(path, "declaration path does not exist"));
        }

        // Sorted so registration order, and therefore DDL order, is stable
        let mut files = Vec::new();
        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            if !file.is_file() {
                continue;
            }
            let matches = file
                .extension()
                .is_some_and(|ext| self.extensions().contains(&ext.to_string_lossy().as_ref()));
            if matches {
                files.push(file.to_path_buf());
            }
        }

        let mut declarations = Vec::new();
        for file in files {
            declarations.extend(self.parse_file(&file)?);
        }
        Ok(declarations)
    }
}

impl Introspect for PythonFunction {
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

    fn span(&self) -> Span {
        self.span.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Marker;

    #[test]
    fn test_parse_directory_in_file_name_order() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("b.py"),
            "@plfunction\ndef second() -> int:\n    return 2\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.py"),
            "@plfunction\ndef first() -> int:\n    return 1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("nested/c.py"),
            "@pltrigger(event='DELETE', when='AFTER', table='t')\ndef third(td, plpy):\n    pass\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "@plfunction").unwrap();

        let mut frontend = PythonFrontend::new().unwrap();
        let declarations = frontend.parse_path(dir.path()).unwrap();
        let names: Vec<&str> = declarations.iter().map(|d| d.function.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(matches!(declarations[2].marker, Marker::Trigger(_)));
        assert!(declarations[0].function.span().to_string().ends_with("a.py:1"));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let mut frontend = PythonFrontend::new().unwrap();
        assert!(frontend.parse_path(Path::new("/definitely/not/here")).is_err());
    }
}
