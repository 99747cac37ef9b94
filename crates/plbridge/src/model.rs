//! Model-layer collaborator.
//!
//! Triggers may be declared against an entity model instead of a raw table.
//! The model layer knows which table backs a model and how to address the
//! model class from inside the embedded interpreter.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::ir::ModelMeta;

/// Resolves model references to storage metadata.
pub trait ModelResolver {
    /// Returns `None` when the model is unknown.
    fn resolve(&self, model: &str) -> Option<ModelMeta>;
}

/// One `[models.<Name>]` entry of the configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    pub table: String,
    pub app_label: String,
}

/// Models declared in configuration, keyed by class name.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ModelTable {
    entries: BTreeMap<String, ModelEntry>,
}

impl ModelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a model.
    pub fn insert(&mut self, name: &str, table: &str, app_label: &str) {
        self.entries.insert(
            name.to_string(),
            ModelEntry {
                table: table.to_string(),
                app_label: app_label.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModelResolver for ModelTable {
    fn resolve(&self, model: &str) -> Option<ModelMeta> {
        // `books.Book` is accepted as well as `Book`
        let object_name = model.rsplit('.').next().unwrap_or(model);
        self.entries.get(object_name).map(|entry| ModelMeta {
            object_name: object_name.to_string(),
            app_label: entry.app_label.clone(),
            db_table: entry.table.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_class_name() {
        let mut models = ModelTable::new();
        models.insert("Book", "books_book", "books");

        let meta = models.resolve("Book").unwrap();
        assert_eq!(meta.db_table, "books_book");
        assert_eq!(meta.app_label, "books");
        assert_eq!(models.resolve("books.Book"), Some(meta));
        assert!(models.resolve("Author").is_none());
    }
}
