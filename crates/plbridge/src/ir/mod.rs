//! Normalized declarations.
//!
//! Specs are produced by the signature extractor, stored in the registry and
//! read by the compiler. They are never mutated after creation; a new
//! declaration under the same name replaces the old spec wholesale.

mod function;
mod trigger;

pub use function::{FunctionSpec, Param};
pub use trigger::{ModelMeta, TriggerEvent, TriggerSpec, TriggerTarget, TriggerTiming};

/// Language tag of the embedded interpreter procedures are written for.
pub const DEFAULT_LANGUAGE: &str = "plpython3u";

/// Checks that `name` is a lowercase SQL identifier.
///
/// The catalog folds unquoted names to lowercase, and PL/Python exposes
/// arguments under their folded names, so anything else would never compare
/// equal to what the database stores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Like [`is_identifier`] but allows a schema qualifier (`public.books_book`).
pub fn is_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|p| is_identifier(p))
}
