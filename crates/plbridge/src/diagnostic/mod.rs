//! Diagnostic types for error reporting.

mod error;
mod span;

pub use error::BridgeError;
pub use span::Span;
