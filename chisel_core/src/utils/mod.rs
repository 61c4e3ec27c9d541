//! Shared primitive types used by the lexer, scene builder and diagnostics.

pub mod span;

pub use span::{Position, Span};
