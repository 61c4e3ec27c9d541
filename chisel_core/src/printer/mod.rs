//! Token printing: canonical numbers, pretty printing, and output sinks
//!
//! A [`TokenPrinter`] reads tokens from one [`TokenStream`](crate::tokens::TokenStream)
//! and writes finished lines to a [`Sink`]. Replay copies unreplaced spans
//! through it and transforms print their replacement text through it.

pub mod line_break;
pub mod number;
pub mod sink;
pub mod token_printer;

use crate::config::compile_time::printer::{DEFAULT_INDENT_SIZE, DEFAULT_MAX_LINE_LENGTH};
use crate::config::runtime::PrinterPreferences;
use crate::lexical::LexerError;
use crate::logging::codes;

pub use line_break::{BreakDecision, BreakRule, LineBreaker};
pub use number::{canonicalize, format_at_resolution, format_significant, NumberParts};
pub use sink::{Sink, StringSink, TextSink, TokenSink};
pub use token_printer::TokenPrinter;

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("Output write failed: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("Printed output does not re-tokenize: {0}")]
    Relex(#[from] LexerError),
}

impl PrintError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            PrintError::Io { .. } => codes::printer::SINK_IO_FAILURE,
            PrintError::Relex(_) => codes::printer::RELEX_FAILURE,
        }
    }
}

/// Formatting options for one printer, passed explicitly per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// Spaces per nesting level in pretty mode; 0 disables indentation
    pub indent_size: usize,
    /// Soft wrap column; 0 disables wrapping
    pub max_line_length: usize,
    pub strip_comments: bool,
    pub comma_for_number_break: bool,
    /// Start the printer in pretty mode
    pub pretty_print: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            indent_size: DEFAULT_INDENT_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            strip_comments: false,
            comma_for_number_break: false,
            pretty_print: false,
        }
    }
}

impl From<&PrinterPreferences> for PrintOptions {
    fn from(prefs: &PrinterPreferences) -> Self {
        Self {
            indent_size: prefs.indent_size,
            max_line_length: prefs.max_line_length,
            strip_comments: prefs.strip_comments,
            comma_for_number_break: prefs.comma_for_number_break,
            pretty_print: prefs.pretty_print,
        }
    }
}
