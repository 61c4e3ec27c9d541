//! Output sinks bound to a [`TokenPrinter`](super::TokenPrinter)
//!
//! Sinks receive finished lines. Write failures are remembered rather than
//! returned so replay callbacks stay infallible; the printer surfaces them
//! from `finish()`.

use super::PrintError;
use crate::lexical::LexicalAnalyzer;
use crate::tokens::TokenStream;
use std::io::{self, Write};

pub trait Sink {
    /// Append one line; the sink adds the terminator
    fn write_line(&mut self, line: &str);

    fn lines_written(&self) -> usize;

    /// First deferred failure, if any
    fn take_error(&mut self) -> Option<PrintError> {
        None
    }
}

/// Newline-terminated text written to any `io::Write`
pub struct TextSink<W: Write> {
    writer: W,
    lines: usize,
    bytes: usize,
    error: Option<io::Error>,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines: 0,
            bytes: 0,
            error: None,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes
    }

    /// Flush and hand back the writer
    pub fn into_inner(mut self) -> Result<W, PrintError> {
        if let Some(source) = self.error.take() {
            return Err(PrintError::Io { source });
        }
        self.writer
            .flush()
            .map_err(|source| PrintError::Io { source })?;
        Ok(self.writer)
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn write_line(&mut self, line: &str) {
        if self.error.is_some() {
            return;
        }
        match writeln!(self.writer, "{}", line) {
            Ok(()) => {
                self.lines += 1;
                self.bytes += line.len() + 1;
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn lines_written(&self) -> usize {
        self.lines
    }

    fn take_error(&mut self) -> Option<PrintError> {
        if self.error.is_none() {
            if let Err(e) = self.writer.flush() {
                self.error = Some(e);
            }
        }
        self.error.take().map(|source| PrintError::Io { source })
    }
}

/// In-memory text
#[derive(Debug, Default)]
pub struct StringSink {
    buffer: String,
    lines: usize,
}

impl StringSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl Sink for StringSink {
    fn write_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.lines += 1;
    }

    fn lines_written(&self) -> usize {
        self.lines
    }
}

/// Collects text and re-lexes it into a stream for the next pass
#[derive(Debug, Default)]
pub struct TokenSink {
    inner: StringSink,
}

impl TokenSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        self.inner.as_str()
    }

    pub fn into_token_stream(self) -> Result<TokenStream, PrintError> {
        let stream = LexicalAnalyzer::new().tokenize(self.inner.into_string())?;
        Ok(stream)
    }
}

impl Sink for TokenSink {
    fn write_line(&mut self, line: &str) {
        self.inner.write_line(line);
    }

    fn lines_written(&self) -> usize {
        self.inner.lines_written()
    }
}
