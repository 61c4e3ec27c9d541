//! Line-accumulating token printer
//!
//! Plain mode keeps source line breaks and each line's original leading
//! whitespace. Pretty mode re-indents by nesting depth and adds the
//! field-aware breaks from [`LineBreaker`]. Both modes canonicalize number
//! tokens, join tokens with a single space, and soft-wrap at
//! `max_line_length`.

use super::line_break::{BreakRule, LineBreaker};
use super::number::{canonicalize, format_at_resolution, format_significant};
use super::{PrintError, PrintOptions, Sink};
use crate::config::compile_time::printer::WRAP_SLACK;
use crate::tokens::{Token, TokenKind, TokenStream};
use std::borrow::Cow;

pub struct TokenPrinter<'a> {
    stream: &'a TokenStream,
    sink: &'a mut dyn Sink,
    options: PrintOptions,
    pretty: bool,
    line: String,
    has_content: bool,
    /// Next token joins the line without a separating space
    glue_next: bool,
    indent: String,
    depth: usize,
    breaker: LineBreaker,
    break_pending: bool,
    lines: usize,
}

impl<'a> TokenPrinter<'a> {
    pub fn new(stream: &'a TokenStream, sink: &'a mut dyn Sink, options: PrintOptions) -> Self {
        let pretty = options.pretty_print;
        Self {
            stream,
            sink,
            options,
            pretty,
            line: String::new(),
            has_content: false,
            glue_next: false,
            indent: String::new(),
            depth: 0,
            breaker: LineBreaker::new(),
            break_pending: false,
            lines: 0,
        }
    }

    pub fn stream(&self) -> &'a TokenStream {
        self.stream
    }

    pub fn options(&self) -> &PrintOptions {
        &self.options
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Lines handed to the sink so far
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Switch to indentation tracking and field-aware line breaks
    pub fn enable_pretty_print(&mut self) {
        self.pretty = true;
    }

    /// Print one source token
    pub fn print_token(&mut self, index: usize) {
        let Some(token) = self.stream.get(index).copied() else {
            return;
        };
        if token.kind == TokenKind::Comment && self.options.strip_comments {
            return;
        }

        if self.pretty {
            self.print_pretty(index, &token);
        } else {
            self.print_plain(index, &token);
        }
    }

    fn print_plain(&mut self, index: usize, token: &Token) {
        if self.stream.starts_line(index) || token.line_break_before {
            self.flush();
        }
        if !self.has_content {
            let indent = if token.kind == TokenKind::QuotedStringContinuation {
                String::new()
            } else {
                self.stream.indent_at(token.line()).to_string()
            };
            self.begin_line(&indent);
        }

        self.track_depth_before(token.kind);
        let text = self.canonical_text(index, token.kind);
        self.append(&text);
        self.track_depth_after(token.kind);

        if token.kind == TokenKind::Comment {
            self.flush();
        }
    }

    fn print_pretty(&mut self, index: usize, token: &Token) {
        let text = self.canonical_text(index, token.kind);
        let rule_before = self.breaker.rule();
        let decision = self
            .breaker
            .observe(token.kind, &text, self.stream.int_value(index));

        if token.kind.is_close()
            || decision.before
            || self.break_pending
            || (token.line_break_before && !rule_before.is_numeric())
            || token.kind == TokenKind::QuotedStringContinuation
        {
            self.flush();
        }
        self.break_pending = false;
        self.track_depth_before(token.kind);

        if !self.has_content && token.kind != TokenKind::QuotedStringContinuation {
            let indent = self.depth_indent();
            self.begin_line(&indent);
        }
        self.append(&text);
        self.track_depth_after(token.kind);

        if token.kind == TokenKind::Comment || token.kind.is_string() {
            self.flush();
        } else if decision.after {
            self.number_break(self.breaker.rule());
        }
    }

    fn number_break(&mut self, rule: BreakRule) {
        let max = self.options.max_line_length;
        if self.options.comma_for_number_break && (max == 0 || self.line.len() + rule.comma_slack() < max)
        {
            self.line.push(',');
            self.glue_next = true;
        } else {
            self.break_pending = true;
        }
    }

    fn track_depth_before(&mut self, kind: TokenKind) {
        if kind.is_close() {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    fn track_depth_after(&mut self, kind: TokenKind) {
        if kind.is_open() {
            self.depth += 1;
        }
    }

    fn canonical_text(&self, index: usize, kind: TokenKind) -> Cow<'a, str> {
        let text = self.stream.text(index);
        if kind == TokenKind::Number {
            canonicalize(text)
        } else {
            Cow::Borrowed(text)
        }
    }

    fn depth_indent(&self) -> String {
        " ".repeat(self.depth * self.options.indent_size)
    }

    /// Break and indent the way source token `index` was, before text that
    /// replaces it is printed
    pub fn begin_replacement(&mut self, index: usize) {
        let Some(token) = self.stream.get(index).copied() else {
            return;
        };
        if self.stream.starts_line(index) || token.line_break_before {
            self.flush();
            if !self.pretty {
                self.indent = self.stream.indent_at(token.line()).to_string();
            }
        }
    }

    /// Print generated text as one token
    pub fn print_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.break_pending {
            self.flush();
            self.break_pending = false;
        }
        if !self.has_content {
            let indent = if self.pretty {
                self.depth_indent()
            } else {
                self.indent.clone()
            };
            self.begin_line(&indent);
        }
        self.append(text);
    }

    /// Print a float rounded to `resolution` significant digits
    pub fn print_float(&mut self, value: f64, resolution: u32) {
        let text = format_significant(value, resolution);
        self.print_str(&text);
    }

    /// Print `value / 10^resolution` as a fixed-point decimal
    pub fn print_at_resolution(&mut self, value: i64, resolution: u32) {
        let text = format_at_resolution(value, resolution);
        self.print_str(&text);
    }

    /// Copy tokens `first..=last`
    ///
    /// Spans that cover whole source lines are cloned line by line when no
    /// reformatting, pretty printing, or comment stripping applies.
    pub fn print_range(&mut self, first: usize, last: usize, reformat: bool) {
        if self.stream.is_empty() || first > last || first >= self.stream.len() {
            return;
        }
        let last = last.min(self.stream.len() - 1);

        if !reformat
            && !self.pretty
            && !self.options.strip_comments
            && !self.has_content
            && self.stream.covers_whole_lines(first, last)
        {
            self.copy_lines(first, last);
        } else {
            self.filter_print(first, last);
        }
    }

    fn copy_lines(&mut self, first: usize, last: usize) {
        let (Some(first_token), Some(last_token)) = (self.stream.get(first), self.stream.get(last))
        else {
            return;
        };
        let (first_line, last_line) = (first_token.line(), last_token.end_line());

        self.flush();
        for line in first_line..=last_line {
            self.sink.write_line(self.stream.line_at(line));
            self.lines += 1;
        }
        self.indent = self.stream.indent_at(last_line).to_string();

        let stream = self.stream;
        for token in &stream.tokens()[first..=last] {
            self.track_depth_before(token.kind);
            self.track_depth_after(token.kind);
        }
    }

    /// Token-by-token copy through the current mode's rules
    pub fn filter_print(&mut self, first: usize, last: usize) {
        for index in first..=last.min(self.stream.len().saturating_sub(1)) {
            self.print_token(index);
        }
    }

    fn begin_line(&mut self, indent: &str) {
        if !self.has_content {
            self.line.clear();
            self.line.push_str(indent);
            self.indent.clear();
            self.indent.push_str(indent);
        }
    }

    fn append(&mut self, text: &str) {
        let glued = self.glue_next || text == ".";
        let mut needs_space = self.has_content && !glued;

        let limit = self.options.max_line_length.saturating_sub(WRAP_SLACK);
        if self.has_content
            && !glued
            && self.options.max_line_length > 0
            && self.line.len() + usize::from(needs_space) + text.len() > limit
        {
            let indent = if self.pretty {
                self.depth_indent()
            } else {
                self.indent.clone()
            };
            self.flush();
            self.begin_line(&indent);
            needs_space = false;
        }

        if needs_space {
            self.line.push(' ');
        }
        self.line.push_str(text);
        self.has_content = true;
        self.glue_next = text == ".";
    }

    /// Commit the accumulated line
    pub fn flush(&mut self) {
        if self.has_content {
            self.sink.write_line(&self.line);
            self.lines += 1;
        }
        self.line.clear();
        self.has_content = false;
        self.glue_next = false;
    }

    /// Flush the last line and surface any deferred sink failure
    pub fn finish(mut self) -> Result<usize, PrintError> {
        self.flush();
        match self.sink.take_error() {
            Some(error) => Err(error),
            None => Ok(self.lines),
        }
    }
}
