//! Immutable token stream over an owned VRML source
//!
//! Random access by token index, numeric and string decoding, and the
//! per-line accessors used by the printer's verbatim fast path. Token
//! indices are stable for the lifetime of a stream; every rewrite pass
//! produces a new stream.

use super::token::{Token, TokenKind};
use crate::utils::Span;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    source: String,
    tokens: Vec<Token>,
    /// Byte offset of the first character of each line
    line_starts: Vec<usize>,
}

impl TokenStream {
    /// Build a stream from source text and tokens lexed from it
    pub fn from_parts(source: String, tokens: Vec<Token>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        // A trailing newline does not open another line
        if line_starts.len() > 1 && line_starts.last() == Some(&source.len()) {
            line_starts.pop();
        }

        Self {
            source,
            tokens,
            line_starts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    pub fn span(&self, index: usize) -> Option<Span> {
        self.tokens.get(index).map(|t| t.span)
    }

    /// Raw text of a token, empty when out of range
    pub fn text(&self, index: usize) -> &str {
        self.tokens
            .get(index)
            .map(|t| t.span.slice(&self.source))
            .unwrap_or("")
    }

    /// Index of the following token, if any
    pub fn next_token(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        (next < self.tokens.len()).then_some(next)
    }

    /// Next token that is not a comment
    pub fn next_significant(&self, index: usize) -> Option<usize> {
        (index + 1..self.tokens.len()).find(|&i| self.tokens[i].kind.is_significant())
    }

    pub fn is_line_break(&self, index: usize) -> bool {
        self.tokens
            .get(index)
            .map(|t| t.line_break_before)
            .unwrap_or(false)
    }

    /// Exact text comparison
    pub fn same_as(&self, index: usize, literal: &str) -> bool {
        index < self.tokens.len() && self.text(index) == literal
    }

    pub fn line_number(&self, index: usize) -> Option<u32> {
        self.tokens.get(index).map(|t| t.line())
    }

    /// Whether the token text contains `ch`
    pub fn has_char(&self, index: usize, ch: char) -> bool {
        self.text(index).contains(ch)
    }

    // === NUMERIC DECODING ===

    /// Integer value of a number token (decimal or `0x` hex)
    pub fn int_value(&self, index: usize) -> Option<i64> {
        if self.kind(index) != Some(TokenKind::Number) {
            return None;
        }
        parse_int(self.text(index))
    }

    pub fn float_value(&self, index: usize) -> Option<f64> {
        if self.kind(index) != Some(TokenKind::Number) {
            return None;
        }
        let text = self.text(index);
        parse_int(text)
            .map(|v| v as f64)
            .or_else(|| text.parse::<f64>().ok())
    }

    /// Number token written with a decimal point or exponent
    pub fn is_float(&self, index: usize) -> bool {
        if self.kind(index) != Some(TokenKind::Number) {
            return false;
        }
        let text = self.text(index);
        !is_hex(text) && text.contains(['.', 'e', 'E'])
    }

    // === STRING DECODING ===

    /// Unquoted, unescaped value of a string token
    ///
    /// Continuation tokens decode to their own line's share of the string.
    pub fn string_value(&self, index: usize) -> Option<String> {
        let kind = self.kind(index)?;
        if !kind.is_string() {
            return None;
        }
        let text = self.text(index);
        let body = match kind {
            TokenKind::QuotedString => text.strip_prefix('"').unwrap_or(text),
            _ => text,
        };
        let body = body.strip_suffix('"').unwrap_or(body);

        let mut value = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    value.push(escaped);
                }
            } else {
                value.push(ch);
            }
        }
        Some(value)
    }

    // === LINE ACCESS ===

    pub fn line_count(&self) -> usize {
        if self.source.is_empty() {
            0
        } else {
            self.line_starts.len()
        }
    }

    /// Text of a 1-based line without its terminator
    pub fn line_at(&self, line: u32) -> &str {
        let Some(idx) = (line as usize).checked_sub(1) else {
            return "";
        };
        let Some(&start) = self.line_starts.get(idx) else {
            return "";
        };
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.source.len());
        let raw = self.source.get(start..end).unwrap_or("");
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        raw.strip_suffix('\r').unwrap_or(raw)
    }

    /// Line text with leading whitespace removed
    pub fn nospace_line_at(&self, line: u32) -> &str {
        self.line_at(line).trim_start_matches([' ', '\t'])
    }

    /// Leading whitespace of a line
    pub fn indent_at(&self, line: u32) -> &str {
        let full = self.line_at(line);
        let rest = full.trim_start_matches([' ', '\t']);
        &full[..full.len() - rest.len()]
    }

    /// No earlier token shares this token's first line
    pub fn starts_line(&self, index: usize) -> bool {
        match index {
            0 => !self.tokens.is_empty(),
            i if i < self.tokens.len() => {
                self.tokens[i].line() > self.tokens[i - 1].end_line()
            }
            _ => false,
        }
    }

    /// No later token shares this token's last line
    pub fn ends_line(&self, index: usize) -> bool {
        match self.tokens.get(index) {
            Some(token) => self
                .tokens
                .get(index + 1)
                .map(|next| next.line() > token.end_line())
                .unwrap_or(true),
            None => false,
        }
    }

    /// Whether `[first, last]` covers complete source lines
    pub fn covers_whole_lines(&self, first: usize, last: usize) -> bool {
        first <= last && self.starts_line(first) && self.ends_line(last)
    }

    // === PROFILE ===

    /// Count of tokens per kind
    pub fn kind_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for token in &self.tokens {
            *counts.entry(token.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

fn is_hex(text: &str) -> bool {
    let digits = text.trim_start_matches(['-', '+']);
    digits.starts_with("0x") || digits.starts_with("0X")
}

fn parse_int(text: &str) -> Option<i64> {
    if is_hex(text) {
        let negative = text.starts_with('-');
        let digits = text.trim_start_matches(['-', '+']);
        let value = i64::from_str_radix(&digits[2..], 16).ok()?;
        return Some(if negative { -value } else { value });
    }
    text.strip_prefix('+').unwrap_or(text).parse::<i64>().ok()
}
