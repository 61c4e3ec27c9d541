//! Token definitions for VRML source text

use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token classification
///
/// Whitespace (including the VRML comma) never becomes a token; the
/// `line_break_before` flag on [`Token`] carries the only layout
/// information the printer needs besides the source lines themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Number,
    QuotedString,
    /// A later line of a string literal that spans several source lines
    QuotedStringContinuation,
    Comment,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Keyword1,
    Identifier,
    Other,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::QuotedString => "string",
            TokenKind::QuotedStringContinuation => "string-continuation",
            TokenKind::Comment => "comment",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Keyword1 => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::Other => "other",
        }
    }

    /// Opening `[` or `{`
    pub fn is_open(&self) -> bool {
        matches!(self, TokenKind::LeftBracket | TokenKind::LeftBrace)
    }

    /// Closing `]` or `}`
    pub fn is_close(&self) -> bool {
        matches!(self, TokenKind::RightBracket | TokenKind::RightBrace)
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            TokenKind::QuotedString | TokenKind::QuotedStringContinuation
        )
    }

    /// Tokens the scene builder looks at (everything except comments)
    pub fn is_significant(&self) -> bool {
        !matches!(self, TokenKind::Comment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reserved words of VRML97 lexed as [`TokenKind::Keyword1`]
pub const KEYWORDS: &[&str] = &[
    "DEF",
    "USE",
    "PROTO",
    "EXTERNPROTO",
    "ROUTE",
    "TO",
    "IS",
    "NULL",
    "TRUE",
    "FALSE",
    "field",
    "exposedField",
    "eventIn",
    "eventOut",
];

/// Classify a word as keyword or identifier
pub fn classify_word(word: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword1
    } else {
        TokenKind::Identifier
    }
}

/// Interface declaration keywords (`field`, `exposedField`, `eventIn`, `eventOut`)
pub fn is_interface_keyword(word: &str) -> bool {
    matches!(word, "field" | "exposedField" | "eventIn" | "eventOut")
}

/// A single lexed token
///
/// The token text is not stored here; [`TokenStream`](super::TokenStream)
/// slices it out of the owned source on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub kind: TokenKind,
    pub span: Span,
    /// True when a newline separates this token from the previous one
    pub line_break_before: bool,
}

impl Token {
    pub fn new(index: usize, kind: TokenKind, span: Span, line_break_before: bool) -> Self {
        Self {
            index,
            kind,
            span,
            line_break_before,
        }
    }

    /// 1-based line of the first byte
    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    /// 1-based line of the last byte
    pub fn end_line(&self) -> u32 {
        self.span.end.line
    }

    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} at {}", self.index, self.kind, self.span)
    }
}
