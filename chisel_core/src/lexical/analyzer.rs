//! VRML lexical analyzer
//!
//! Single forward scan over the source. Whitespace and commas separate
//! tokens and are otherwise dropped; `#` runs a comment to end of line;
//! a string literal that spans lines is split into one token per line so
//! that every token lives on exactly one source line.

use crate::config::compile_time::lexical::*;
use crate::file_processor::FileProcessingResult;
use crate::logging::codes;
use crate::tokens::{classify_word, Token, TokenKind, TokenStream};
use crate::utils::{Position, Span};

/// Lexical analysis errors with compile-time security boundaries
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Unterminated string literal starting at {start}")]
    UnterminatedString { start: Position },

    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize },

    #[error("Identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH})")]
    IdentifierTooLong { length: usize },

    #[error("String too large: {size} bytes (max {MAX_STRING_SIZE})")]
    StringTooLarge { size: usize },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
            LexerError::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
        }
    }
}

/// Counters gathered while scanning
#[derive(Debug, Default, Clone)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub number_tokens: usize,
    pub string_tokens: usize,
    pub keyword_tokens: usize,
    pub identifier_tokens: usize,
    pub comment_count: usize,
    pub bracket_tokens: usize,
    pub max_string_length: usize,
    pub lines: u32,
}

impl LexicalMetrics {
    fn record_token(&mut self, kind: TokenKind) {
        self.total_tokens += 1;
        match kind {
            TokenKind::Number => self.number_tokens += 1,
            TokenKind::QuotedString | TokenKind::QuotedStringContinuation => {
                self.string_tokens += 1
            }
            TokenKind::Keyword1 => self.keyword_tokens += 1,
            TokenKind::Identifier => self.identifier_tokens += 1,
            TokenKind::Comment => self.comment_count += 1,
            TokenKind::LeftBracket
            | TokenKind::RightBracket
            | TokenKind::LeftBrace
            | TokenKind::RightBrace => self.bracket_tokens += 1,
            TokenKind::Other => {}
        }
    }
}

/// Character cursor tracking line and column
struct Cursor<'a> {
    source: &'a str,
    pos: Position,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: Position::start(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos = self.pos.advance(ch);
        Some(ch)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | ',')
}

/// First character of a VRML identifier
fn is_id_first(ch: char) -> bool {
    !(ch <= ' '
        || ch == '\u{7f}'
        || ch.is_ascii_digit()
        || matches!(
            ch,
            '"' | '#' | '\'' | '+' | ',' | '-' | '.' | '[' | '\\' | ']' | '{' | '}'
        ))
}

fn is_id_rest(ch: char) -> bool {
    is_id_first(ch) || ch.is_ascii_digit() || ch == '+' || ch == '-'
}

pub struct LexicalAnalyzer {
    metrics: LexicalMetrics,
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            metrics: LexicalMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    /// Tokenize the contents of a processed file
    pub fn tokenize_file_result(
        &mut self,
        file_result: FileProcessingResult,
    ) -> Result<TokenStream, LexerError> {
        log_debug!("Tokenizing file",
            "file" => file_result.metadata.path.display(),
            "bytes" => file_result.metadata.size);
        self.tokenize(file_result.source)
    }

    /// Tokenize owned source text into a stream
    pub fn tokenize(&mut self, source: String) -> Result<TokenStream, LexerError> {
        let start_time = std::time::Instant::now();
        self.metrics = LexicalMetrics::default();

        let tokens = self.scan(&source)?;

        self.metrics.lines = source.lines().count() as u32;
        log_success!(
            codes::success::TOKENIZATION_COMPLETE,
            "Tokenization complete",
            "tokens" => self.metrics.total_tokens,
            "lines" => self.metrics.lines,
            "comments" => self.metrics.comment_count,
            "duration_ms" => format!("{:.2}", start_time.elapsed().as_secs_f64() * 1000.0),
        );

        Ok(TokenStream::from_parts(source, tokens))
    }

    fn scan(&mut self, source: &str) -> Result<Vec<Token>, LexerError> {
        let mut cursor = Cursor::new(source);
        let mut tokens: Vec<Token> = Vec::new();
        let mut last_line: u32 = 1;

        loop {
            cursor.bump_while(is_separator);
            let Some(ch) = cursor.peek() else {
                break;
            };
            let start = cursor.pos;

            if ch == '"' {
                self.scan_string(&mut cursor, &mut tokens, &mut last_line)?;
                continue;
            }

            let kind = match ch {
                '#' => {
                    cursor.bump_while(|c| c != '\n' && c != '\r');
                    TokenKind::Comment
                }
                '[' => {
                    cursor.bump();
                    TokenKind::LeftBracket
                }
                ']' => {
                    cursor.bump();
                    TokenKind::RightBracket
                }
                '{' => {
                    cursor.bump();
                    TokenKind::LeftBrace
                }
                '}' => {
                    cursor.bump();
                    TokenKind::RightBrace
                }
                c if starts_number(c, cursor.peek_second(), &cursor) => {
                    scan_number(&mut cursor);
                    TokenKind::Number
                }
                c if is_id_first(c) => {
                    cursor.bump_while(is_id_rest);
                    let length = cursor.pos.offset - start.offset;
                    if length > MAX_IDENTIFIER_LENGTH {
                        let error = LexerError::IdentifierTooLong { length };
                        log_error!(error.error_code(), "Identifier exceeds maximum length",
                            span = Span::new(start, cursor.pos),
                            "length" => length,
                            "max_length" => MAX_IDENTIFIER_LENGTH);
                        return Err(error);
                    }
                    classify_word(&source[start.offset..cursor.pos.offset])
                }
                _ => {
                    cursor.bump();
                    TokenKind::Other
                }
            };

            self.push(&mut tokens, kind, Span::new(start, cursor.pos), &mut last_line)?;
        }

        Ok(tokens)
    }

    /// Scan a quoted string, emitting one continuation token per extra line
    fn scan_string(
        &mut self,
        cursor: &mut Cursor<'_>,
        tokens: &mut Vec<Token>,
        last_line: &mut u32,
    ) -> Result<(), LexerError> {
        let literal_start = cursor.pos;
        let mut segment_start = cursor.pos;
        let mut kind = TokenKind::QuotedString;
        cursor.bump();

        loop {
            match cursor.peek() {
                None => {
                    let error = LexerError::UnterminatedString {
                        start: literal_start,
                    };
                    log_error!(error.error_code(), "Unterminated string literal",
                        span = Span::new(literal_start, cursor.pos));
                    return Err(error);
                }
                Some('"') => {
                    cursor.bump();
                    break;
                }
                Some('\\') if cursor.peek_second().is_some_and(|c| c != '\n') => {
                    cursor.bump();
                    cursor.bump();
                }
                Some('\n') | Some('\r') => {
                    // one segment per source line; a blank line is an empty continuation
                    let segment_end = cursor.pos;
                    self.push(tokens, kind, Span::new(segment_start, segment_end), last_line)?;
                    if cursor.bump() == Some('\r') && cursor.peek() == Some('\n') {
                        cursor.bump();
                    }
                    kind = TokenKind::QuotedStringContinuation;
                    segment_start = cursor.pos;
                }
                Some(_) => {
                    cursor.bump();
                }
            }

            let size = cursor.pos.offset - literal_start.offset;
            if size > MAX_STRING_SIZE {
                let error = LexerError::StringTooLarge { size };
                log_error!(error.error_code(), "String literal exceeds maximum size",
                    span = Span::new(literal_start, cursor.pos),
                    "size" => size);
                return Err(error);
            }
        }

        self.metrics.max_string_length = self
            .metrics
            .max_string_length
            .max(cursor.pos.offset - literal_start.offset);
        self.push(tokens, kind, Span::new(segment_start, cursor.pos), last_line)
    }

    fn push(
        &mut self,
        tokens: &mut Vec<Token>,
        kind: TokenKind,
        span: Span,
        last_line: &mut u32,
    ) -> Result<(), LexerError> {
        if tokens.len() >= MAX_TOKEN_COUNT {
            let error = LexerError::TooManyTokens {
                count: tokens.len() + 1,
            };
            log_error!(error.error_code(), "Token limit exceeded",
                span = span,
                "max_tokens" => MAX_TOKEN_COUNT);
            return Err(error);
        }

        let line_break_before = span.start.line > *last_line;
        *last_line = span.end.line;
        self.metrics.record_token(kind);
        tokens.push(Token::new(tokens.len(), kind, span, line_break_before));
        Ok(())
    }
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Numbers start with a digit, or a sign or dot followed by one
fn starts_number(ch: char, second: Option<char>, cursor: &Cursor<'_>) -> bool {
    match ch {
        c if c.is_ascii_digit() => true,
        '.' => second.is_some_and(|c| c.is_ascii_digit()),
        '+' | '-' => match second {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => cursor.rest().chars().nth(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        },
        _ => false,
    }
}

fn scan_number(cursor: &mut Cursor<'_>) {
    if matches!(cursor.peek(), Some('+') | Some('-')) {
        cursor.bump();
    }

    if cursor.peek() == Some('0') && matches!(cursor.peek_second(), Some('x') | Some('X')) {
        cursor.bump();
        cursor.bump();
        cursor.bump_while(|c| c.is_ascii_hexdigit());
        return;
    }

    cursor.bump_while(|c| c.is_ascii_digit());
    if cursor.peek() == Some('.') {
        cursor.bump();
        cursor.bump_while(|c| c.is_ascii_digit());
    }

    if matches!(cursor.peek(), Some('e') | Some('E')) {
        let mut lookahead = cursor.rest().chars().skip(1);
        let exponent_follows = match lookahead.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if exponent_follows {
            cursor.bump();
            if matches!(cursor.peek(), Some('+') | Some('-')) {
                cursor.bump();
            }
            cursor.bump_while(|c| c.is_ascii_digit());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let stream = LexicalAnalyzer::new().tokenize(source.to_string()).unwrap();
        stream.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_token_kinds() {
        use TokenKind::*;
        assert_eq!(
            kinds("DEF Box01 Transform { translation 1 -2.5 .3 children [ ] }"),
            vec![
                Keyword1, Identifier, Identifier, LeftBrace, Identifier, Number, Number,
                Number, Identifier, LeftBracket, RightBracket, RightBrace
            ]
        );
    }

    #[test]
    fn test_route_dot_is_other() {
        let stream = LexicalAnalyzer::new()
            .tokenize("ROUTE Timer.fraction_changed TO Interp.set_fraction".to_string())
            .unwrap();
        let texts: Vec<&str> = (0..stream.len()).map(|i| stream.text(i)).collect();
        assert_eq!(
            texts,
            vec!["ROUTE", "Timer", ".", "fraction_changed", "TO", "Interp", ".", "set_fraction"]
        );
        assert_eq!(stream.kind(2), Some(TokenKind::Other));
        assert_eq!(stream.kind(4), Some(TokenKind::Keyword1));
    }

    #[test]
    fn test_commas_are_whitespace() {
        let stream = LexicalAnalyzer::new()
            .tokenize("point [ 1,2,3, 4 5 6 ]".to_string())
            .unwrap();
        assert_eq!(stream.len(), 9);
        assert_eq!(stream.text(2), "1");
        assert_eq!(stream.text(4), "3");
    }

    #[test]
    fn test_numbers() {
        let stream = LexicalAnalyzer::new()
            .tokenize("0x1F -0.0 1.5e+010 2E3 1e -x".to_string())
            .unwrap();
        let texts: Vec<&str> = (0..stream.len()).map(|i| stream.text(i)).collect();
        assert_eq!(texts, vec!["0x1F", "-0.0", "1.5e+010", "2E3", "1", "e", "-", "x"]);
        assert_eq!(stream.kind(5), Some(TokenKind::Identifier));
        assert_eq!(stream.kind(6), Some(TokenKind::Other));
    }

    #[test]
    fn test_line_break_flags() {
        let stream = LexicalAnalyzer::new()
            .tokenize("#VRML V2.0 utf8\n\nGroup {\n  children [ ] # trailing\n}".to_string())
            .unwrap();
        let flags: Vec<bool> = stream.iter().map(|t| t.line_break_before).collect();
        assert_eq!(flags, vec![false, true, false, true, false, false, false, true]);
        assert_eq!(stream.kind(0), Some(TokenKind::Comment));
        assert_eq!(stream.text(0), "#VRML V2.0 utf8");
        assert_eq!(stream.line_number(1), Some(3));
    }

    #[test]
    fn test_multiline_string_splits_into_continuations() {
        let stream = LexicalAnalyzer::new()
            .tokenize("string [ \"first\n  second\nthird\" ]".to_string())
            .unwrap();
        let kinds: Vec<TokenKind> = stream.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::LeftBracket,
                TokenKind::QuotedString,
                TokenKind::QuotedStringContinuation,
                TokenKind::QuotedStringContinuation,
                TokenKind::RightBracket,
            ]
        );
        assert_eq!(stream.text(2), "\"first");
        assert_eq!(stream.text(3), "  second");
        assert_eq!(stream.text(4), "third\"");
        assert!(stream.is_line_break(3));
        assert!(stream.get(3).unwrap().span.start.column == 1);
    }

    #[test]
    fn test_blank_lines_inside_string_survive() {
        let stream = LexicalAnalyzer::new()
            .tokenize("Text { string \"one\r\n\n\ntwo\" }".to_string())
            .unwrap();
        let texts: Vec<&str> = (3..7).map(|i| stream.text(i)).collect();
        assert_eq!(texts, vec!["\"one", "", "", "two\""]);
        assert_eq!(stream.kind(4), Some(TokenKind::QuotedStringContinuation));
        assert_eq!(stream.get(6).unwrap().line(), 4);
        assert_eq!(stream.text(7), "}");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let stream = LexicalAnalyzer::new()
            .tokenize(r#"url "a\"b" 1"#.to_string())
            .unwrap();
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.text(1), r#""a\"b""#);
    }

    #[test]
    fn test_unterminated_string() {
        let result = LexicalAnalyzer::new().tokenize("Text { string \"oops }".to_string());
        assert_matches!(result, Err(LexerError::UnterminatedString { start }) if start.column == 15);
    }

    #[test]
    fn test_identifier_too_long() {
        let long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let result = LexicalAnalyzer::new().tokenize(long);
        assert_matches!(result, Err(LexerError::IdentifierTooLong { length }) if length == MAX_IDENTIFIER_LENGTH + 1);
    }

    #[test]
    fn test_metrics() {
        let mut analyzer = LexicalAnalyzer::new();
        analyzer
            .tokenize("# c\nShape { geometry Box { size 1 1 1 } }".to_string())
            .unwrap();
        let metrics = analyzer.metrics();
        assert_eq!(metrics.comment_count, 1);
        assert_eq!(metrics.number_tokens, 3);
        assert_eq!(metrics.bracket_tokens, 4);
        assert_eq!(metrics.lines, 2);
    }

    #[test]
    fn test_error_codes() {
        let error = LexerError::TooManyTokens { count: 1 };
        assert_eq!(error.error_code(), codes::lexical::TOO_MANY_TOKENS);
    }
}
