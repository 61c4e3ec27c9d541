//! Lexical analysis for VRML source text
//!
//! Produces the immutable [`TokenStream`] every pass works on. The same
//! lexer re-reads printer output between passes.

pub mod analyzer;

use crate::file_processor::FileProcessingResult;
use crate::tokens::TokenStream;

pub use analyzer::{LexerError, LexicalAnalyzer, LexicalMetrics};

/// Tokenize a processed file
pub fn tokenize_file_result(file_result: FileProcessingResult) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::new().tokenize_file_result(file_result)
}

/// Tokenize in-memory text
pub fn tokenize_str(source: &str) -> Result<TokenStream, LexerError> {
    LexicalAnalyzer::new().tokenize(source.to_string())
}

/// Validate that all lexical error codes are registered (for startup)
pub fn init_lexical_analysis_logging() -> Result<(), String> {
    use crate::logging::codes;

    let test_codes = [
        codes::lexical::UNTERMINATED_STRING,
        codes::lexical::TOO_MANY_TOKENS,
        codes::lexical::IDENTIFIER_TOO_LONG,
        codes::lexical::STRING_TOO_LARGE,
    ];

    for code in &test_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Lexical error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_file_result() {
        let file = FileProcessingResult::from_source("a.wrl", "Group { }".to_string());
        let stream = tokenize_file_result(file).unwrap();
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.source(), "Group { }");
    }

    #[test]
    fn test_empty_source() {
        let stream = tokenize_str("").unwrap();
        assert!(stream.is_empty());
        assert_eq!(stream.line_count(), 0);
    }

    #[test]
    fn test_codes_registered() {
        assert!(init_lexical_analysis_logging().is_ok());
    }
}
