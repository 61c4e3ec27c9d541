//! Token types and the immutable [`TokenStream`]

pub mod token;
pub mod token_stream;

pub use token::{classify_word, is_interface_keyword, Token, TokenKind, KEYWORDS};
pub use token_stream::TokenStream;
