//! Unbalanced `[`/`]` and `{`/`}`

use crate::logging::codes;
use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::tokens::{TokenKind, TokenStream};
use crate::transform::{Category, Diagnostic, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "bracket_balance";

#[derive(Debug, Default)]
pub struct BracketBalance;

fn closer_for(open: TokenKind) -> &'static str {
    if open == TokenKind::LeftBracket {
        "]"
    } else {
        "}"
    }
}

fn unclosed(stream: &TokenStream, at: usize, kind: TokenKind) -> Diagnostic {
    Diagnostic::error(
        codes::scene::UNBALANCED_BRACKETS,
        format!(
            "'{}' on line {} is never closed with '{}'",
            stream.text(at),
            stream.line_number(at).unwrap_or(0),
            closer_for(kind)
        ),
        Some(at),
    )
}

impl ReplacementOwner for BracketBalance {
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, _start: usize, _end: usize) {}
}

impl Transform for BracketBalance {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Validators
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::none()
    }

    fn begin_scan(&mut self, ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        let stream = ctx.stream;
        let mut open: Vec<(usize, TokenKind)> = Vec::new();

        for token in stream.iter() {
            if token.kind.is_open() {
                open.push((token.index, token.kind));
            } else if token.kind.is_close() {
                let expected = match token.kind {
                    TokenKind::RightBracket => TokenKind::LeftBracket,
                    _ => TokenKind::LeftBrace,
                };
                match open.iter().rposition(|&(_, kind)| kind == expected) {
                    Some(matched) => {
                        // openers above the match were never closed
                        for (at, kind) in open.drain(matched + 1..).rev() {
                            ctx.report(unclosed(stream, at, kind));
                        }
                        open.pop();
                    }
                    None => ctx.report(Diagnostic::error(
                        codes::scene::UNBALANCED_BRACKETS,
                        format!("Unmatched '{}' on line {}", stream.text(token.index), token.line()),
                        Some(token.index),
                    )),
                }
            }
        }

        for (at, kind) in open.into_iter().rev() {
            ctx.report(unclosed(stream, at, kind));
        }
        Ok(())
    }
}
