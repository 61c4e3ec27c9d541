//! Comment removal

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::tokens::TokenKind;
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "strip_comments";

#[derive(Debug, Default)]
pub struct StripComments;

impl ReplacementOwner for StripComments {
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, _start: usize, _end: usize) {}
}

impl Transform for StripComments {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::none()
    }

    fn begin_scan(&mut self, ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        let stream = ctx.stream;
        for token in stream.iter().filter(|t| t.kind == TokenKind::Comment) {
            // the file header is required by VRML readers
            if token.index == 0 && stream.text(0).starts_with("#VRML") {
                continue;
            }
            ctx.check_cancelled()?;
            ctx.register(token.index, Some(token.index), 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_keeps_header_only() {
        let outcome = run(
            Box::new(StripComments),
            "#VRML V2.0 utf8\n# author\nGroup { # trailing\n  children [ ]\n}\n",
        );
        assert_eq!(outcome.requests, 2);
        assert_eq!(outcome.text, "#VRML V2.0 utf8\nGroup {\n  children [ ]\n}\n");
    }
}
