//! Whole-file pretty printing
//!
//! Runs after the other Format chisels and covers only the spans they left
//! unclaimed; the printer stays in pretty mode across those spans.

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "reformat";

#[derive(Debug, Default)]
pub struct Reformat;

impl ReplacementOwner for Reformat {
    fn optimize(&mut self, printer: &mut TokenPrinter<'_>, _param: usize, start: usize, end: usize) {
        if !printer.is_pretty() {
            printer.flush();
            printer.enable_pretty_print();
        }
        printer.print_range(start, end, true);
    }
}

impl Transform for Reformat {
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
        let len = ctx.stream.len();
        let mut next = 0;
        for (start, end) in ctx.claimed_ranges() {
            if start > next {
                ctx.register(next, Some(start - 1), 0)?;
            }
            next = next.max(end + 1);
        }
        if next < len {
            ctx.register(next, Some(len - 1), 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_reindents_everything() {
        let outcome = run(
            Box::new(Reformat),
            "#VRML V2.0 utf8\nTransform {\ntranslation 1.000 0 0\nchildren [\nShape {}\n]\n}\n",
        );
        assert_eq!(outcome.requests, 1);
        assert_eq!(
            outcome.text,
            "#VRML V2.0 utf8\nTransform {\n   translation 1 0 0\n   children [\n      Shape {\n      }\n   ]\n}\n"
        );
    }

    #[test]
    fn test_empty_stream_registers_nothing() {
        let outcome = run(Box::new(Reformat), "");
        assert_eq!(outcome.requests, 0);
        assert_eq!(outcome.text, "");
    }
}
