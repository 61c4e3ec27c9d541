//! Removal of `DEF name` prefixes nothing refers to

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::Node;
use crate::transform::criteria::DEF;
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "unused_defs";

#[derive(Debug, Default)]
pub struct UnusedDefs;

impl ReplacementOwner for UnusedDefs {
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, _start: usize, _end: usize) {}
}

impl Transform for UnusedDefs {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Clean
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::nodes(&[DEF]).with_proto_interior()
    }

    fn attempt_replacement(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        _matched: &str,
    ) -> Result<bool, TransformError> {
        let Some(def_token) = node.def_token else {
            return Ok(false);
        };
        if ctx.scene.is_referenced(node.id) {
            return Ok(false);
        }
        // `DEF` through the name; the node itself stays
        let name_token = ctx.stream.next_significant(def_token);
        ctx.register(def_token, name_token, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_removes_unreferenced_names() {
        let outcome = run(
            Box::new(UnusedDefs),
            "DEF Used Material {}\nDEF Unused Group {\n  children [\n    DEF Timer TimeSensor { }\n  ]\n}\nUSE Used\nROUTE Timer.x TO Timer.y\n",
        );
        assert_eq!(outcome.requests, 1);
        assert_eq!(
            outcome.text,
            "DEF Used Material {}\nGroup {\n  children [\n    DEF Timer TimeSensor { }\n  ]\n}\nUSE Used\nROUTE Timer.x TO Timer.y\n"
        );
    }
}
