//! Removal of grouping nodes with nothing in them
//!
//! Only anonymous groups sitting at top level or in a `children` list go;
//! a group that becomes empty once its contents are removed is caught by
//! the next clean pass.

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::{FieldValue, Node};
use crate::tokens::TokenKind;
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "empty_groups";

pub const GROUPING_NODES: [&str; 5] = ["Group", "Transform", "Anchor", "Collision", "Billboard"];

#[derive(Debug, Default)]
pub struct EmptyGroups;

impl EmptyGroups {
    fn is_empty_group(ctx: &TransformContext<'_>, node: &Node) -> bool {
        node.fields.iter().all(|field| {
            field.name == "children"
                && field.value_kind == FieldValue::List
                && field.nodes.is_empty()
                && field.value_tokens().map_or(true, |(first, last)| {
                    (first..=last).all(|i| ctx.stream.kind(i) == Some(TokenKind::Comment))
                })
        })
    }
}

impl ReplacementOwner for EmptyGroups {
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, _start: usize, _end: usize) {}
}

impl Transform for EmptyGroups {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Clean
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::nodes(&GROUPING_NODES)
    }

    fn attempt_replacement(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        _matched: &str,
    ) -> Result<bool, TransformError> {
        if node.is_def() || node.is_use() {
            return Ok(false);
        }
        let placement_ok = match node.parent_field.as_deref() {
            None => node.parent.is_none() && node.proto.is_none(),
            Some(field) => field == "children",
        };
        if !placement_ok || !Self::is_empty_group(ctx, node) {
            return Ok(false);
        }
        ctx.register(node.first_token, Some(node.last_token), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_removes_innermost_first() {
        let outcome = run(
            Box::new(EmptyGroups),
            "Group {\n  children [\n    Transform { children [ ] }\n    Shape { }\n  ]\n}\nGroup { }\n",
        );
        assert_eq!(outcome.requests, 2);
        assert_eq!(outcome.text, "Group {\n  children [\n    Shape { }\n  ]\n}\n");
    }

    #[test]
    fn test_keeps_named_and_configured_groups() {
        let source = "DEF Keep Group { }\nTransform { translation 1 0 0 }\nShape { geometry Group { } }\n";
        let outcome = run(Box::new(EmptyGroups), source);
        assert_eq!(outcome.requests, 0);
        assert_eq!(outcome.text, source);
    }
}
