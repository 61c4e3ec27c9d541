//! DEF/USE consistency
//!
//! `USE` of a name with no preceding `DEF` in the same scope is a blocking
//! error. Redefining a name is legal VRML but almost always a mistake, so
//! it is only a warning.

use crate::logging::codes;
use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::Node;
use crate::transform::criteria::DEF;
use crate::transform::{Category, Diagnostic, MatchCriteria, Transform, TransformContext, TransformError};
use std::collections::HashSet;

pub const KEY: &str = "def_use";

#[derive(Debug, Default)]
pub struct DefUseCheck {
    /// (PROTO scope, name) pairs seen so far
    defined: HashSet<(Option<usize>, String)>,
}

impl ReplacementOwner for DefUseCheck {
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, _start: usize, _end: usize) {}

    fn reset(&mut self) {
        self.defined.clear();
    }
}

impl Transform for DefUseCheck {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Validators
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::nodes(&[DEF])
            .with_def_use()
            .with_proto_interior()
    }

    fn on_node_found(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        _matched: &str,
    ) -> Result<(), TransformError> {
        let stream = ctx.stream;
        let line = stream.line_number(node.name_token).unwrap_or(0);

        if node.is_use() {
            if node.use_target().is_none() {
                ctx.report(Diagnostic::error(
                    codes::scene::UNDEFINED_USE,
                    format!("USE of undefined name '{}' on line {}", stream.text(node.name_token), line),
                    Some(node.name_token),
                ));
            }
            return Ok(());
        }

        if let Some(name) = &node.def_name {
            if !self.defined.insert((node.proto, name.clone())) {
                ctx.report(Diagnostic::warning(
                    codes::scene::DUPLICATE_DEF,
                    format!("'{}' is defined again on line {}", name, line),
                    node.def_token,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_consistent_scene() {
        let outcome = run(
            Box::<DefUseCheck>::default(),
            "DEF M Material {}\nShape { appearance Appearance { material USE M } }\n",
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_undefined_and_duplicate() {
        let outcome = run(
            Box::<DefUseCheck>::default(),
            "USE Early\nDEF A Group {}\nDEF A Group {}\nPROTO P [] { DEF A Group {} }\n",
        );
        assert_eq!(outcome.diagnostics.len(), 2);

        let undefined = &outcome.diagnostics[0];
        assert_eq!(undefined.code, codes::scene::UNDEFINED_USE);
        assert!(undefined.blocking);
        assert!(undefined.message.contains("Early"));

        let duplicate = &outcome.diagnostics[1];
        assert_eq!(duplicate.code, codes::scene::DUPLICATE_DEF);
        assert!(!duplicate.blocking);
        assert!(duplicate.message.contains("line 3"));
    }
}
