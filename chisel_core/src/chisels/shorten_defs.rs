//! Renames DEFs to short generated names
//!
//! Every DEF gets the next free name from `A`, `B`, .. `Z`, `AA`, `AB`, ..
//! in source order, skipping VRML keywords. USE and ROUTE references that
//! resolve to a renamed node follow it; unresolved ones are left alone.

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::{Node, NodeId, Route};
use crate::tokens::{classify_word, TokenKind};
use crate::transform::criteria::DEF;
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};
use std::collections::HashMap;

pub const KEY: &str = "shorten_defs";

/// Bijective base-26 name for `n`: 0 -> A, 25 -> Z, 26 -> AA
pub fn short_name(mut n: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

#[derive(Debug, Default)]
pub struct ShortenDefs {
    names: Vec<String>,
    by_node: HashMap<NodeId, usize>,
}

impl ShortenDefs {
    fn next_name(&self, counter: &mut usize) -> String {
        loop {
            let name = short_name(*counter);
            *counter += 1;
            if classify_word(&name) == TokenKind::Identifier {
                return name;
            }
        }
    }

    /// Register a rename of `token` to the name given to `target`
    fn rename(
        &self,
        ctx: &mut TransformContext<'_>,
        token: usize,
        target: Option<NodeId>,
    ) -> Result<bool, TransformError> {
        let Some(&param) = target.and_then(|id| self.by_node.get(&id)) else {
            return Ok(false);
        };
        if ctx.stream.text(token) == self.names[param] {
            return Ok(false);
        }
        ctx.register(token, Some(token), param)
    }
}

impl ReplacementOwner for ShortenDefs {
    fn optimize(&mut self, printer: &mut TokenPrinter<'_>, param: usize, _start: usize, _end: usize) {
        if let Some(name) = self.names.get(param) {
            printer.print_str(name);
        }
    }

    fn reset(&mut self) {
        self.names.clear();
        self.by_node.clear();
    }
}

impl Transform for ShortenDefs {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Mutate
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::nodes(&[DEF])
            .with_def_use()
            .with_routes()
            .with_proto_interior()
    }

    fn begin_scan(&mut self, ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        self.reset();
        let mut counter = 0;
        for node in ctx.scene.defs() {
            let name = self.next_name(&mut counter);
            self.by_node.insert(node.id, self.names.len());
            self.names.push(name);
        }
        Ok(())
    }

    fn attempt_replacement(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        _matched: &str,
    ) -> Result<bool, TransformError> {
        if node.is_use() {
            return self.rename(ctx, node.name_token, node.use_target());
        }
        match node.def_token.and_then(|t| ctx.stream.next_significant(t)) {
            Some(name_token) => self.rename(ctx, name_token, Some(node.id)),
            None => Ok(false),
        }
    }

    fn on_route_found(
        &mut self,
        ctx: &mut TransformContext<'_>,
        route: &Route,
    ) -> Result<(), TransformError> {
        self.rename(ctx, route.from_node_token, route.from_target)?;
        self.rename(ctx, route.to_node_token, route.to_target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_short_names() {
        assert_eq!(short_name(0), "A");
        assert_eq!(short_name(25), "Z");
        assert_eq!(short_name(26), "AA");
        assert_eq!(short_name(27), "AB");
        assert_eq!(short_name(26 + 26 * 26), "AAA");
    }

    #[test]
    fn test_renames_defs_uses_and_routes() {
        let outcome = run(
            Box::new(ShortenDefs::default()),
            "DEF LongName Transform {\n  children [ DEF Other Shape { } ]\n}\nUSE LongName\nROUTE LongName.x TO Other.y\n",
        );
        assert_eq!(outcome.requests, 5);
        assert_eq!(
            outcome.text,
            "DEF A Transform {\n  children [ DEF B Shape { } ]\n}\nUSE A\nROUTE A.x TO B.y\n"
        );
    }

    #[test]
    fn test_unresolved_references_untouched() {
        let source = "DEF A Group { }\nUSE Missing\nROUTE A.x TO Missing.y\n";
        let outcome = run(Box::new(ShortenDefs::default()), source);
        assert_eq!(outcome.requests, 0);
        assert_eq!(outcome.text, source);
    }
}
