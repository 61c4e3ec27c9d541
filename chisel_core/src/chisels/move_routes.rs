//! Gathers top-level ROUTE statements at the end of the file

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::Route;
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "move_routes";

#[derive(Debug, Default)]
pub struct MoveRoutes {
    /// Last token of any top-level node or PROTO
    content_end: Option<usize>,
    /// Routes lifted out during replay, re-emitted by the trailer
    moved: Vec<(usize, usize)>,
}

impl ReplacementOwner for MoveRoutes {
    // the original position prints nothing
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, start: usize, end: usize) {
        self.moved.push((start, end));
    }

    fn has_trailer(&self) -> bool {
        !self.moved.is_empty()
    }

    fn emit_trailer(&mut self, printer: &mut TokenPrinter<'_>) {
        for (start, end) in self.moved.drain(..) {
            printer.flush();
            printer.print_range(start, end, false);
        }
    }

    fn reset(&mut self) {
        self.content_end = None;
        self.moved.clear();
    }
}

impl Transform for MoveRoutes {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Reorganize
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::none().with_routes()
    }

    fn begin_scan(&mut self, ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        let scene = ctx.scene;
        let nodes = scene.roots().iter().map(|&id| scene.node(id).last_token);
        let protos = scene.protos().iter().map(|p| p.last_token);
        self.content_end = nodes.chain(protos).max();
        Ok(())
    }

    fn on_route_found(
        &mut self,
        ctx: &mut TransformContext<'_>,
        route: &Route,
    ) -> Result<(), TransformError> {
        if !route.is_top_level() {
            return Ok(());
        }
        let Some(content_end) = self.content_end else {
            return Ok(());
        };
        if route.first_token > content_end {
            return Ok(());
        }
        ctx.register(route.first_token, Some(route.last_token), 0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_moves_interleaved_routes_to_end() {
        let outcome = run(
            Box::new(MoveRoutes::default()),
            "DEF T TimeSensor { }\nROUTE T.a TO S.b\nDEF S Script { }\nROUTE T.c TO S.d\n",
        );
        assert_eq!(outcome.requests, 1);
        assert_eq!(
            outcome.text,
            "DEF T TimeSensor { }\nDEF S Script { }\nROUTE T.c TO S.d\nROUTE T.a TO S.b\n"
        );
    }

    #[test]
    fn test_nested_routes_stay() {
        let source = "Group {\n  children [ ]\n  ROUTE A.b TO C.d\n}\nShape { }\n";
        let outcome = run(Box::new(MoveRoutes::default()), source);
        assert_eq!(outcome.requests, 0);
        assert_eq!(outcome.text, source);
    }
}
