//! Precision reduction for coordinates and interpolator key values

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::Node;
use crate::transform::criteria::{COORDINATE_OWNER, INTERPOLATOR};
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "quantize";

#[derive(Debug, Default)]
pub struct Quantize {
    resolution: u32,
}

impl Quantize {
    /// Value tokens to round for `node`, if it has any
    fn target_range(ctx: &TransformContext<'_>, node: &Node, matched: &str) -> Option<(usize, usize)> {
        let field = if matched == INTERPOLATOR {
            node.field("keyValue")?
        } else {
            // the shared Coordinate is rounded where it is defined
            let coord = ctx.scene.get(*node.field("coord")?.nodes.first()?)?;
            if coord.is_use() || coord.type_name != "Coordinate" {
                return None;
            }
            coord.field("point")?
        };
        field.value_tokens()
    }
}

impl ReplacementOwner for Quantize {
    fn optimize(&mut self, printer: &mut TokenPrinter<'_>, _param: usize, start: usize, end: usize) {
        let stream = printer.stream();
        for index in start..=end {
            // comments inside the list pass through
            match stream.float_value(index) {
                Some(value) => {
                    printer.begin_replacement(index);
                    printer.print_float(value, self.resolution);
                }
                None => printer.print_token(index),
            }
        }
    }
}

impl Transform for Quantize {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Reduce
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::nodes(&[COORDINATE_OWNER, INTERPOLATOR]).with_proto_interior()
    }

    fn begin_scan(&mut self, ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        self.resolution = ctx.options.quantize_resolution;
        Ok(())
    }

    fn attempt_replacement(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        matched: &str,
    ) -> Result<bool, TransformError> {
        match Self::target_range(ctx, node, matched) {
            Some((first, last)) => ctx.register(first, Some(last), 0),
            None => Ok(false),
        }
    }
}
