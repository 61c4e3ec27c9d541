//! Transform contract
//!
//! A transform declares a [`MatchCriteria`], receives the matching nodes
//! and routes from a [`NodeLocator`] traversal, and registers replacement
//! ranges through its [`TransformContext`]. During replay the
//! [`RangeReplacer`] calls back into the same instance through its
//! [`ReplacementOwner`] half to produce the replacement text.

pub mod criteria;
pub mod locator;
pub mod registry;

use crate::config::compile_time::pipeline::DEFAULT_QUANTIZE_RESOLUTION;
use crate::logging::{codes, Code};
use crate::pipeline::CancelToken;
use crate::replace::{OwnerId, RangeReplacer, ReplaceError, ReplacementOwner};
use crate::scene::{Node, Route, Scene};
use crate::tokens::TokenStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use criteria::MatchCriteria;
pub use locator::{LocatorStats, NodeLocator, NodeSet};
pub use registry::{RegistryEntry, TransformRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Validators,
    Format,
    Clean,
    Condense,
    Reduce,
    Reorganize,
    Mutate,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Validators,
        Category::Format,
        Category::Clean,
        Category::Condense,
        Category::Reduce,
        Category::Reorganize,
        Category::Mutate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Validators => "validators",
            Category::Format => "format",
            Category::Clean => "clean",
            Category::Condense => "condense",
            Category::Reduce => "reduce",
            Category::Reorganize => "reorganize",
            Category::Mutate => "mutate",
        }
    }

    /// Categories the engine may run repeatedly until the output settles
    pub fn is_auto_repeat(&self) -> bool {
        matches!(self, Category::Clean)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TransformError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Replacement registration failed: {0}")]
    Replace(#[from] ReplaceError),

    #[error("Transform scan cancelled")]
    Cancelled,

    #[error("Unknown transform '{key}'")]
    UnknownTransform { key: String },

    #[error("Unknown category '{name}'")]
    UnknownCategory { name: String },
}

impl TransformError {
    pub fn error_code(&self) -> Code {
        match self {
            TransformError::Replace(e) => e.error_code(),
            TransformError::Cancelled => codes::pipeline::CANCELLED,
            TransformError::UnknownTransform { .. } | TransformError::UnknownCategory { .. } => {
                codes::transform::UNKNOWN_TRANSFORM
            }
        }
    }
}

/// A finding reported by a validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: Code,
    pub message: String,
    pub token: Option<usize>,
    /// Blocks mutating categories for the pass
    pub blocking: bool,
}

impl Diagnostic {
    pub fn error(code: Code, message: impl Into<String>, token: Option<usize>) -> Self {
        Self {
            code,
            message: message.into(),
            token,
            blocking: true,
        }
    }

    pub fn warning(code: Code, message: impl Into<String>, token: Option<usize>) -> Self {
        Self {
            code,
            message: message.into(),
            token,
            blocking: false,
        }
    }
}

/// Per-run settings transforms may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// Significant digits kept by quantization
    pub quantize_resolution: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            quantize_resolution: DEFAULT_QUANTIZE_RESOLUTION,
        }
    }
}

/// Everything a transform sees during one scan
pub struct TransformContext<'a> {
    pub stream: &'a TokenStream,
    pub scene: &'a Scene,
    pub options: TransformOptions,
    replacer: &'a mut RangeReplacer,
    owner: OwnerId,
    cancel: &'a CancelToken,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> TransformContext<'a> {
    pub fn new(
        stream: &'a TokenStream,
        scene: &'a Scene,
        replacer: &'a mut RangeReplacer,
        owner: OwnerId,
        cancel: &'a CancelToken,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            stream,
            scene,
            options: TransformOptions::default(),
            replacer,
            owner,
            cancel,
            diagnostics,
        }
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Register `start..=end` for this transform
    ///
    /// A start another request already owns is skipped and reported as
    /// `false`; `end == None` is the no-op sentinel.
    pub fn register(
        &mut self,
        start: usize,
        end: Option<usize>,
        param: usize,
    ) -> Result<bool, TransformError> {
        if end.is_some() && self.replacer.is_start_registered(start) {
            log_debug!("Start already claimed, skipping",
                "start" => start, "owner" => self.owner);
            return Ok(false);
        }
        self.replacer.register_range(self.owner, start, end, param)?;
        Ok(end.is_some())
    }

    pub fn rebind(&mut self, old: (usize, usize), new: (usize, usize)) -> Result<bool, TransformError> {
        Ok(self.replacer.rebind_range(old, new)?)
    }

    /// Spans registered so far by any transform, in start order
    pub fn claimed_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> =
            self.replacer.requests().iter().map(|r| (r.start, r.end)).collect();
        ranges.sort_unstable();
        ranges
    }

    pub fn register_trailer(&mut self, start: usize, end: usize) -> Result<(), TransformError> {
        Ok(self.replacer.register_trailer(start, end)?)
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the run has been aborted
    pub fn check_cancelled(&self) -> Result<(), TransformError> {
        if self.cancel.is_cancelled() {
            Err(TransformError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A pluggable rewrite over one token stream
///
/// Instances are built fresh for every run by the [`TransformRegistry`];
/// `reset` exists for owners reused through [`RangeReplacer::wipeout`].
pub trait Transform: ReplacementOwner {
    fn key(&self) -> &'static str;

    fn category(&self) -> Category;

    fn criteria(&self) -> MatchCriteria;

    /// Called once before the traversal
    fn begin_scan(&mut self, _ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        Ok(())
    }

    /// Called once per matching node
    fn on_node_found(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        matched: &str,
    ) -> Result<(), TransformError> {
        self.attempt_replacement(ctx, node, matched).map(|_| ())
    }

    /// Decide whether to replace `node`, registering ranges if so
    fn attempt_replacement(
        &mut self,
        _ctx: &mut TransformContext<'_>,
        _node: &Node,
        _matched: &str,
    ) -> Result<bool, TransformError> {
        Ok(false)
    }

    /// Called per route when the criteria ask for routes
    fn on_route_found(
        &mut self,
        _ctx: &mut TransformContext<'_>,
        _route: &Route,
    ) -> Result<(), TransformError> {
        Ok(())
    }

    /// Called once after the traversal
    fn end_scan(&mut self, _ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;
    use crate::scene::build_scene;
    use assert_matches::assert_matches;

    #[test]
    fn test_category_parse() {
        assert_eq!("clean".parse::<Category>().unwrap(), Category::Clean);
        assert_eq!("Reorganize".parse::<Category>().unwrap(), Category::Reorganize);
        assert_matches!(
            "shrink".parse::<Category>(),
            Err(TransformError::UnknownCategory { .. })
        );
        assert!(Category::Clean.is_auto_repeat());
        assert!(!Category::Format.is_auto_repeat());
    }

    #[test]
    fn test_context_registration() {
        let stream = tokenize_str("a b c d e").unwrap();
        let scene = build_scene(&stream).unwrap();
        let mut replacer = RangeReplacer::new();
        let cancel = CancelToken::new();
        let mut diagnostics = Vec::new();
        let mut ctx = TransformContext::new(&stream, &scene, &mut replacer, 0, &cancel, &mut diagnostics);

        assert!(ctx.register(1, Some(2), 0).unwrap());
        assert!(!ctx.register(1, Some(3), 1).unwrap());
        assert!(!ctx.register(4, None, 0).unwrap());
        assert_matches!(
            ctx.register(3, Some(2), 0),
            Err(TransformError::Replace(ReplaceError::InvalidRange { start: 3, end: 2 }))
        );
        assert!(ctx.check_cancelled().is_ok());
        cancel.cancel();
        assert_matches!(ctx.check_cancelled(), Err(TransformError::Cancelled));
        drop(ctx);
        assert_eq!(replacer.len(), 1);
    }
}
