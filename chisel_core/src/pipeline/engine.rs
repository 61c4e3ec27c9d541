//! Per-file convergence loop
//!
//! validate -> run one category -> replay -> rebuild -> compare profiles.
//! The clean category repeats until the profile stops changing, bounded by
//! `MAX_AUTO_CLEAN` passes. A final validation refreshes the diagnostics.

use super::profile::Profile;
use super::{CancelToken, PipelineError};
use crate::config::compile_time::pipeline::MAX_AUTO_CLEAN;
use crate::config::runtime::{PipelinePreferences, PrinterPreferences};
use crate::file_processor::FileProcessor;
use crate::lexical::tokenize_str;
use crate::logging::codes;
use crate::printer::{PrintOptions, TokenPrinter, TokenSink};
use crate::replace::{LookupStrategy, RangeReplacer, ReplayStats};
use crate::scene::{build_scene, Scene};
use crate::tokens::TokenStream;
use crate::transform::{
    Category, Diagnostic, NodeLocator, Transform, TransformContext, TransformOptions,
    TransformRegistry,
};
use std::sync::Arc;

/// Everything one engine run needs, passed explicitly
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub category: Category,
    pub print: PrintOptions,
    /// Repeat the clean category until it stops changing the file
    pub auto_clean: bool,
    /// Registry keys switched off by the user
    pub disabled: Vec<String>,
    pub transform: TransformOptions,
    /// Only replace spans inside this token range
    pub selection: Option<(usize, usize)>,
    /// Force a replay lookup strategy
    pub lookup: Option<LookupStrategy>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            category: Category::Clean,
            print: PrintOptions::default(),
            auto_clean: true,
            disabled: Vec::new(),
            transform: TransformOptions::default(),
            selection: None,
            lookup: None,
        }
    }
}

impl PipelineOptions {
    pub fn from_preferences(
        category: Category,
        printer: &PrinterPreferences,
        pipeline: &PipelinePreferences,
    ) -> Self {
        Self {
            category,
            print: PrintOptions::from(printer),
            auto_clean: pipeline.auto_clean,
            disabled: pipeline.disabled_transforms.clone(),
            transform: TransformOptions {
                quantize_resolution: pipeline.quantize_resolution,
            },
            selection: None,
            lookup: None,
        }
    }
}

/// Counters carried across the passes of one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassState {
    pub clean_count: u32,
    pub validated: bool,
    pub errors_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub category: Category,
    pub transforms: Vec<&'static str>,
    pub matched: usize,
    pub requests: usize,
    pub replay: ReplayStats,
    pub lines: usize,
}

#[derive(Debug)]
pub struct EngineOutcome {
    pub stream: TokenStream,
    pub passes: Vec<PassReport>,
    /// Findings of the last validation
    pub diagnostics: Vec<Diagnostic>,
    pub state: PassState,
    /// The last pass left the profile unchanged
    pub converged: bool,
    /// Validation errors stopped the run before any pass
    pub blocked: bool,
    /// Output text differs from the input text
    pub modified: bool,
}

impl EngineOutcome {
    pub fn text(&self) -> &str {
        self.stream.source()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.blocking)
    }
}

#[derive(Clone)]
pub struct Engine {
    registry: Arc<TransformRegistry>,
    options: PipelineOptions,
    cancel: CancelToken,
    files: FileProcessor,
}

impl Engine {
    pub fn new(registry: Arc<TransformRegistry>, options: PipelineOptions) -> Self {
        Self {
            registry,
            options,
            cancel: CancelToken::new(),
            files: FileProcessor::new(),
        }
    }

    /// Engine over the built-in chisels
    pub fn with_builtins(options: PipelineOptions) -> Self {
        Self::new(Arc::new(TransformRegistry::with_builtins()), options)
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Read input files with `files` instead of the default reader
    pub fn with_file_processor(mut self, files: FileProcessor) -> Self {
        self.files = files;
        self
    }

    pub fn file_processor(&self) -> &FileProcessor {
        &self.files
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn run_source(&self, source: &str) -> Result<EngineOutcome, PipelineError> {
        self.run(tokenize_str(source)?)
    }

    pub fn run(&self, input: TokenStream) -> Result<EngineOutcome, PipelineError> {
        let category = self.options.category;
        let mut state = PassState::default();
        let mut stream = input;
        let mut scene = build_scene(&stream)?;

        let mut diagnostics = self.validate(&stream, &scene)?;
        state.validated = true;
        state.errors_present = diagnostics.iter().any(|d| d.blocking);

        if category == Category::Validators {
            return Ok(EngineOutcome {
                stream,
                passes: Vec::new(),
                diagnostics,
                state,
                converged: true,
                blocked: false,
                modified: false,
            });
        }
        if state.errors_present {
            log_error!(codes::pipeline::VALIDATION_BLOCKED,
                "Validation errors present, transforms skipped",
                "category" => category,
                "errors" => diagnostics.iter().filter(|d| d.blocking).count());
            return Ok(EngineOutcome {
                stream,
                passes: Vec::new(),
                diagnostics,
                state,
                converged: false,
                blocked: true,
                modified: false,
            });
        }

        let original = stream.source().to_string();
        let mut passes = Vec::new();
        let converged = loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let before = Profile::of(&stream, &scene);
            let (next, report) = self.run_pass(&stream, &scene)?;
            let next_scene = build_scene(&next)?;
            let after = Profile::of(&next, &next_scene);
            passes.push(report);
            stream = next;
            scene = next_scene;

            if category.is_auto_repeat() {
                state.clean_count += 1;
            }
            if after == before {
                break true;
            }
            if !category.is_auto_repeat()
                || !self.options.auto_clean
                || !self.options.disabled.is_empty()
            {
                break false;
            }
            if state.clean_count >= MAX_AUTO_CLEAN {
                log_warning!(code = codes::pipeline::CONVERGENCE_BOUND_REACHED,
                    "Clean passes stopped at the bound",
                    "passes" => state.clean_count,
                    "profile" => &after);
                break false;
            }
            log_debug!("Profile changed, repeating clean",
                "before" => &before, "after" => &after);
        };

        diagnostics = self.validate(&stream, &scene)?;
        state.errors_present = diagnostics.iter().any(|d| d.blocking);

        let modified = stream.source() != original;
        log_success!(codes::success::PIPELINE_CONVERGED, "Pipeline finished",
            "category" => category,
            "passes" => passes.len(),
            "converged" => converged,
            "modified" => modified);

        Ok(EngineOutcome {
            stream,
            passes,
            diagnostics,
            state,
            converged,
            blocked: false,
            modified,
        })
    }

    /// Run the validators; they report diagnostics and never register ranges
    pub fn validate(&self, stream: &TokenStream, scene: &Scene) -> Result<Vec<Diagnostic>, PipelineError> {
        let mut diagnostics: Vec<Diagnostic> = scene
            .problems()
            .iter()
            .map(|p| Diagnostic::error(p.error_code(), p.to_string(), Some(p.token())))
            .collect();

        let mut validators = self
            .registry
            .instantiate(Category::Validators, &self.options.disabled);
        let mut replacer = RangeReplacer::new();
        let mut locator = NodeLocator::new(scene);
        for (owner, validator) in validators.iter_mut().enumerate() {
            let mut ctx = TransformContext::new(
                stream,
                scene,
                &mut replacer,
                owner,
                &self.cancel,
                &mut diagnostics,
            )
            .with_options(self.options.transform);
            locator.visit(validator.as_mut(), &mut ctx)?;
        }

        log_debug!("Validation finished",
            "validators" => validators.len(),
            "diagnostics" => diagnostics.len());
        Ok(diagnostics)
    }

    /// One scan of every enabled transform in the category, then one replay
    ///
    /// Cancellation during the scan skips the replay entirely.
    pub fn run_pass(
        &self,
        stream: &TokenStream,
        scene: &Scene,
    ) -> Result<(TokenStream, PassReport), PipelineError> {
        let category = self.options.category;
        let mut owners: Vec<Box<dyn Transform>> =
            self.registry.instantiate(category, &self.options.disabled);
        let transforms: Vec<&'static str> = owners.iter().map(|t| t.key()).collect();

        let mut replacer = match self.options.lookup {
            Some(strategy) => RangeReplacer::new().with_strategy(strategy),
            None => RangeReplacer::new(),
        };
        replacer.set_selection(self.options.selection);

        let mut diagnostics = Vec::new();
        let mut matched = 0;
        let mut locator = NodeLocator::new(scene);
        for (owner, transform) in owners.iter_mut().enumerate() {
            let mut ctx = TransformContext::new(
                stream,
                scene,
                &mut replacer,
                owner,
                &self.cancel,
                &mut diagnostics,
            )
            .with_options(self.options.transform);
            matched += locator.visit(transform.as_mut(), &mut ctx)?.matched;
        }

        if self.cancel.is_cancelled() {
            log_warning!(code = codes::pipeline::CANCELLED, "Pass cancelled before replay",
                "category" => category,
                "requests" => replacer.len());
            return Err(PipelineError::Cancelled);
        }

        let requests = replacer.len();
        let mut sink = TokenSink::new();
        let (replay, lines) = {
            let mut printer = TokenPrinter::new(stream, &mut sink, self.options.print.clone());
            let replay = replacer.replay(
                &mut owners,
                &mut printer,
                0,
                stream.len().saturating_sub(1),
            )?;
            (replay, printer.finish()?)
        };
        replacer.wipeout(&mut owners);
        let next = sink.into_token_stream()?;

        log_success!(codes::success::PASS_COMPLETE, "Pass complete",
            "category" => category,
            "transforms" => transforms.join(","),
            "requests" => requests,
            "replaced" => replay.replaced,
            "vetoed" => replay.vetoed,
            "copied_tokens" => replay.copied_tokens);
        if !diagnostics.is_empty() {
            log_info!("Transforms reported findings", "count" => diagnostics.len());
        }

        Ok((
            next,
            PassReport {
                category,
                transforms,
                matched,
                requests,
                replay,
                lines,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::TokenPrinter;
    use crate::replace::ReplacementOwner;
    use crate::transform::{MatchCriteria, RegistryEntry, TransformContext, TransformError};
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    fn engine(category: Category) -> Engine {
        Engine::with_builtins(PipelineOptions {
            category,
            ..PipelineOptions::default()
        })
    }

    fn nested_groups(depth: usize) -> String {
        let mut source = String::new();
        for _ in 1..depth {
            source.push_str("Group { children [ ");
        }
        source.push_str("Group { }");
        for _ in 1..depth {
            source.push_str(" ] }");
        }
        source.push('\n');
        source
    }

    #[test]
    fn test_clean_repeats_until_fixed_point() {
        let outcome = engine(Category::Clean)
            .run_source("Group {\n  children [\n    Group { children [ Transform { } ] }\n  ]\n}\n")
            .unwrap();
        assert!(outcome.converged);
        assert!(outcome.modified);
        assert_eq!(outcome.passes.len(), 4);
        assert_eq!(outcome.state.clean_count, 4);
        assert_eq!(outcome.text(), "");
    }

    #[test]
    fn test_clean_stops_at_bound() {
        let depth = MAX_AUTO_CLEAN as usize + 2;
        let outcome = engine(Category::Clean).run_source(&nested_groups(depth)).unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.passes.len(), MAX_AUTO_CLEAN as usize);
        assert_eq!(outcome.text().matches("Group").count(), 2);
    }

    #[test]
    fn test_no_auto_clean_runs_once() {
        let outcome = Engine::with_builtins(PipelineOptions {
            auto_clean: false,
            ..PipelineOptions::default()
        })
        .run_source(&nested_groups(3))
        .unwrap();
        assert_eq!(outcome.passes.len(), 1);
        assert_eq!(outcome.text().matches("Group").count(), 2);
    }

    #[test]
    fn test_manual_disable_stops_repeat() {
        let outcome = Engine::with_builtins(PipelineOptions {
            disabled: vec!["unused_defs".to_string()],
            ..PipelineOptions::default()
        })
        .run_source(&nested_groups(3))
        .unwrap();
        assert_eq!(outcome.passes.len(), 1);
        assert_eq!(outcome.passes[0].transforms, ["empty_groups"]);
    }

    #[test]
    fn test_validation_errors_block_transforms() {
        let source = "Group { children [ USE Missing ] }\n";
        let outcome = engine(Category::Clean).run_source(source).unwrap();
        assert!(outcome.blocked);
        assert!(outcome.passes.is_empty());
        assert_eq!(outcome.text(), source);
        assert_eq!(outcome.errors().count(), 1);
    }

    #[test]
    fn test_validators_only() {
        let outcome = engine(Category::Validators)
            .run_source("Group { children [ Shape { }\n")
            .unwrap();
        assert!(outcome.passes.is_empty());
        assert!(outcome.state.errors_present);
        assert!(!outcome.blocked);
    }

    #[test]
    fn test_single_pass_category() {
        let outcome = engine(Category::Reorganize)
            .run_source("ROUTE A.x TO B.y\nDEF A Group { }\nDEF B Group { }\n")
            .unwrap();
        assert_eq!(outcome.passes.len(), 1);
        assert_eq!(
            outcome.text(),
            "DEF A Group { }\nDEF B Group { }\nROUTE A.x TO B.y\n"
        );
    }

    #[test]
    fn test_route_outside_selection_stays_once() {
        let engine = Engine::with_builtins(PipelineOptions {
            category: Category::Reorganize,
            selection: Some((8, 20)),
            ..PipelineOptions::default()
        });
        let outcome = engine
            .run_source("ROUTE A.x TO B.y\nDEF A Group { }\nDEF B Group { }\n")
            .unwrap();
        assert_eq!(outcome.text().matches("ROUTE A.x TO B.y").count(), 1);
        assert!(outcome.text().starts_with("ROUTE A.x TO B.y\n"));
        assert_eq!(outcome.passes[0].replay.trailers, 0);
    }

    #[test]
    fn test_format_strips_comments_and_reindents() {
        let outcome = engine(Category::Format)
            .run_source("#VRML V2.0 utf8\n# author\nGroup { # trailing\nchildren [\nShape { }\n]\n}\n")
            .unwrap();
        assert_eq!(outcome.passes[0].transforms, vec!["strip_comments", "reformat"]);
        let text = outcome.text();
        assert!(text.starts_with("#VRML V2.0 utf8\n"));
        assert!(!text.contains("author"));
        assert!(!text.contains("trailing"));
        assert!(text.contains("\n   children [\n"));
    }

    static OPTIMIZE_CALLS: AtomicUsize = AtomicUsize::new(0);
    static CANCEL: OnceLock<CancelToken> = OnceLock::new();

    /// Registers the first token, then aborts the run
    #[derive(Default)]
    struct Aborting;

    impl ReplacementOwner for Aborting {
        fn optimize(&mut self, _: &mut TokenPrinter<'_>, _: usize, _: usize, _: usize) {
            OPTIMIZE_CALLS.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Transform for Aborting {
        fn key(&self) -> &'static str {
            "aborting"
        }

        fn category(&self) -> Category {
            Category::Format
        }

        fn criteria(&self) -> MatchCriteria {
            MatchCriteria::none()
        }

        fn begin_scan(&mut self, ctx: &mut TransformContext<'_>) -> Result<(), TransformError> {
            ctx.register(0, Some(0), 0)?;
            CANCEL.get_or_init(CancelToken::new).cancel();
            ctx.check_cancelled()
        }
    }

    #[test]
    fn test_cancellation_skips_replay() {
        let mut registry = TransformRegistry::new();
        registry.register(RegistryEntry {
            key: "aborting",
            category: Category::Format,
            description: "test",
            constructor: || -> Box<dyn Transform> { Box::new(Aborting) },
        });
        let engine = Engine::new(
            Arc::new(registry),
            PipelineOptions {
                category: Category::Format,
                ..PipelineOptions::default()
            },
        )
        .with_cancel_token(CANCEL.get_or_init(CancelToken::new).clone());

        assert_matches!(engine.run_source("Group { }"), Err(PipelineError::Cancelled));
        assert_eq!(OPTIMIZE_CALLS.load(Ordering::SeqCst), 0);
        assert!(engine.cancel_token().is_cancelled());
    }
}
