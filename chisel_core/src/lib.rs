//! # chisel_core
//!
//! Token-stream rewriting engine for VRML scenes. A file is tokenized once;
//! transforms ("chisels") register non-overlapping replacement ranges
//! against that stream; the range replacer replays the original tokens and
//! splices each replacement in exactly once. The pipeline repeats cleaning
//! passes until the scene stops changing.

#[macro_use]
pub mod logging;

pub mod batch;
pub mod chisels;
pub mod config;
pub mod file_processor;
pub mod lexical;
pub mod pipeline;
pub mod printer;
pub mod replace;
pub mod scene;
pub mod tokens;
pub mod transform;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use pipeline::{
    process_file, CancelToken, Engine, EngineOutcome, PipelineError, PipelineOptions, ProcessedFile,
};
pub use printer::{PrintOptions, TokenPrinter};
pub use replace::RangeReplacer;
pub use tokens::{Token, TokenKind, TokenStream};
pub use transform::{Category, Transform, TransformRegistry};
