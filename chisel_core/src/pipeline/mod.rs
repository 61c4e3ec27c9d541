//! File pipeline: read -> tokenize -> engine -> (optionally) save

pub mod cancel;
pub mod engine;
mod error;
pub mod profile;
pub mod save;

pub use cancel::CancelToken;
pub use engine::{Engine, EngineOutcome, PassReport, PassState, PipelineOptions};
pub use error::PipelineError;
pub use profile::Profile;
pub use save::{FileSession, SaveError, SaveReport};

use crate::file_processor::FileMetadata;
use crate::logging::{self, codes};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// One file taken through the engine
#[derive(Debug)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub metadata: FileMetadata,
    pub outcome: EngineOutcome,
    pub duration: Duration,
}

impl ProcessedFile {
    pub fn text(&self) -> &str {
        self.outcome.text()
    }
}

/// Check that every stage's codes and limits are registered (for startup)
pub fn validate_pipeline() -> Result<(), String> {
    crate::file_processor::init_file_processor_logging()?;
    crate::lexical::init_lexical_analysis_logging()?;
    for code in [
        codes::pipeline::VALIDATION_BLOCKED,
        codes::pipeline::CANCELLED,
        codes::pipeline::CONVERGENCE_BOUND_REACHED,
        codes::save::WRITE_FAILED,
        codes::save::RENAME_FAILED,
        codes::save::WORKER_PANICKED,
    ] {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!("Pipeline code {} not found in metadata registry", code));
        }
    }
    Ok(())
}

/// Process a single file with `engine`
pub fn process_file(path: &Path, engine: &Engine) -> Result<ProcessedFile, PipelineError> {
    process_file_with_id(path, 0, engine)
}

/// Process a single file, tagging its log events with `file_id`
pub fn process_file_with_id(
    path: &Path,
    file_id: usize,
    engine: &Engine,
) -> Result<ProcessedFile, PipelineError> {
    let started = Instant::now();

    logging::with_file_context(path.to_path_buf(), file_id, || {
        log_info!("Processing file",
            "file" => path.display(),
            "category" => engine.options().category);

        let file_result = engine.file_processor().process_file(path)?;
        let metadata = file_result.metadata.clone();
        let stream = crate::lexical::tokenize_file_result(file_result)?;
        let outcome = engine.run(stream)?;

        let duration = started.elapsed();
        log_success!(codes::success::FILE_PROCESSING_SUCCESS, "File processed",
            "file" => path.display(),
            "passes" => outcome.passes.len(),
            "lines" => outcome.stream.line_count(),
            "duration_ms" => format!("{:.2}", duration.as_secs_f64() * 1000.0));

        Ok(ProcessedFile {
            path: path.to_path_buf(),
            metadata,
            outcome,
            duration,
        })
    })
}

/// Process `input` and save the result to `output` on a background thread
///
/// The returned session still holds the running save; `wait` on it to
/// learn whether the write succeeded.
pub fn process_and_save(
    input: &Path,
    output: &Path,
    engine: &Engine,
) -> Result<(ProcessedFile, FileSession), PipelineError> {
    let processed = process_file(input, engine)?;
    let mut session = FileSession::new(output);
    session.save(processed.text().to_string())?;
    Ok((processed, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Category;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_process_and_save() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("scene.wrl");
        let output = dir.path().join("scene.chisel.wrl");
        fs::write(&input, "#VRML V2.0 utf8\nDEF Unused Group { children [ Shape { } ] }\n").unwrap();

        let engine = Engine::with_builtins(PipelineOptions::default());
        let (processed, mut session) = process_and_save(&input, &output, &engine).unwrap();
        assert!(processed.outcome.modified);
        session.wait().unwrap();
        assert_eq!(session.version(), 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "#VRML V2.0 utf8\nGroup { children [ Shape { } ] }\n"
        );
    }

    #[test]
    fn test_validate_pipeline() {
        assert!(validate_pipeline().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let engine = Engine::with_builtins(PipelineOptions {
            category: Category::Format,
            ..PipelineOptions::default()
        });
        assert_matches!(
            process_file(Path::new("/nonexistent/scene.wrl"), &engine),
            Err(PipelineError::FileProcessing(_))
        );
    }

    #[test]
    fn test_pre_cancelled_engine() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("scene.wrl");
        fs::write(&input, "Group { }\n").unwrap();

        let engine = Engine::with_builtins(PipelineOptions::default());
        engine.cancel_token().cancel();
        let error = process_file(&input, &engine).unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(error.error_code(), codes::pipeline::CANCELLED);
    }
}
