//! Batch processing of `.wrl` directories
//!
//! Files are discovered with `walkdir`, then processed sequentially or on a
//! small set of worker threads. Each file is isolated: a failing file is
//! recorded and the batch moves on. Cancellation is reported, not counted
//! as a failure. Output of file N is saved in the background while file
//! N+1 runs through the engine.

use crate::config::compile_time::batch_processing::{MAX_FILES_PER_BATCH, MAX_WORKER_THREADS};
use crate::logging::{codes, Code};
use crate::pipeline::{self, Engine, FileSession, PipelineError, SaveError};
use crate::printer::PrintError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Suffix of files written beside their input
pub const OUTPUT_SUFFIX: &str = "chisel.wrl";

// ============================================================================
// BATCH PROCESSING TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub recursive: bool,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    pub fail_fast: bool,
    /// Save results; beside the input unless `output_dir` is set
    pub write_output: bool,
    /// Mirror the input tree under this directory
    pub output_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_threads: std::thread::available_parallelism()
                .map(|n| n.get().min(MAX_WORKER_THREADS))
                .unwrap_or(1),
            recursive: true,
            max_files: None,
            progress_reporting: false,
            fail_fast: false,
            write_output: true,
            output_dir: None,
        }
    }
}

/// One successfully processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub passes: usize,
    pub modified: bool,
    pub blocked: bool,
    pub lines: usize,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct BatchResults {
    pub successful_files: Vec<FileReport>,
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    pub cancelled_files: Vec<PathBuf>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled_files.len()
    }

    pub fn lines_saved(&self) -> usize {
        self.successful_files
            .iter()
            .filter(|f| f.output.is_some())
            .map(|f| f.lines)
            .sum()
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            self.successful_files.len() as f64 / self.files_processed as f64
        }
    }

    fn record(&mut self, path: PathBuf, outcome: Result<FileReport, PipelineError>) {
        match outcome {
            Ok(report) => {
                self.successful_files.push(report);
                self.files_processed += 1;
            }
            Err(error) if error.is_cancelled() => self.cancelled_files.push(path),
            Err(error) => {
                self.failed_files.push((path, error));
                self.files_processed += 1;
            }
        }
    }

    fn sort(&mut self) {
        self.successful_files.sort_by(|a, b| a.path.cmp(&b.path));
        self.failed_files.sort_by(|a, b| a.0.cmp(&b.0));
        self.cancelled_files.sort();
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch processing completed: {} files processed, {} successful ({:.1}%), {} failed, {} cancelled, {} lines saved, {:.2}s total",
            self.files_processed,
            self.success_count(),
            self.success_rate() * 100.0,
            self.failure_count(),
            self.cancelled_count(),
            self.lines_saved(),
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("No .wrl files found in directory: {path}")]
    NoFilesFound { path: PathBuf },

    #[error("Too many files found: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("Directory traversal failed: {source}")]
    Discovery {
        #[from]
        source: walkdir::Error,
    },

    #[error("Worker thread panicked")]
    WorkerPanicked,
}

impl BatchError {
    pub fn error_code(&self) -> Code {
        match self {
            BatchError::NoFilesFound { .. } => codes::batch::NO_FILES_FOUND,
            BatchError::DirectoryNotFound { .. }
            | BatchError::TooManyFiles { .. }
            | BatchError::Discovery { .. } => codes::batch::DISCOVERY_FAILED,
            BatchError::WorkerPanicked => codes::save::WORKER_PANICKED,
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// `.wrl` input, excluding our own output files
pub fn is_wrl_file(path: &Path) -> bool {
    let is_wrl = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wrl"));
    let is_output = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(&format!(".{}", OUTPUT_SUFFIX)));
    is_wrl && !is_output
}

/// Discover `.wrl` files under `dir_path`, sorted
pub fn discover_wrl_files(dir_path: &Path, config: &BatchConfig) -> Result<Vec<PathBuf>, BatchError> {
    log_info!("Starting file discovery",
        "directory" => dir_path.display(),
        "recursive" => config.recursive);

    if !dir_path.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: dir_path.to_path_buf(),
        });
    }

    let walker = WalkDir::new(dir_path)
        .max_depth(if config.recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_wrl_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    if files.is_empty() {
        let error = BatchError::NoFilesFound {
            path: dir_path.to_path_buf(),
        };
        log_error!(error.error_code(), &error.to_string());
        return Err(error);
    }

    match config.max_files {
        Some(max) if files.len() > max => {
            log_warning!("Reached maximum file limit",
                "files_found" => files.len(),
                "limit" => max);
            files.truncate(max);
        }
        None if files.len() > MAX_FILES_PER_BATCH => {
            return Err(BatchError::TooManyFiles {
                count: files.len(),
                max: MAX_FILES_PER_BATCH,
            });
        }
        _ => {}
    }

    log_debug!("File discovery completed",
        "files_found" => files.len(),
        "directory" => dir_path.display());
    Ok(files)
}

/// Where the result for `input` is saved
pub fn output_path(input: &Path, root: &Path, config: &BatchConfig) -> PathBuf {
    match &config.output_dir {
        Some(dir) => dir.join(input.strip_prefix(root).unwrap_or(input)),
        None => input.with_extension(OUTPUT_SUFFIX),
    }
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

/// A processed file whose output is still being written
struct PendingOutput {
    report: FileReport,
    session: FileSession,
}

impl PendingOutput {
    fn finish(mut self) -> (PathBuf, Result<FileReport, PipelineError>) {
        let path = self.report.path.clone();
        match self.session.wait() {
            Ok(_) => (path, Ok(self.report)),
            Err(error) => (path, Err(error.into())),
        }
    }
}

/// Run one file; with output enabled the save is started but not joined
fn start_file(
    path: &Path,
    file_id: usize,
    root: &Path,
    engine: &Engine,
    config: &BatchConfig,
) -> Result<(FileReport, Option<FileSession>), PipelineError> {
    let processed = pipeline::process_file_with_id(path, file_id, engine)?;
    let mut report = FileReport {
        path: path.to_path_buf(),
        output: None,
        passes: processed.outcome.passes.len(),
        modified: processed.outcome.modified,
        blocked: processed.outcome.blocked,
        lines: processed.outcome.stream.line_count(),
        duration: processed.duration,
    };
    if !config.write_output {
        return Ok((report, None));
    }

    let target = output_path(path, root, config);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| SaveError::Write {
            path: parent.to_path_buf(),
            source: PrintError::Io { source },
        })?;
    }
    let mut session = FileSession::new(&target);
    session.save(processed.outcome.stream.source().to_string())?;
    report.output = Some(target);
    Ok((report, Some(session)))
}

/// Process `files` in order on the current thread
fn process_files(
    files: &[(usize, PathBuf)],
    root: &Path,
    engine: &Engine,
    config: &BatchConfig,
    stop: &AtomicBool,
    total: usize,
) -> BatchResults {
    let mut results = BatchResults::new();
    let mut pending: Option<PendingOutput> = None;

    for (file_id, path) in files {
        if stop.load(Ordering::SeqCst) || engine.cancel_token().is_cancelled() {
            results.record(path.clone(), Err(PipelineError::Cancelled));
            continue;
        }
        if config.progress_reporting {
            println!("Processing file {} of {}: {}", file_id + 1, total, path.display());
        }

        let started = start_file(path, *file_id, root, engine, config);

        // join the previous save now that this file has been through the engine
        if let Some(previous) = pending.take() {
            let (previous_path, outcome) = previous.finish();
            results.record(previous_path, outcome);
        }

        match started {
            Ok((report, Some(session))) => pending = Some(PendingOutput { report, session }),
            Ok((report, None)) => results.record(path.clone(), Ok(report)),
            Err(error) => {
                if error.is_cancelled() {
                    log_info!("File cancelled", "file" => path.display());
                } else {
                    log_error!(error.error_code(), "File processing failed",
                        "file" => path.display(),
                        "error" => &error);
                    if config.fail_fast {
                        log_warning!("Fail-fast mode enabled, stopping batch processing");
                        stop.store(true, Ordering::SeqCst);
                    }
                }
                results.record(path.clone(), Err(error));
            }
        }
    }

    if let Some(previous) = pending.take() {
        let (previous_path, outcome) = previous.finish();
        results.record(previous_path, outcome);
    }
    results
}

/// Process every `.wrl` file under `dir_path`
pub fn process_directory(
    dir_path: &Path,
    engine: &Engine,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    let files = discover_wrl_files(dir_path, config)?;
    let mut results = process_paths(&files, dir_path, engine, config)?;
    results.processing_duration = start_time.elapsed();

    log_success!(codes::success::BATCH_COMPLETE, "Batch processing completed",
        "directory" => dir_path.display(),
        "files_processed" => results.files_processed,
        "successful" => results.success_count(),
        "failed" => results.failure_count(),
        "cancelled" => results.cancelled_count(),
        "lines_saved" => results.lines_saved(),
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0));
    Ok(results)
}

/// Process an explicit list of files relative to `root`
pub fn process_paths(
    files: &[PathBuf],
    root: &Path,
    engine: &Engine,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let indexed: Vec<(usize, PathBuf)> = files.iter().cloned().enumerate().collect();
    let threads = config.max_threads.clamp(1, MAX_WORKER_THREADS).min(files.len().max(1));
    let stop = Arc::new(AtomicBool::new(false));

    log_info!("Starting batch processing",
        "files" => files.len(),
        "threads" => threads);

    let mut results = if threads == 1 {
        process_files(&indexed, root, engine, config, &stop, files.len())
    } else {
        process_parallel(indexed, root, engine, config, stop, threads)?
    };
    results.files_discovered = files.len();
    results.sort();
    Ok(results)
}

fn process_parallel(
    files: Vec<(usize, PathBuf)>,
    root: &Path,
    engine: &Engine,
    config: &BatchConfig,
    stop: Arc<AtomicBool>,
    threads: usize,
) -> Result<BatchResults, BatchError> {
    let total = files.len();
    let shared = Arc::new(Mutex::new(BatchResults::new()));
    let files_per_thread = total.div_ceil(threads);

    let mut handles = Vec::new();
    for chunk in files.chunks(files_per_thread) {
        let chunk = chunk.to_vec();
        let engine = engine.clone();
        let config = config.clone();
        let root = root.to_path_buf();
        let stop = Arc::clone(&stop);
        let shared = Arc::clone(&shared);

        handles.push(thread::spawn(move || {
            let partial = process_files(&chunk, &root, &engine, &config, &stop, total);
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            guard.successful_files.extend(partial.successful_files);
            guard.failed_files.extend(partial.failed_files);
            guard.cancelled_files.extend(partial.cancelled_files);
            guard.files_processed += partial.files_processed;
        }));
    }

    let mut panicked = false;
    for handle in handles {
        panicked |= handle.join().is_err();
    }
    if panicked {
        log_error!(codes::save::WORKER_PANICKED, "Batch worker panicked");
        return Err(BatchError::WorkerPanicked);
    }

    let results = std::mem::take(&mut *shared.lock().unwrap_or_else(PoisonError::into_inner));
    Ok(results)
}
