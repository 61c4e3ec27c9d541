//! # chisel
//!
//! Command-line front end: optimize one `.wrl` file or every `.wrl` file
//! under a directory with one category of chisels.

use chisel_core::batch::{self, BatchConfig, BatchResults};
use chisel_core::config::{LogLevel, RuntimeConfig};
use chisel_core::file_processor::FileProcessor;
use chisel_core::logging::{self, codes};
use chisel_core::pipeline::{self, Engine, PipelineOptions, ProcessedFile};
use chisel_core::transform::{Category, TransformRegistry};
use chisel_core::{log_error, log_info, log_success};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "chisel", version)]
#[command(about = "Rewrite VRML scenes with token-level chisels")]
struct Args {
    /// A .wrl file or a directory of them
    #[arg(required_unless_present = "list")]
    input: Option<PathBuf>,

    /// validators, format, clean, condense, reduce, reorganize or mutate
    #[arg(long, default_value = "clean")]
    category: String,

    /// Output file (single input) or directory (batch)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Indent and apply field-aware line breaks
    #[arg(long)]
    pretty: bool,

    #[arg(long)]
    indent: Option<usize>,

    /// Soft wrap column; 0 disables wrapping
    #[arg(long)]
    max_line: Option<usize>,

    #[arg(long)]
    strip_comments: bool,

    /// Prefer commas over forced breaks between numbers
    #[arg(long)]
    comma_breaks: bool,

    #[arg(long)]
    no_auto_clean: bool,

    /// Switch off a transform by key; may be repeated
    #[arg(long, value_name = "KEY")]
    disable: Vec<String>,

    /// Significant digits kept by quantize
    #[arg(long)]
    resolution: Option<u32>,

    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,

    #[arg(long)]
    sequential: bool,

    #[arg(long)]
    no_recursive: bool,

    #[arg(long)]
    max_files: Option<usize>,

    /// Stop a batch after the first failing file
    #[arg(long)]
    fail_fast: bool,

    #[arg(long, short)]
    quiet: bool,

    /// Runtime preference file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// error, warn, info or debug
    #[arg(long)]
    log_level: Option<String>,

    /// One JSON object per log event
    #[arg(long)]
    json_log: bool,

    /// Route events through the `log` facade (RUST_LOG applies)
    #[arg(long)]
    log_facade: bool,

    /// Print the transform registry and exit
    #[arg(long)]
    list: bool,
}

/// Fold command-line flags over the loaded preferences
fn apply_overrides(args: &Args, config: &mut RuntimeConfig) -> Result<(), String> {
    let printer = &mut config.printer;
    printer.pretty_print |= args.pretty;
    printer.strip_comments |= args.strip_comments;
    printer.comma_for_number_break |= args.comma_breaks;
    if let Some(indent) = args.indent {
        printer.indent_size = indent;
    }
    if let Some(max_line) = args.max_line {
        printer.max_line_length = max_line;
    }

    let pipeline = &mut config.pipeline;
    if args.no_auto_clean {
        pipeline.auto_clean = false;
    }
    if let Some(resolution) = args.resolution {
        if resolution == 0 {
            return Err("--resolution must be at least 1".to_string());
        }
        pipeline.quantize_resolution = resolution;
    }
    for key in &args.disable {
        if !pipeline.disabled_transforms.contains(key) {
            pipeline.disabled_transforms.push(key.clone());
        }
    }

    let logging = &mut config.logging;
    if let Some(level) = &args.log_level {
        logging.min_log_level =
            LogLevel::parse(level).ok_or_else(|| format!("Unknown log level '{}'", level))?;
    }
    if args.quiet {
        logging.min_log_level = LogLevel::Error;
    }
    logging.use_structured_logging |= args.json_log;
    logging.use_log_facade |= args.log_facade;
    Ok(())
}

fn init_logging(config: &RuntimeConfig) -> Result<(), String> {
    let preferences = config.logging.clone();
    if preferences.use_log_facade {
        let filter: log::LevelFilter =
            preferences.min_log_level.to_events_log_level().to_facade_level().to_level_filter();
        env_logger::Builder::new()
            .filter_level(filter)
            .parse_default_env()
            .try_init()
            .map_err(|e| format!("Failed to install log backend: {}", e))?;
    }
    logging::config::init_runtime_preferences(preferences)?;
    logging::init_global_logging()
}

fn print_registry(registry: &TransformRegistry) {
    println!("{:<16} {:<12} DESCRIPTION", "KEY", "CATEGORY");
    for category in Category::ALL {
        for entry in registry.category(category) {
            println!("{:<16} {:<12} {}", entry.key, entry.category, entry.description);
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                logging::safe_log_error(e.error_code(), &e.to_string());
                return ExitCode::from(2);
            }
        },
        None => RuntimeConfig::default(),
    };
    if let Err(e) = apply_overrides(&args, &mut config) {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }
    if let Err(e) = init_logging(&config).and_then(|()| pipeline::validate_pipeline()) {
        logging::safe_log_error(codes::system::INITIALIZATION_FAILURE, &e);
        return ExitCode::from(2);
    }

    let registry = Arc::new(TransformRegistry::with_builtins());
    if args.list {
        print_registry(&registry);
        return ExitCode::SUCCESS;
    }

    match run(&args, &config, registry) {
        Ok(success) => {
            if !args.quiet {
                if let Some(summary) = logging::cargo_style_summary() {
                    print!("{}", summary);
                }
            }
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(message) => {
            log_error!(codes::system::INTERNAL_ERROR, &message);
            eprintln!("Error: {}", message);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every input came through cleanly
fn run(args: &Args, config: &RuntimeConfig, registry: Arc<TransformRegistry>) -> Result<bool, String> {
    let category: Category = args.category.parse().map_err(|e| format!("{}", e))?;
    for key in &config.pipeline.disabled_transforms {
        if !registry.contains(key) {
            return Err(format!("Unknown transform '{}' (see --list)", key));
        }
    }

    let options = PipelineOptions::from_preferences(category, &config.printer, &config.pipeline);
    let engine = Engine::new(registry, options)
        .with_file_processor(FileProcessor::from_preferences(&config.file_processor));

    let Some(input) = args.input.as_deref() else {
        return Err("No input given".to_string());
    };
    log_info!("chisel starting",
        "input" => input.display(),
        "category" => category);

    if input.is_file() {
        optimize_file(args, input, &engine)
    } else if input.is_dir() {
        optimize_directory(args, input, &engine)
    } else {
        Err(format!("Input must be a .wrl file or directory: {}", input.display()))
    }
}

fn report_file(processed: &ProcessedFile) {
    let outcome = &processed.outcome;
    for diagnostic in &outcome.diagnostics {
        let kind = if diagnostic.blocking { "error" } else { "warning" };
        match diagnostic.token.and_then(|t| outcome.stream.line_number(t)) {
            Some(line) => println!("  {}[{}] line {}: {}", kind, diagnostic.code, line, diagnostic.message),
            None => println!("  {}[{}]: {}", kind, diagnostic.code, diagnostic.message),
        }
    }
    let status = if outcome.blocked {
        "BLOCKED"
    } else if outcome.modified {
        "MODIFIED"
    } else {
        "UNCHANGED"
    };
    println!(
        "{}: {} ({} passes, {} lines, {:.2}s)",
        processed.path.display(),
        status,
        outcome.passes.len(),
        outcome.stream.line_count(),
        processed.duration.as_secs_f64()
    );
}

fn optimize_file(args: &Args, input: &Path, engine: &Engine) -> Result<bool, String> {
    if engine.options().category == Category::Validators {
        let processed = pipeline::process_file(input, engine).map_err(|e| e.to_string())?;
        if !args.quiet {
            report_file(&processed);
        }
        let clean = processed.outcome.errors().next().is_none();
        return Ok(clean);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension(batch::OUTPUT_SUFFIX));
    let (processed, mut session) =
        pipeline::process_and_save(input, &output, engine).map_err(|e| e.to_string())?;
    let saved = session.wait().map_err(|e| e.to_string())?;

    if !args.quiet {
        report_file(&processed);
        if let Some(report) = saved {
            println!("[OK] Saved {} lines to {}", report.lines, report.path.display());
        }
    }
    Ok(!processed.outcome.blocked)
}

fn print_batch_summary(dir: &Path, results: &BatchResults) {
    println!("\n=== Batch Summary ===");
    println!("Directory: {}", dir.display());
    println!("Files: {}", results.files_discovered);
    println!("Successful: {}", results.success_count());
    println!("Failed: {}", results.failure_count());
    println!("Cancelled: {}", results.cancelled_count());
    println!("Lines saved: {}", results.lines_saved());
    println!("Duration: {:.2}s", results.processing_duration.as_secs_f64());
    for (path, error) in &results.failed_files {
        println!("  FAILED {}: {}", path.display(), error);
    }
}

fn optimize_directory(args: &Args, dir: &Path, engine: &Engine) -> Result<bool, String> {
    let started = Instant::now();
    let config = BatchConfig {
        max_threads: if args.sequential { 1 } else { args.threads.max(1) },
        recursive: !args.no_recursive,
        max_files: args.max_files,
        progress_reporting: !args.quiet,
        fail_fast: args.fail_fast,
        write_output: engine.options().category != Category::Validators,
        output_dir: args.output.clone(),
    };

    let results = batch::process_directory(dir, engine, &config).map_err(|e| {
        log_error!(e.error_code(), "Batch processing failed", "error" => &e);
        e.to_string()
    })?;

    if !args.quiet {
        print_batch_summary(dir, &results);
    }
    log_success!(codes::success::OPERATION_COMPLETED_SUCCESSFULLY, "chisel finished",
        "files" => results.files_discovered,
        "duration_ms" => started.elapsed().as_millis());

    Ok(results.failure_count() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("chisel").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_input_required_unless_listing() {
        assert!(Args::try_parse_from(["chisel"]).is_err());
        assert!(parse(&["--list"]).input.is_none());
    }

    #[test]
    fn test_overrides_fold_into_preferences() {
        let args = parse(&[
            "scene.wrl",
            "--pretty",
            "--indent",
            "2",
            "--no-auto-clean",
            "--disable",
            "unused_defs",
            "--disable",
            "unused_defs",
            "--resolution",
            "4",
            "--quiet",
        ]);
        let mut config = RuntimeConfig::default();
        apply_overrides(&args, &mut config).unwrap();

        assert!(config.printer.pretty_print);
        assert_eq!(config.printer.indent_size, 2);
        assert!(!config.pipeline.auto_clean);
        assert_eq!(config.pipeline.quantize_resolution, 4);
        assert_eq!(
            config.pipeline.disabled_transforms.iter().filter(|k| *k == "unused_defs").count(),
            1
        );
        assert_eq!(config.logging.min_log_level, LogLevel::Error);
    }

    #[test]
    fn test_bad_overrides_are_rejected() {
        let mut config = RuntimeConfig::default();
        assert!(apply_overrides(&parse(&["a.wrl", "--resolution", "0"]), &mut config).is_err());
        assert!(apply_overrides(&parse(&["a.wrl", "--log-level", "loud"]), &mut config).is_err());
    }

    #[test]
    fn test_unknown_category_and_transform() {
        let registry = Arc::new(TransformRegistry::with_builtins());
        let config = RuntimeConfig::default();
        assert!(run(&parse(&["a.wrl", "--category", "sculpt"]), &config, registry.clone()).is_err());

        let mut config = RuntimeConfig::default();
        let args = parse(&["a.wrl", "--disable", "no_such_chisel"]);
        apply_overrides(&args, &mut config).unwrap();
        assert!(run(&args, &config, registry).is_err());
    }

    #[test]
    fn test_single_file_writes_beside_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("scene.wrl");
        fs::write(&input, "DEF Unused Group { children [ Shape { } ] }\n").unwrap();

        let args = parse(&[input.to_str().unwrap(), "--quiet"]);
        let mut config = RuntimeConfig::default();
        apply_overrides(&args, &mut config).unwrap();
        let success = run(&args, &config, Arc::new(TransformRegistry::with_builtins())).unwrap();

        assert!(success);
        assert_eq!(
            fs::read_to_string(dir.path().join("scene.chisel.wrl")).unwrap(),
            "Group { children [ Shape { } ] }\n"
        );
    }
}
