// build.rs - TOML-driven constant generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    file_processing: FileProcessingLimits,
    lexical: LexicalLimits,
    replacement: ReplacementLimits,
    printer: PrinterDefaults,
    pipeline: PipelineLimits,
    batch_processing: BatchProcessingLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct FileProcessingLimits {
    max_file_size: u64,
    large_file_threshold: u64,
}

#[derive(serde::Deserialize)]
struct LexicalLimits {
    max_token_count: usize,
    max_identifier_length: usize,
    max_string_size: usize,
}

#[derive(serde::Deserialize)]
struct ReplacementLimits {
    index_threshold: usize,
    initial_request_capacity: usize,
}

#[derive(serde::Deserialize)]
struct PrinterDefaults {
    default_indent_size: usize,
    default_max_line_length: usize,
    wrap_slack: usize,
    comma_slack_unit: usize,
}

#[derive(serde::Deserialize)]
struct PipelineLimits {
    max_auto_clean: u32,
    default_quantize_resolution: u32,
}

#[derive(serde::Deserialize)]
struct BatchProcessingLimits {
    max_worker_threads: usize,
    max_files_per_batch: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    max_log_events_per_file: usize,
    log_buffer_size: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CHISEL_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=CHISEL_CONFIG_DIR");

    let profile = env::var("CHISEL_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("CHISEL_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Find workspace root (parent of chisel_core directory)
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_constraints(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_constraints(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_FILE_SIZE: u64 = 1_000_000_000;
    const ABSOLUTE_MAX_AUTO_CLEAN: u32 = 100;

    if config.file_processing.max_file_size > ABSOLUTE_MAX_FILE_SIZE {
        panic!("max_file_size exceeds absolute maximum");
    }

    if config.replacement.index_threshold == 0 {
        panic!("replacement.index_threshold must be at least 1");
    }

    if config.pipeline.max_auto_clean == 0 || config.pipeline.max_auto_clean > ABSOLUTE_MAX_AUTO_CLEAN {
        panic!("pipeline.max_auto_clean must be between 1 and {}", ABSOLUTE_MAX_AUTO_CLEAN);
    }

    if config.pipeline.default_quantize_resolution == 0 {
        panic!("pipeline.default_quantize_resolution must be at least 1");
    }

    if config.printer.default_max_line_length != 0
        && config.printer.wrap_slack >= config.printer.default_max_line_length
    {
        panic!("printer.wrap_slack must be smaller than printer.default_max_line_length");
    }

    if config.batch_processing.max_worker_threads == 0 {
        panic!("batch_processing.max_worker_threads must be at least 1");
    }

    if profile == "production" && config.file_processing.max_file_size > 50_000_000 {
        panic!("PRODUCTION: max_file_size too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod file_processing {{
        pub const MAX_FILE_SIZE: u64 = {};
        pub const LARGE_FILE_THRESHOLD: u64 = {};
    }}

    pub mod lexical {{
        pub const MAX_TOKEN_COUNT: usize = {};
        pub const MAX_IDENTIFIER_LENGTH: usize = {};
        pub const MAX_STRING_SIZE: usize = {};
    }}

    pub mod replacement {{
        pub const INDEX_THRESHOLD: usize = {};
        pub const INITIAL_REQUEST_CAPACITY: usize = {};
    }}

    pub mod printer {{
        pub const DEFAULT_INDENT_SIZE: usize = {};
        pub const DEFAULT_MAX_LINE_LENGTH: usize = {};
        pub const WRAP_SLACK: usize = {};
        pub const COMMA_SLACK_UNIT: usize = {};
    }}

    pub mod pipeline {{
        pub const MAX_AUTO_CLEAN: u32 = {};
        pub const DEFAULT_QUANTIZE_RESOLUTION: u32 = {};
    }}

    pub mod batch_processing {{
        pub const MAX_WORKER_THREADS: usize = {};
        pub const MAX_FILES_PER_BATCH: usize = {};
    }}

    pub mod logging {{
        pub const MAX_LOG_EVENTS_PER_FILE: usize = {};
        pub const LOG_BUFFER_SIZE: usize = {};
    }}
}}
"#,
        profile,
        config.file_processing.max_file_size,
        config.file_processing.large_file_threshold,
        config.lexical.max_token_count,
        config.lexical.max_identifier_length,
        config.lexical.max_string_size,
        config.replacement.index_threshold,
        config.replacement.initial_request_capacity,
        config.printer.default_indent_size,
        config.printer.default_max_line_length,
        config.printer.wrap_slack,
        config.printer.comma_slack_unit,
        config.pipeline.max_auto_clean,
        config.pipeline.default_quantize_resolution,
        config.batch_processing.max_worker_threads,
        config.batch_processing.max_files_per_batch,
        config.logging.max_log_events_per_file,
        config.logging.log_buffer_size,
    );

    fs::write(output_path, constants_code).unwrap();
}
