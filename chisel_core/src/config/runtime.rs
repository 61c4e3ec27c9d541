// RUNTIME PREFERENCES (User Experience)
//
// Every preference defaults from a CHISEL_* environment variable and can be
// overridden by a TOML preference file. The pipeline reads these through
// explicit option values handed to each run.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

use crate::config::compile_time;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read preference file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid preference file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn error_code(&self) -> crate::logging::Code {
        crate::logging::codes::system::CONFIGURATION_ERROR
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProcessorPreferences {
    /// Whether to require the .wrl extension on single-file input
    pub require_wrl_extension: bool,

    /// Whether to log read timings per file
    pub enable_performance_logging: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        Self {
            require_wrl_extension: env::var(env_vars::REQUIRE_WRL_EXTENSION)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_performance_logging: env::var(env_vars::ENABLE_PERFORMANCE_LOGGING)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterPreferences {
    /// Spaces per nesting level in pretty mode; 0 disables indentation
    pub indent_size: usize,

    /// Soft wrap column; 0 disables wrapping
    pub max_line_length: usize,

    /// Drop comment tokens while copying
    pub strip_comments: bool,

    /// Prefer a comma over a forced line break when the line has room
    pub comma_for_number_break: bool,

    /// Indent and apply the field-aware line-break rules
    pub pretty_print: bool,
}

impl Default for PrinterPreferences {
    fn default() -> Self {
        Self {
            indent_size: env::var(env_vars::PRINTER_INDENT_SIZE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(compile_time::printer::DEFAULT_INDENT_SIZE),
            max_line_length: env::var(env_vars::PRINTER_MAX_LINE_LENGTH)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(compile_time::printer::DEFAULT_MAX_LINE_LENGTH),
            strip_comments: env::var(env_vars::PRINTER_STRIP_COMMENTS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            comma_for_number_break: env::var(env_vars::PRINTER_COMMA_BREAKS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            pretty_print: env::var(env_vars::PRINTER_PRETTY_PRINT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinePreferences {
    /// Repeat the clean category until the profile stops changing
    pub auto_clean: bool,

    /// Significant digits kept by the quantize transform
    pub quantize_resolution: u32,

    /// Registry keys the user switched off
    pub disabled_transforms: Vec<String>,
}

impl Default for PipelinePreferences {
    fn default() -> Self {
        Self {
            auto_clean: env::var(env_vars::PIPELINE_AUTO_CLEAN)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            quantize_resolution: env::var(env_vars::PIPELINE_QUANTIZE_RESOLUTION)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(compile_time::pipeline::DEFAULT_QUANTIZE_RESOLUTION),
            disabled_transforms: env::var(env_vars::PIPELINE_DISABLED_TRANSFORMS)
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Minimum level written by the console and JSON loggers
    pub min_log_level: LogLevel,

    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Forward events to the `log` facade instead of printing directly
    pub use_log_facade: bool,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            use_structured_logging: env::var(env_vars::LOGGING_USE_STRUCTURED)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            use_log_facade: env::var(env_vars::LOGGING_USE_FACADE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            include_file_context: env::var(env_vars::LOGGING_INCLUDE_FILE_CONTEXT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }

    /// Parse a user-supplied level name ("warn", "2", ...)
    pub fn parse(level: &str) -> Option<Self> {
        parse_log_level(level)
    }
}

fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "trace" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub file_processor: FileProcessorPreferences,
    pub printer: PrinterPreferences,
    pub pipeline: PipelinePreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Parse a preference document. Missing sections and keys keep their
    /// environment-derived defaults.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a preference file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // File Processor
    pub const REQUIRE_WRL_EXTENSION: &str = "CHISEL_REQUIRE_WRL_EXTENSION";
    pub const ENABLE_PERFORMANCE_LOGGING: &str = "CHISEL_ENABLE_PERFORMANCE_LOGGING";

    // Printer
    pub const PRINTER_INDENT_SIZE: &str = "CHISEL_PRINTER_INDENT_SIZE";
    pub const PRINTER_MAX_LINE_LENGTH: &str = "CHISEL_PRINTER_MAX_LINE_LENGTH";
    pub const PRINTER_STRIP_COMMENTS: &str = "CHISEL_PRINTER_STRIP_COMMENTS";
    pub const PRINTER_COMMA_BREAKS: &str = "CHISEL_PRINTER_COMMA_BREAKS";
    pub const PRINTER_PRETTY_PRINT: &str = "CHISEL_PRINTER_PRETTY_PRINT";

    // Pipeline
    pub const PIPELINE_AUTO_CLEAN: &str = "CHISEL_PIPELINE_AUTO_CLEAN";
    pub const PIPELINE_QUANTIZE_RESOLUTION: &str = "CHISEL_PIPELINE_QUANTIZE_RESOLUTION";
    pub const PIPELINE_DISABLED_TRANSFORMS: &str = "CHISEL_PIPELINE_DISABLED_TRANSFORMS";

    // Logging
    pub const LOGGING_MIN_LEVEL: &str = "CHISEL_LOGGING_MIN_LEVEL";
    pub const LOGGING_USE_STRUCTURED: &str = "CHISEL_LOGGING_USE_STRUCTURED";
    pub const LOGGING_USE_FACADE: &str = "CHISEL_LOGGING_USE_FACADE";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "CHISEL_LOGGING_INCLUDE_FILE_CONTEXT";
}
