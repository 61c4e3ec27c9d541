//! Consolidated event codes and classification
//!
//! Single source of truth for every code the engine emits together with its
//! behavioural metadata (category, severity, recoverability).

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for error, warning and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub const fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// CODE CONSTANTS
// ============================================================================

pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
    pub const CONFIGURATION_ERROR: Code = Code::new("ERR003");
}

pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const INVALID_EXTENSION: Code = Code::new("E006");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const EMPTY_FILE: Code = Code::new("E008");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
}

pub mod lexical {
    use super::Code;

    pub const UNTERMINATED_STRING: Code = Code::new("E020");
    pub const TOO_MANY_TOKENS: Code = Code::new("E021");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E022");
    pub const STRING_TOO_LARGE: Code = Code::new("E023");
}

pub mod printer {
    use super::Code;

    pub const SINK_IO_FAILURE: Code = Code::new("E030");
    pub const RELEX_FAILURE: Code = Code::new("E031");
}

pub mod replacement {
    use super::Code;

    pub const INVALID_RANGE: Code = Code::new("E040");
    pub const RANGE_OUT_OF_BOUNDS: Code = Code::new("E041");
    pub const UNKNOWN_OWNER: Code = Code::new("E042");
}

pub mod scene {
    use super::Code;

    pub const UNEXPECTED_EOF: Code = Code::new("E050");
    pub const UNBALANCED_BRACKETS: Code = Code::new("E051");
    pub const UNDEFINED_USE: Code = Code::new("E052");
    pub const DUPLICATE_DEF: Code = Code::new("W053");
    pub const NESTING_TOO_DEEP: Code = Code::new("E054");
}

pub mod transform {
    use super::Code;

    pub const UNKNOWN_TRANSFORM: Code = Code::new("E061");
}

pub mod pipeline {
    use super::Code;

    pub const VALIDATION_BLOCKED: Code = Code::new("E070");
    pub const CANCELLED: Code = Code::new("W071");
    pub const CONVERGENCE_BOUND_REACHED: Code = Code::new("W072");
}

pub mod save {
    use super::Code;

    pub const WRITE_FAILED: Code = Code::new("E080");
    pub const RENAME_FAILED: Code = Code::new("E081");
    pub const WORKER_PANICKED: Code = Code::new("E082");
}

pub mod batch {
    use super::Code;

    pub const NO_FILES_FOUND: Code = Code::new("E090");
    pub const DISCOVERY_FAILED: Code = Code::new("E091");
}

pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const SCENE_BUILD_COMPLETE: Code = Code::new("I050");
    pub const PASS_COMPLETE: Code = Code::new("I070");
    pub const PIPELINE_CONVERGED: Code = Code::new("I071");
    pub const SAVE_COMPLETE: Code = Code::new("I080");
    pub const BATCH_COMPLETE: Code = Code::new("I090");
}

// ============================================================================
// METADATA REGISTRY
// ============================================================================

#[rustfmt::skip]
const METADATA: &[ErrorMetadata] = &[
    // System
    ErrorMetadata::new("ERR001", "System", Severity::Critical, false, true,
        "Critical internal error", "File a bug report with the input that triggered it"),
    ErrorMetadata::new("ERR002", "System", Severity::Critical, false, true,
        "Logging or engine initialization failed", "Check configuration and restart"),
    ErrorMetadata::new("ERR003", "System", Severity::High, true, false,
        "Runtime preference file could not be loaded", "Fix the TOML file or remove --config"),
    // File processing
    ErrorMetadata::new("E005", "FileProcessing", Severity::High, true, false,
        "Input file not found", "Verify the path exists"),
    ErrorMetadata::new("E006", "FileProcessing", Severity::Medium, true, false,
        "Input file does not have a .wrl extension", "Rename the file or disable the extension check"),
    ErrorMetadata::new("E007", "FileProcessing", Severity::High, true, false,
        "Input file exceeds the configured size limit", "Split the scene or raise max_file_size"),
    ErrorMetadata::new("E008", "FileProcessing", Severity::Low, true, false,
        "Input file is empty", "Nothing to do for this file"),
    ErrorMetadata::new("E009", "FileProcessing", Severity::High, true, false,
        "Permission denied", "Check file permissions"),
    ErrorMetadata::new("E010", "FileProcessing", Severity::Medium, true, false,
        "Input file is not valid UTF-8 text", "Convert the file to UTF-8"),
    ErrorMetadata::new("E011", "FileProcessing", Severity::High, true, false,
        "I/O error while reading input", "Retry or check the storage device"),
    // Lexical
    ErrorMetadata::new("E020", "Lexical", Severity::High, true, false,
        "Quoted string is never closed", "Add the closing quote"),
    ErrorMetadata::new("E021", "Lexical", Severity::High, true, false,
        "Token count limit exceeded", "Split the scene into smaller files"),
    ErrorMetadata::new("E022", "Lexical", Severity::Medium, true, false,
        "Identifier exceeds the maximum length", "Shorten the identifier"),
    ErrorMetadata::new("E023", "Lexical", Severity::Medium, true, false,
        "Quoted string exceeds the maximum size", "Move the payload to an external resource"),
    // Printer
    ErrorMetadata::new("E030", "Printer", Severity::High, true, false,
        "Output sink reported an I/O failure", "Check free space and permissions on the output"),
    ErrorMetadata::new("E031", "Printer", Severity::High, true, false,
        "Generated output could not be re-tokenized", "Report the transform that produced it"),
    // Replacement
    ErrorMetadata::new("E040", "Replacement", Severity::Critical, false, true,
        "Replacement range ends before it starts", "Fix the transform registering the range"),
    ErrorMetadata::new("E041", "Replacement", Severity::Critical, false, true,
        "Replacement range lies outside the token stream", "Fix the transform registering the range"),
    ErrorMetadata::new("E042", "Replacement", Severity::Critical, false, true,
        "Replacement refers to an unknown owner", "Fix the transform registering the range"),
    // Scene
    ErrorMetadata::new("E050", "Scene", Severity::High, true, false,
        "Input ended inside a node or field", "Check for truncated input"),
    ErrorMetadata::new("E051", "Scene", Severity::High, true, false,
        "Unbalanced brackets or braces", "Close every [ and { that is opened"),
    ErrorMetadata::new("E052", "Scene", Severity::High, true, false,
        "USE refers to a name that was never defined", "Define the node before using it"),
    ErrorMetadata::new("W053", "Scene", Severity::Low, true, false,
        "The same DEF name is defined more than once", "Rename one of the definitions"),
    ErrorMetadata::new("E054", "Scene", Severity::High, false, true,
        "Nodes are nested deeper than the scene builder allows", "Flatten the scene hierarchy"),
    // Transform
    ErrorMetadata::new("E061", "Transform", Severity::Medium, true, false,
        "No transform is registered under the given key", "Run with --list to see valid keys"),
    // Pipeline
    ErrorMetadata::new("E070", "Pipeline", Severity::High, true, false,
        "Validation found blocking errors; transforms were skipped", "Fix the reported errors first"),
    ErrorMetadata::new("W071", "Pipeline", Severity::Low, true, false,
        "Processing was cancelled before output was committed", "Re-run when ready"),
    ErrorMetadata::new("W072", "Pipeline", Severity::Low, true, false,
        "Auto-clean stopped at its pass limit before reaching a fixed point", "Run clean again if more reduction is wanted"),
    // Save
    ErrorMetadata::new("E080", "Save", Severity::High, true, false,
        "Writing the output file failed", "Check free space and permissions"),
    ErrorMetadata::new("E081", "Save", Severity::High, true, false,
        "Moving the temporary output into place failed", "Check the target directory"),
    ErrorMetadata::new("E082", "Save", Severity::Critical, false, false,
        "The save thread terminated abnormally", "File a bug report"),
    // Batch
    ErrorMetadata::new("E090", "Batch", Severity::Medium, true, false,
        "No .wrl files were found", "Check the input directory"),
    ErrorMetadata::new("E091", "Batch", Severity::High, true, false,
        "Directory traversal failed", "Check directory permissions"),
    // Success
    ErrorMetadata::new("I001", "Success", Severity::Low, true, false,
        "Operation completed successfully", "No action needed"),
    ErrorMetadata::new("I004", "Success", Severity::Low, true, false,
        "System initialization completed", "No action needed"),
    ErrorMetadata::new("I006", "Success", Severity::Low, true, false,
        "File processed successfully", "No action needed"),
    ErrorMetadata::new("I020", "Success", Severity::Low, true, false,
        "Tokenization completed", "No action needed"),
    ErrorMetadata::new("I050", "Success", Severity::Low, true, false,
        "Scene structure built", "No action needed"),
    ErrorMetadata::new("I070", "Success", Severity::Low, true, false,
        "Transform pass completed", "No action needed"),
    ErrorMetadata::new("I071", "Success", Severity::Low, true, false,
        "Pipeline reached a stable result", "No action needed"),
    ErrorMetadata::new("I080", "Success", Severity::Low, true, false,
        "Output saved", "No action needed"),
    ErrorMetadata::new("I090", "Success", Severity::Low, true, false,
        "Batch run completed", "No action needed"),
];

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, &'static ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, &'static ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| METADATA.iter().map(|m| (m.code, m)).collect())
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code).copied()
}

pub fn get_severity(code: &str) -> Severity {
    get_error_metadata(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn requires_halt(code: &str) -> bool {
    get_error_metadata(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

pub fn get_description(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_metadata(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_codes_are_unique() {
        let unique: HashSet<_> = METADATA.iter().map(|m| m.code).collect();
        assert_eq!(unique.len(), METADATA.len());
    }

    #[test]
    fn test_every_constant_has_metadata() {
        let codes = [
            system::INTERNAL_ERROR,
            system::CONFIGURATION_ERROR,
            file_processing::FILE_TOO_LARGE,
            lexical::UNTERMINATED_STRING,
            printer::SINK_IO_FAILURE,
            replacement::INVALID_RANGE,
            scene::UNDEFINED_USE,
            scene::DUPLICATE_DEF,
            transform::UNKNOWN_TRANSFORM,
            pipeline::CANCELLED,
            save::WORKER_PANICKED,
            batch::NO_FILES_FOUND,
            success::BATCH_COMPLETE,
        ];
        for code in codes {
            assert!(get_error_metadata(code.as_str()).is_some(), "{}", code);
        }
    }

    #[test]
    fn test_classification() {
        assert!(requires_halt("E040"));
        assert!(!is_recoverable("E040"));
        assert_eq!(get_category("W053"), "Scene");
        assert_eq!(get_severity("nope"), Severity::Medium);
        assert_eq!(get_description("nope"), "Unknown error");
    }
}
