//! Configuration module for chisel_core
//! Compile-time limits come from the TOML profile read by build.rs;
//! runtime preferences live in [`runtime`].

// Include generated constants from build.rs
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;

pub use runtime::{
    ConfigError, FileProcessorPreferences, LogLevel, LoggingPreferences, PipelinePreferences,
    PrinterPreferences, RuntimeConfig,
};

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("CHISEL_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("CHISEL_CONFIG_DIR").unwrap_or("config")
    }

    /// Returns configuration source information
    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}

#[cfg(test)]
mod tests {
    use super::compile_time;

    #[test]
    fn test_generated_constants_are_sane() {
        assert!(compile_time::replacement::INDEX_THRESHOLD > 0);
        assert!(compile_time::pipeline::MAX_AUTO_CLEAN >= 1);
        assert!(compile_time::pipeline::DEFAULT_QUANTIZE_RESOLUTION >= 1);
        assert!(compile_time::batch_processing::MAX_WORKER_THREADS >= 1);
    }

    #[test]
    fn test_source_info_mentions_profile() {
        let info = super::build_info::source_info();
        assert!(info.contains(super::build_info::profile()));
        assert!(info.ends_with(".toml"));
    }
}
