//! CLI argument definitions for the coursebot application.
//!
//! Uses `clap` with derive macros. Priority resolution:
//! CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Coursebot — a university course selection assistant over the JAMB
/// brochure dataset.
#[derive(Parser, Debug)]
#[command(name = "coursebot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the course catalog CSV.
    #[arg(long = "catalog")]
    pub catalog: Option<PathBuf>,

    /// Directory with the sentence-transformer ONNX export.
    #[arg(long = "embedding-dir")]
    pub embedding_dir: Option<PathBuf>,

    /// Directory with the NLI classifier ONNX export.
    #[arg(long = "classifier-dir")]
    pub classifier_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Use deterministic mock model backends instead of ONNX models.
    #[arg(long = "mock-models")]
    pub mock_models: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > COURSEBOT_CONFIG env var >
    /// ~/.coursebot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("COURSEBOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the catalog CSV path override, if any.
    ///
    /// Priority: --catalog flag > COURSEBOT_CATALOG env var > config file.
    pub fn resolve_catalog_path(&self) -> Option<String> {
        if let Some(ref p) = self.catalog {
            return Some(p.to_string_lossy().to_string());
        }
        std::env::var("COURSEBOT_CATALOG").ok()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".coursebot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".coursebot").join("config.toml");
    }
    PathBuf::from("config.toml")
}
