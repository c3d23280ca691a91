use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoursebotError, Result};

/// Top-level configuration for the coursebot application.
///
/// Loaded from `~/.coursebot/config.toml` by default. Each section maps to
/// one crate's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursebotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl CoursebotConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CoursebotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoursebotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory for exported logs and other writable data.
    pub data_dir: String,
    /// Default log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.coursebot".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Catalog source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the course CSV extracted from the JAMB brochure.
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "data/courses.csv".to_string(),
        }
    }
}

/// Model backend settings.
///
/// Both model directories are expected to contain `model.onnx` and
/// `tokenizer.json`. When a directory is empty the application falls back
/// to the deterministic mock backends (useful for smoke runs and tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Sentence-transformer export used by the intent scorer.
    pub embedding_dir: String,
    /// NLI cross-encoder export used by the zero-shot classifier.
    pub classifier_dir: String,
    /// Cosine-similarity threshold above which input counts as affirmative.
    pub intent_threshold: f64,
    /// Hypothesis template for zero-shot classification. `{}` is replaced
    /// with the candidate label.
    pub hypothesis_template: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dir: String::new(),
            classifier_dir: String::new(),
            intent_threshold: 0.65,
            hypothesis_template: "This text is about {}.".to_string(),
        }
    }
}

/// Chat session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub enabled: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
