//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::classifier::ModelPaths;
use crate::pipeline::StaleRunPolicy;
use crate::preprocess::{FilterKind, PixelFormat, Preprocessor, ResizeMode, TargetSize};

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Which scene model to run and how to hold it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registry id (e.g. `"resnet18-places365"`) or the file stem of a custom
    /// model under the models directory.
    pub id: String,
    /// Explicit `.onnx` path; overrides `id` when set.
    pub path: Option<PathBuf>,
    /// Width the preprocessor resizes to.  Must match the model input.
    pub input_width: u32,
    /// Height the preprocessor resizes to.  Must match the model input.
    pub input_height: u32,
    /// Keep the loaded model for the whole session instead of reloading it
    /// for every photo.
    pub cache: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "resnet18-places365".into(),
            path: None,
            input_width: 224,
            input_height: 224,
            cache: true,
        }
    }
}

impl ModelConfig {
    /// Location of the ONNX artifact.
    pub fn resolve_path(&self, paths: &AppPaths) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => ModelPaths::from_app_paths(paths).path_for_id(&self.id),
        }
    }

    pub fn target(&self) -> TargetSize {
        TargetSize::new(self.input_width, self.input_height)
    }
}

// ---------------------------------------------------------------------------
// PreprocessConfig
// ---------------------------------------------------------------------------

/// Resampling policy for the preprocessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub mode: ResizeMode,
    pub filter: FilterKind,
    pub format: PixelFormat,
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Drop results of runs that were superseded by a newer selection.
    ///
    /// `false` restores last-writer-wins: whichever run finishes last is
    /// displayed, even if it belongs to an older photo.
    pub discard_stale_results: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discard_stale_results: true,
        }
    }
}

impl PipelineConfig {
    pub fn stale_policy(&self) -> StaleRunPolicy {
        if self.discard_stale_results {
            StaleRunPolicy::DiscardStale
        } else {
            StaleRunPolicy::LastWriterWins
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window settings for the display layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Initial inner window size in logical pixels.
    pub window_size: (f32, f32),
    /// Keep the window above all others.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (360.0, 480.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use scene_classifier::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load().unwrap();
///
/// // Modify and save
/// config.model.cache = false;
/// config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scene model selection.
    pub model: ModelConfig,
    /// Resize policy.
    pub preprocess: PreprocessConfig,
    /// Run orchestration.
    pub pipeline: PipelineConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }

    /// The preprocessor described by the `model` and `preprocess` sections.
    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(self.model.target())
            .with_mode(self.preprocess.mode)
            .with_filter(self.preprocess.filter)
            .with_format(self.preprocess.format)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
