//! Where settings and scene models live on disk.
//!
//! Settings go to the platform config dir, models to the local data dir:
//!
//! | Platform | settings.toml                                      | models/                                           |
//! |----------|----------------------------------------------------|---------------------------------------------------|
//! | Windows  | `%APPDATA%\scene-classifier\`                      | `%LOCALAPPDATA%\scene-classifier\models\`         |
//! | macOS    | `~/Library/Application Support/scene-classifier/` | `~/Library/Application Support/scene-classifier/models/` |
//! | Linux    | `~/.config/scene-classifier/`                      | `~/.local/share/scene-classifier/models/`         |
//!
//! # Model artifacts
//!
//! Each model is a set of files sharing one stem inside `models/`:
//!
//! ```text
//! models/
//! ├── resnet18-places365.onnx   network (required)
//! ├── resnet18-places365.json   input size, channel order, mean/std (optional)
//! └── resnet18-places365.txt    one class per line, Places-style `/a/abbey 0` accepted
//! ```
//!
//! Without the `.json` sidecar the loader assumes 224×224 RGB with ImageNet
//! normalisation.  `model.path` in `settings.toml` points at an `.onnx`
//! anywhere else; its sidecars are looked up next to it.

use std::path::{Path, PathBuf};

const APP_NAME: &str = "scene-classifier";

/// Resolved settings file and models directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// Directory scanned for model artifacts.
    pub models_dir: PathBuf,
}

impl AppPaths {
    /// Platform locations from `dirs`.  A platform without a config or data
    /// dir falls back to the working directory.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }

    /// Everything under one directory: `<root>/settings.toml` and
    /// `<root>/models/`.
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            settings_file: root.join("settings.toml"),
            models_dir: root.join("models"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_paths_end_in_app_dirs() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.ends_with(APP_NAME));
        assert!(paths.models_dir.ends_with(Path::new(APP_NAME).join("models")));
        assert_eq!(paths.settings_file, paths.config_dir.join("settings.toml"));
    }

    #[test]
    fn in_dir_keeps_everything_under_root() {
        let paths = AppPaths::in_dir("/srv/scenes");
        assert_eq!(paths.settings_file, Path::new("/srv/scenes/settings.toml"));
        assert_eq!(paths.models_dir, Path::new("/srv/scenes/models"));
    }
}
