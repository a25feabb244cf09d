//! Application configuration.

use crate::AppResult;
use inkleaf_core::config::EngineConfig;
use inkleaf_render::RenderConfig;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration, loaded from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Screen position of the drawing surface.
    pub surface_origin: Point,
    /// Surface size in device pixels.
    pub surface_size: Size,
    /// Number of pages in the session notebook.
    pub pages: usize,
    pub engine: EngineConfig,
    pub render: RenderConfig,
    /// Where snapshots and the notebook dump are written.
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surface_origin: Point::ZERO,
            surface_size: Size::new(800.0, 600.0),
            pages: 3,
            engine: EngineConfig::default(),
            render: RenderConfig::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load a configuration file. Missing fields take defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkleaf_render::GridStyle;
    use std::io::Write;

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"surface_size": {{"width": 320.0, "height": 240.0}}, "render": {{"grid_style": "none"}}}}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.surface_size, Size::new(320.0, 240.0));
        assert_eq!(config.render.grid_style, GridStyle::None);
        assert_eq!(config.pages, 3);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_engine_settings() {
        for body in [r#"{"engine": {"zoom": {"min": 3.0, "max": 0.5}}}"#, r#"{"engine": {"grid_spacing": 1e-9}}"#] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, "{body}").unwrap();
            assert!(matches!(AppConfig::load(file.path()), Err(crate::AppError::Json(_))), "{body}");
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
