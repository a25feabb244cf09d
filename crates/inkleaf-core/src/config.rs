//! Engine configuration.

use crate::stroke::SerializableColor;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Spacing of the horizontal ruling, in logical units.
pub const DEFAULT_GRID_SPACING: f64 = 40.0;

/// Eraser strokes are this many times wider than the active width.
pub const DEFAULT_ERASER_WIDTH_FACTOR: f64 = 3.0;

/// Smallest ruling spacing accepted from configuration, in logical units.
pub const MIN_GRID_SPACING: f64 = 1.0;

/// Errors raised when validating configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid zoom limits: min {min}, max {max}, step {step}")]
    InvalidZoomLimits { min: f64, max: f64, step: f64 },
    #[error("grid spacing must be finite and at least {MIN_GRID_SPACING}, got {0}")]
    InvalidGridSpacing(f64),
}

/// Zoom limits and step.
///
/// Always satisfies `0 < min <= max` with a positive step, all finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawZoomLimits")]
pub struct ZoomLimits {
    min: f64,
    max: f64,
    step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 3.0,
            step: 0.1,
        }
    }
}

impl ZoomLimits {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, ConfigError> {
        let finite = min.is_finite() && max.is_finite() && step.is_finite();
        if !finite || min <= 0.0 || min > max || step <= 0.0 {
            return Err(ConfigError::InvalidZoomLimits { min, max, step });
        }
        Ok(Self { min, max, step })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Zoom increment; the scale always sits on a multiple of it or a limit.
    pub fn step(&self) -> f64 {
        self.step
    }
}

/// Unchecked wire form of [`ZoomLimits`].
#[derive(Deserialize)]
#[serde(default)]
struct RawZoomLimits {
    min: f64,
    max: f64,
    step: f64,
}

impl Default for RawZoomLimits {
    fn default() -> Self {
        let limits = ZoomLimits::default();
        Self {
            min: limits.min,
            max: limits.max,
            step: limits.step,
        }
    }
}

impl TryFrom<RawZoomLimits> for ZoomLimits {
    type Error = ConfigError;

    fn try_from(raw: RawZoomLimits) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max, raw.step)
    }
}

fn grid_spacing<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let spacing = f64::deserialize(deserializer)?;
    if spacing.is_finite() && spacing >= MIN_GRID_SPACING {
        Ok(spacing)
    } else {
        Err(serde::de::Error::custom(ConfigError::InvalidGridSpacing(spacing)))
    }
}

/// Settings shared by input capture, the page controller and the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Surface background, also used as the eraser ink.
    pub background_color: SerializableColor,
    /// Color of the horizontal ruling.
    pub grid_color: SerializableColor,
    #[serde(deserialize_with = "grid_spacing")]
    pub grid_spacing: f64,
    /// Ink color selected when a session starts.
    pub default_color: SerializableColor,
    /// Ink width selected when a session starts.
    pub default_width: f64,
    pub eraser_width_factor: f64,
    pub zoom: ZoomLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            background_color: SerializableColor::white(),
            grid_color: SerializableColor::rgb(224, 224, 224),
            grid_spacing: DEFAULT_GRID_SPACING,
            default_color: SerializableColor::black(),
            default_width: 2.0,
            eraser_width_factor: DEFAULT_ERASER_WIDTH_FACTOR,
            zoom: ZoomLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Deserialize a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.grid_spacing - 40.0).abs() < f64::EPSILON);
        assert!((config.eraser_width_factor - 3.0).abs() < f64::EPSILON);
        assert!((config.zoom.min() - 0.5).abs() < f64::EPSILON);
        assert!((config.zoom.max() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r##"{ "default_color": "#1e90ff", "zoom": { "max": 2.0 } }"##).unwrap();
        assert_eq!(config.default_color, SerializableColor::rgb(0x1e, 0x90, 0xff));
        assert!((config.zoom.max() - 2.0).abs() < f64::EPSILON);
        assert!((config.zoom.min() - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.background_color, SerializableColor::white());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let back = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_bad_color_rejected() {
        assert!(EngineConfig::from_json(r#"{ "background_color": "white" }"#).is_err());
    }

    #[test]
    fn test_inverted_zoom_limits_rejected() {
        assert!(EngineConfig::from_json(r#"{ "zoom": { "min": 3.0, "max": 0.5 } }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "zoom": { "step": 0.0 } }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "zoom": { "min": 0.0 } }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "zoom": { "min": 2.0, "max": 2.0 } }"#).is_ok());

        assert!(matches!(
            ZoomLimits::new(f64::NAN, 3.0, 0.1),
            Err(ConfigError::InvalidZoomLimits { .. })
        ));
        assert!(ZoomLimits::new(1.0, f64::INFINITY, 0.1).is_err());
        assert!(ZoomLimits::new(0.5, 4.0, -0.25).is_err());
    }

    #[test]
    fn test_tiny_grid_spacing_rejected() {
        assert!(EngineConfig::from_json(r#"{ "grid_spacing": 1e-9 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "grid_spacing": -40.0 }"#).is_err());
        let config = EngineConfig::from_json(r#"{ "grid_spacing": 12.5 }"#).unwrap();
        assert!((config.grid_spacing - 12.5).abs() < f64::EPSILON);
    }
}
