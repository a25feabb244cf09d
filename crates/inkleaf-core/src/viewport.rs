//! Viewport module: zoom level, ink settings and the screen/canvas transform.

use crate::config::{EngineConfig, ZoomLimits};
use crate::stroke::SerializableColor;
use kurbo::{Affine, Point, Size};
use serde::{Deserialize, Serialize};

/// Placement of the render surface on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    /// Screen position of the surface's top-left corner.
    pub origin: Point,
    /// Size of the raster buffer in device pixels.
    pub size: Size,
}

impl SurfaceGeometry {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// A surface with no area cannot receive input or be drawn.
    pub fn is_usable(&self) -> bool {
        self.size.width >= 1.0 && self.size.height >= 1.0
    }
}

/// Per-session view and ink settings.
///
/// Zoom only changes the visual transform; stroke coordinates stay in
/// logical canvas space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current zoom factor, always within the limits.
    scale: f64,
    /// Active ink color.
    pub color: SerializableColor,
    /// Active ink width.
    pub width: f64,
    limits: ZoomLimits,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Viewport {
    /// Create a viewport with the configured ink and zoom limits.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            scale: 1.0_f64.clamp(config.zoom.min(), config.zoom.max()),
            color: config.default_color,
            width: config.default_width,
            limits: config.zoom,
        }
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts canvas coordinates to screen coordinates.
    pub fn transform(&self, origin: Point) -> Affine {
        Affine::translate(origin.to_vec2()) * Affine::scale(self.scale)
    }

    /// `(screen - origin) / scale`, the inverse of [`Viewport::transform`].
    pub fn screen_to_canvas(&self, screen_point: Point, origin: Point) -> Point {
        let offset = screen_point - origin;
        Point::new(offset.x / self.scale, offset.y / self.scale)
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point, origin: Point) -> Point {
        self.transform(origin) * canvas_point
    }

    /// Zoom in by one step. Returns true if the scale changed.
    pub fn zoom_in(&mut self) -> bool {
        self.set_scale(self.scale + self.limits.step())
    }

    /// Zoom out by one step. Returns true if the scale changed.
    pub fn zoom_out(&mut self) -> bool {
        self.set_scale(self.scale - self.limits.step())
    }

    /// Set the zoom, snapped to the nearest multiple of the zoom step and
    /// saturating at the limits. Returns true if the scale changed.
    pub fn set_scale(&mut self, scale: f64) -> bool {
        if !scale.is_finite() {
            return false;
        }
        let step = self.limits.step();
        let snapped = (scale / step).round() * step;
        // Strip float noise so repeated steps do not drift (0.1 * 17 != 1.7).
        let snapped = (snapped * 1e9).round() / 1e9;
        let new_scale = snapped.clamp(self.limits.min(), self.limits.max());
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return false;
        }
        self.scale = new_scale;
        true
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }
}
