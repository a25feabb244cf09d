//! Renderer trait abstraction.

use inkleaf_core::canvas::{Canvas, Redraw};
use inkleaf_core::config::EngineConfig;
use inkleaf_core::notebook::Notebook;
use inkleaf_core::stroke::{Segment, Stroke};
use kurbo::{Affine, Point, Size};
use peniko::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Background ruling style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStyle {
    /// Plain background.
    None,
    /// Horizontal notebook lines.
    #[default]
    Lines,
}

/// Renderer settings that are not part of the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub grid_style: GridStyle,
    /// Scale segment width by the mean pressure of its endpoints.
    pub pressure_width: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Stroke log in z-order.
    pub strokes: &'a [Stroke],
    /// Zoom factor: logical unit to device pixel.
    pub scale: f64,
    /// Logical canvas space to surface pixels.
    pub transform: Affine,
    pub background_color: Color,
    pub grid_color: Color,
    /// Ruling spacing in logical units.
    pub grid_spacing: f64,
    pub grid_style: GridStyle,
    pub pressure_width: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a context with the configured colors at the given zoom.
    pub fn new(strokes: &'a [Stroke], scale: f64, config: &EngineConfig) -> Self {
        Self {
            strokes,
            scale,
            transform: Affine::scale(scale),
            background_color: config.background_color.into(),
            grid_color: config.grid_color.into(),
            grid_spacing: config.grid_spacing,
            grid_style: GridStyle::Lines,
            pressure_width: false,
        }
    }

    /// Context for the canvas's active page.
    pub fn from_canvas<N: Notebook>(canvas: &'a Canvas<N>, render: &RenderConfig) -> Self {
        let viewport = canvas.viewport();
        Self {
            // Surface-local, so the screen origin is not applied.
            transform: viewport.transform(Point::ZERO),
            ..Self::new(canvas.strokes(), viewport.scale(), canvas.config())
        }
        .with_grid(render.grid_style)
        .with_pressure_width(render.pressure_width)
    }

    /// Set the grid style.
    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    /// Enable linear pressure width scaling.
    pub fn with_pressure_width(mut self, enabled: bool) -> Self {
        self.pressure_width = enabled;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Reallocate the surface. The contents are undefined until the next
    /// full render.
    fn resize(&mut self, size: Size) -> RenderResult<()>;

    /// Surface size in device pixels.
    fn size(&self) -> Size;

    /// Clear the surface and draw the grid and every stroke in order.
    ///
    /// Two calls with the same context produce identical pixels.
    fn render_full(&mut self, ctx: &RenderContext);

    /// Draw one new segment on top of the current contents.
    fn render_segment(&mut self, segment: &Segment, ctx: &RenderContext);

    /// Encode the current surface as PNG.
    fn snapshot_png(&self) -> RenderResult<Vec<u8>>;
}

/// Carry out a redraw request from the canvas.
///
/// A changed surface size forces a resize and a full redraw. Does nothing
/// while the canvas has no usable surface.
pub fn present<R, N>(
    renderer: &mut R,
    canvas: &Canvas<N>,
    render: &RenderConfig,
    redraw: Redraw,
) -> RenderResult<()>
where
    R: Renderer + ?Sized,
    N: Notebook,
{
    let Some(surface) = canvas.surface().filter(|s| s.is_usable()) else {
        return Ok(());
    };

    let size = Size::new(surface.size.width.round(), surface.size.height.round());
    let redraw = if size != renderer.size() {
        renderer.resize(size)?;
        Redraw::Full
    } else {
        redraw
    };

    let ctx = RenderContext::from_canvas(canvas, render);
    match redraw {
        Redraw::None => {}
        Redraw::Segment(segment) => renderer.render_segment(&segment, &ctx),
        Redraw::Full => renderer.render_full(&ctx),
    }
    Ok(())
}
