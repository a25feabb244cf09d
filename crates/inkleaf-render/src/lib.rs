//! Inkleaf Render Library
//!
//! Renderer abstraction and a deterministic CPU raster implementation built
//! on `vello_cpu`.
//! Core operations return [`inkleaf_core::Redraw`] requests; [`present`]
//! applies them to a [`Renderer`].

mod raster;
mod renderer;

pub use raster::{RasterRenderer, encode_png};
pub use renderer::{GridStyle, RenderConfig, RenderContext, RenderResult, Renderer, RendererError, present};
