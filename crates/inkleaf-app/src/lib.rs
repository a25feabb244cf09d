//! Inkleaf Application
//!
//! Native shell around the engine: loads configuration, replays a scripted
//! input session through a [`Canvas`](inkleaf_core::Canvas) and writes PNG
//! snapshots of the rendered surface.

mod config;
mod session;

pub use config::AppConfig;
pub use session::{Command, PageSummary, PenPoint, Session, SessionReport};

use inkleaf_core::{NotebookError, PenFeedError, StrokeError};
use inkleaf_render::RendererError;
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Notebook(#[from] NotebookError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error(transparent)]
    Pen(#[from] PenFeedError),
    #[error("Invalid pen stroke: {0}")]
    Stroke(#[from] StrokeError),
    #[error("Usage: {0}")]
    Usage(String),
    #[error("snapshot name must be a plain file name, got {0:?}")]
    SnapshotName(String),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;
