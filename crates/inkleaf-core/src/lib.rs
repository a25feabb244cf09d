//! Inkleaf Core Library
//!
//! Platform-agnostic stroke capture, history and page/viewport logic for the
//! Inkleaf handwriting surface. Rendering lives in `inkleaf-render`.

pub mod canvas;
pub mod config;
pub mod history;
pub mod input;
pub mod notebook;
pub mod pen;
pub mod stroke;
pub mod tools;
pub mod viewport;

pub use canvas::{Canvas, Redraw};
pub use config::{ConfigError, EngineConfig, ZoomLimits};
pub use history::StrokeHistory;
pub use input::{InputSource, PointerEvent};
pub use notebook::{MemoryNotebook, Notebook, NotebookError, NotebookResult, PageRef};
pub use pen::{PenFeed, PenFeedError, PenInbox, PenSubscription};
pub use stroke::{ColorError, Segment, SerializableColor, Stroke, StrokeError, StrokeId, StrokePoint};
pub use tools::{ToolKind, ToolManager};
pub use viewport::{SurfaceGeometry, Viewport};
