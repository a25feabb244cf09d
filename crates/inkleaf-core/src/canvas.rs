//! Page and viewport controller.
//!
//! [`Canvas`] is the façade the host drives: it routes pointer events and pen
//! strokes into the [`StrokeHistory`], handles undo/redo, zoom and page
//! navigation, and keeps the notebook's copy of the active page in sync.
//! It never draws; every operation returns a [`Redraw`] request for the
//! renderer.

use crate::config::EngineConfig;
use crate::history::StrokeHistory;
use crate::input::PointerEvent;
use crate::notebook::{Notebook, NotebookResult, PageRef};
use crate::pen::{PenFeed, PenFeedError, PenInbox};
use crate::stroke::{Segment, SerializableColor, Stroke, StrokePoint};
use crate::tools::{ToolKind, ToolManager};
use crate::viewport::{SurfaceGeometry, Viewport};
use kurbo::{Point, Size};

/// What the renderer has to do after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Redraw {
    /// Nothing changed on screen.
    #[default]
    None,
    /// Draw one new segment of the growing local stroke.
    Segment(Segment),
    /// Rebuild the whole surface from the stroke log.
    Full,
}

impl Redraw {
    /// Combine two requests; a full redraw absorbs everything else.
    pub fn merge(self, other: Redraw) -> Redraw {
        match (self, other) {
            (Redraw::Full, _) | (_, Redraw::Full) => Redraw::Full,
            (Redraw::None, other) => other,
            (this, Redraw::None) => this,
            // Two pending segments cannot be expressed incrementally.
            (Redraw::Segment(_), Redraw::Segment(_)) => Redraw::Full,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Redraw::None)
    }
}

/// Handwriting surface state for one notebook.
///
/// Operations that write through to the notebook return `NotebookResult`.
/// When such a call fails the in-memory history has already changed and
/// stays changed; the caller should still treat the surface as needing a
/// full redraw.
pub struct Canvas<N: Notebook> {
    notebook: N,
    /// Page whose log is loaded in `history`.
    page: Option<PageRef>,
    history: StrokeHistory,
    tool_manager: ToolManager,
    viewport: Viewport,
    surface: Option<SurfaceGeometry>,
    config: EngineConfig,
    pen_inbox: Option<PenInbox>,
}

impl<N: Notebook + std::fmt::Debug> std::fmt::Debug for Canvas<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("notebook", &self.notebook)
            .field("page", &self.page)
            .field("strokes", &self.history.len())
            .field("viewport", &self.viewport)
            .field("surface", &self.surface)
            .field("pen_connected", &self.pen_inbox.is_some())
            .finish()
    }
}

impl<N: Notebook> Canvas<N> {
    /// Create a canvas showing the notebook's current page.
    pub fn new(notebook: N, config: EngineConfig) -> NotebookResult<Self> {
        let page = notebook.current_page();
        let strokes = match &page {
            Some(page) => notebook.load_strokes(page)?,
            None => Vec::new(),
        };
        Ok(Self {
            notebook,
            page,
            history: StrokeHistory::with_log(strokes),
            tool_manager: ToolManager::new(),
            viewport: Viewport::from_config(&config),
            surface: None,
            config,
            pen_inbox: None,
        })
    }

    /// Create a canvas with the default configuration.
    pub fn with_notebook(notebook: N) -> NotebookResult<Self> {
        Self::new(notebook, EngineConfig::default())
    }

    pub fn notebook(&self) -> &N {
        &self.notebook
    }

    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }

    /// Strokes of the active page in z-order.
    pub fn strokes(&self) -> &[Stroke] {
        self.history.strokes()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> Option<SurfaceGeometry> {
        self.surface
    }

    pub fn current_page(&self) -> Option<&PageRef> {
        self.page.as_ref()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool_manager.current_tool
    }

    // --- Surface -----------------------------------------------------------

    /// Attach the render surface at a screen position.
    pub fn mount_surface(&mut self, origin: Point, size: Size) -> Redraw {
        self.surface = Some(SurfaceGeometry::new(origin, size));
        log::debug!("surface mounted at {origin:?}, {size:?}");
        Redraw::Full
    }

    /// The surface's container changed size.
    pub fn resize_surface(&mut self, size: Size) -> Redraw {
        match &mut self.surface {
            Some(surface) => {
                surface.size = size;
                Redraw::Full
            }
            None => Redraw::None,
        }
    }

    /// Detach the surface, committing any stroke in progress.
    pub fn unmount_surface(&mut self) -> NotebookResult<()> {
        self.surface = None;
        self.commit_active()
    }

    fn usable_surface(&self) -> Option<SurfaceGeometry> {
        self.surface.filter(SurfaceGeometry::is_usable)
    }

    // --- Input -------------------------------------------------------------

    /// Route a pointer or touch event into stroke construction.
    ///
    /// Without a mounted surface this does nothing.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> NotebookResult<Redraw> {
        let Some(surface) = self.usable_surface() else {
            return Ok(Redraw::None);
        };

        match event {
            PointerEvent::Down {
                position,
                source,
                timestamp,
            } => {
                if !self.tool_manager.current_tool.accepts(source) {
                    return Ok(Redraw::None);
                }
                // A missed up/leave must not leave the previous stroke open.
                self.commit_active()?;

                let point = self.canvas_point(position, surface, timestamp);
                let ink = self.tool_manager.current_tool.ink(
                    self.viewport.color,
                    self.viewport.width,
                    &self.config,
                );
                Ok(self
                    .tool_manager
                    .begin(&mut self.history, point, source, ink)
                    .map_or(Redraw::None, Redraw::Segment))
            }
            PointerEvent::Move {
                position,
                source,
                timestamp,
            } => {
                let point = self.canvas_point(position, surface, timestamp);
                Ok(self
                    .tool_manager
                    .update(&mut self.history, point, source)
                    .map_or(Redraw::None, Redraw::Segment))
            }
            PointerEvent::Up { source, .. } => {
                if self.tool_manager.active_source() == Some(source) {
                    self.commit_active()?;
                }
                Ok(Redraw::None)
            }
            PointerEvent::Leave { .. } => {
                self.commit_active()?;
                Ok(Redraw::None)
            }
        }
    }

    fn canvas_point(&self, position: Point, surface: SurfaceGeometry, timestamp: u64) -> StrokePoint {
        StrokePoint::at(self.viewport.screen_to_canvas(position, surface.origin), timestamp)
    }

    /// Freeze the stroke in progress, if any, and persist the log.
    fn commit_active(&mut self) -> NotebookResult<()> {
        match self.tool_manager.end(&mut self.history) {
            Some(_) => self.sync(),
            None => Ok(()),
        }
    }

    // --- Tool settings -----------------------------------------------------

    /// Switch tools. A stroke in progress is committed.
    pub fn set_tool(&mut self, tool: ToolKind) -> NotebookResult<()> {
        self.commit_active()?;
        self.tool_manager.set_tool(tool, &mut self.history);
        Ok(())
    }

    /// Ink color for the next stroke.
    pub fn set_color(&mut self, color: SerializableColor) {
        self.viewport.color = color;
    }

    /// Ink width for the next stroke. Non-positive widths are refused.
    pub fn set_width(&mut self, width: f64) -> bool {
        if width.is_finite() && width > 0.0 {
            self.viewport.width = width;
            true
        } else {
            false
        }
    }

    // --- History -----------------------------------------------------------

    /// Remove the newest stroke.
    pub fn undo(&mut self) -> NotebookResult<Redraw> {
        if !self.history.undo() {
            return Ok(Redraw::None);
        }
        if !self.history.is_drawing() {
            self.tool_manager.cancel();
        }
        self.sync()?;
        Ok(Redraw::Full)
    }

    /// Restore the most recently undone stroke.
    pub fn redo(&mut self) -> NotebookResult<Redraw> {
        if !self.history.redo() {
            return Ok(Redraw::None);
        }
        self.sync()?;
        Ok(Redraw::Full)
    }

    /// Erase the whole page and its redo history.
    pub fn clear(&mut self) -> NotebookResult<Redraw> {
        self.history.clear();
        self.tool_manager.cancel();
        if let Some(page) = &self.page {
            self.notebook.clear_strokes(page)?;
        }
        log::info!("page cleared");
        Ok(Redraw::Full)
    }

    // --- Zoom --------------------------------------------------------------

    pub fn zoom_in(&mut self) -> Redraw {
        Self::rescaled(self.viewport.zoom_in())
    }

    pub fn zoom_out(&mut self) -> Redraw {
        Self::rescaled(self.viewport.zoom_out())
    }

    /// Set the zoom factor, saturating at the configured limits.
    pub fn set_scale(&mut self, scale: f64) -> Redraw {
        Self::rescaled(self.viewport.set_scale(scale))
    }

    fn rescaled(changed: bool) -> Redraw {
        if changed { Redraw::Full } else { Redraw::None }
    }

    // --- Pages -------------------------------------------------------------

    /// Show the next page. No-op on the last page.
    pub fn next_page(&mut self) -> NotebookResult<Redraw> {
        self.switch_page(true)
    }

    /// Show the previous page. No-op on the first page.
    pub fn previous_page(&mut self) -> NotebookResult<Redraw> {
        self.switch_page(false)
    }

    fn switch_page(&mut self, forward: bool) -> NotebookResult<Redraw> {
        self.commit_active()?;
        self.sync()?;

        let moved = if forward {
            self.notebook.go_to_next_page()
        } else {
            self.notebook.go_to_previous_page()
        };
        if !moved {
            return Ok(Redraw::None);
        }

        let page = self.notebook.current_page();
        let strokes = match &page {
            Some(page) => match self.notebook.load_strokes(page) {
                Ok(strokes) => strokes,
                Err(e) => {
                    // Step back so notebook and history keep showing the same page.
                    if forward {
                        self.notebook.go_to_previous_page();
                    } else {
                        self.notebook.go_to_next_page();
                    }
                    return Err(e);
                }
            },
            None => Vec::new(),
        };

        self.tool_manager.cancel();
        self.history.replace_log(strokes);
        if let Some(page) = &page {
            log::info!("switched to page {} ({} strokes)", page.index, self.history.len());
        }
        self.page = page;
        Ok(Redraw::Full)
    }

    // --- Pen feed ----------------------------------------------------------

    /// Subscribe to a pen feed. Replaces any previous connection.
    pub fn connect_pen(&mut self, feed: &PenFeed) -> Result<(), PenFeedError> {
        self.pen_inbox = None;
        self.pen_inbox = Some(PenInbox::connect(feed)?);
        Ok(())
    }

    /// Release the pen feed subscription.
    pub fn disconnect_pen(&mut self) {
        if self.pen_inbox.take().is_some() {
            log::debug!("pen feed disconnected");
        }
    }

    pub fn is_pen_connected(&self) -> bool {
        self.pen_inbox.is_some()
    }

    /// Append every pen stroke received since the last call, in arrival order.
    pub fn pump_pen_feed(&mut self) -> NotebookResult<Redraw> {
        let strokes = match &self.pen_inbox {
            Some(inbox) => inbox.drain(),
            None => return Ok(Redraw::None),
        };
        let mut appended = false;
        for stroke in strokes {
            appended |= self.history.push_completed(stroke);
        }
        if !appended {
            return Ok(Redraw::None);
        }
        self.sync()?;
        Ok(Redraw::Full)
    }

    /// Append one completed stroke from an external source.
    pub fn append_stroke(&mut self, stroke: Stroke) -> NotebookResult<Redraw> {
        if !self.history.push_completed(stroke) {
            return Ok(Redraw::None);
        }
        self.sync()?;
        Ok(Redraw::Full)
    }

    // --- Notebook ----------------------------------------------------------

    /// Write the active log back to the notebook.
    fn sync(&mut self) -> NotebookResult<()> {
        let Some(page) = &self.page else {
            return Ok(());
        };
        self.notebook
            .store_strokes(page, self.history.strokes())
            .inspect_err(|e| log::warn!("failed to store page {}: {e}", page.id))
    }
}
