//! Scripted session replay.
//!
//! A session script is a JSON array of commands, one per host event:
//!
//! ```json
//! [
//!   {"type": "pointer_down", "x": 10, "y": 10},
//!   {"type": "pointer_move", "x": 40, "y": 25},
//!   {"type": "pointer_up", "x": 40, "y": 25},
//!   {"type": "snapshot", "file": "page1.png"}
//! ]
//! ```

use crate::{AppConfig, AppError, AppResult};
use inkleaf_core::input::monotonic_ms;
use inkleaf_core::{
    Canvas, InputSource, MemoryNotebook, Notebook, PenFeed, PointerEvent, Redraw, SerializableColor,
    Stroke, StrokePoint, ToolKind,
};
use inkleaf_render::{RasterRenderer, RenderConfig, Renderer, present};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// One pen sample in a scripted pen stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default = "full_pressure")]
    pub pressure: f64,
    #[serde(default)]
    pub timestamp: u64,
}

fn full_pressure() -> f64 {
    1.0
}

/// A scripted host event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        source: InputSource,
        #[serde(default)]
        timestamp: Option<u64>,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        source: InputSource,
        #[serde(default)]
        timestamp: Option<u64>,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        source: InputSource,
        #[serde(default)]
        timestamp: Option<u64>,
    },
    PointerLeave {
        #[serde(default)]
        source: InputSource,
        #[serde(default)]
        timestamp: Option<u64>,
    },
    Undo,
    Redo,
    Clear,
    NextPage,
    PreviousPage,
    ZoomIn,
    ZoomOut,
    SetScale {
        scale: f64,
    },
    SetTool {
        tool: ToolKind,
    },
    SetColor {
        color: SerializableColor,
    },
    SetWidth {
        width: f64,
    },
    Resize {
        width: f64,
        height: f64,
    },
    /// A completed stroke delivered by the pen device thread.
    PenStroke {
        points: Vec<PenPoint>,
        color: SerializableColor,
        width: f64,
    },
    /// Write the current surface as PNG into the output directory.
    Snapshot {
        file: String,
    },
}

/// Stroke count of one notebook page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub index: usize,
    pub id: String,
    pub strokes: usize,
}

/// Outcome of a replayed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub commands: usize,
    pub current_page: usize,
    pub scale: f64,
    pub pages: Vec<PageSummary>,
    pub snapshots: Vec<PathBuf>,
}

/// Engine, renderer and pen feed wired together the way a UI host would.
pub struct Session {
    canvas: Canvas<MemoryNotebook>,
    renderer: RasterRenderer,
    render: RenderConfig,
    pen: PenFeed,
    output_dir: PathBuf,
    commands: usize,
    snapshots: Vec<PathBuf>,
}

impl Session {
    /// Build a session with a mounted surface and a connected pen feed.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let notebook = MemoryNotebook::with_pages(config.pages);
        let mut canvas = Canvas::new(notebook, config.engine.clone())?;
        let pen = PenFeed::new();
        canvas.connect_pen(&pen)?;

        let mut session = Self {
            canvas,
            renderer: RasterRenderer::default(),
            render: config.render,
            pen,
            output_dir: config.output_dir.clone(),
            commands: 0,
            snapshots: Vec::new(),
        };
        let redraw = session
            .canvas
            .mount_surface(config.surface_origin, config.surface_size);
        session.paint(redraw)?;
        Ok(session)
    }

    pub fn canvas(&self) -> &Canvas<MemoryNotebook> {
        &self.canvas
    }

    pub fn renderer(&self) -> &RasterRenderer {
        &self.renderer
    }

    /// Parse a JSON script and run every command in order.
    pub fn run_script(&mut self, json: &str) -> AppResult<()> {
        let commands: Vec<Command> = serde_json::from_str(json)?;
        log::info!("replaying {} commands", commands.len());
        for command in commands {
            self.apply(command)?;
        }
        Ok(())
    }

    /// Run one command, then deliver pending pen strokes and redraw.
    pub fn apply(&mut self, command: Command) -> AppResult<()> {
        log::debug!("command: {command:?}");
        let redraw = match command {
            Command::PointerDown {
                x,
                y,
                source,
                timestamp,
            } => self.canvas.handle_pointer_event(PointerEvent::Down {
                position: Point::new(x, y),
                source,
                timestamp: timestamp.unwrap_or_else(monotonic_ms),
            })?,
            Command::PointerMove {
                x,
                y,
                source,
                timestamp,
            } => self.canvas.handle_pointer_event(PointerEvent::Move {
                position: Point::new(x, y),
                source,
                timestamp: timestamp.unwrap_or_else(monotonic_ms),
            })?,
            Command::PointerUp {
                x,
                y,
                source,
                timestamp,
            } => self.canvas.handle_pointer_event(PointerEvent::Up {
                position: Point::new(x, y),
                source,
                timestamp: timestamp.unwrap_or_else(monotonic_ms),
            })?,
            Command::PointerLeave { source, timestamp } => {
                self.canvas.handle_pointer_event(PointerEvent::Leave {
                    source,
                    timestamp: timestamp.unwrap_or_else(monotonic_ms),
                })?
            }
            Command::Undo => self.canvas.undo()?,
            Command::Redo => self.canvas.redo()?,
            Command::Clear => self.canvas.clear()?,
            Command::NextPage => self.canvas.next_page()?,
            Command::PreviousPage => self.canvas.previous_page()?,
            Command::ZoomIn => self.canvas.zoom_in(),
            Command::ZoomOut => self.canvas.zoom_out(),
            Command::SetScale { scale } => self.canvas.set_scale(scale),
            Command::SetTool { tool } => {
                self.canvas.set_tool(tool)?;
                Redraw::None
            }
            Command::SetColor { color } => {
                self.canvas.set_color(color);
                Redraw::None
            }
            Command::SetWidth { width } => {
                if !self.canvas.set_width(width) {
                    log::warn!("ignoring non-positive width {width}");
                }
                Redraw::None
            }
            Command::Resize { width, height } => self.canvas.resize_surface(Size::new(width, height)),
            Command::PenStroke {
                points,
                color,
                width,
            } => {
                self.emit_from_device(points, color, width)?;
                Redraw::None
            }
            Command::Snapshot { file } => {
                self.snapshot(&file)?;
                Redraw::None
            }
        };
        self.commands += 1;

        let redraw = redraw.merge(self.canvas.pump_pen_feed()?);
        self.paint(redraw)
    }

    /// Emit a pen stroke from a separate thread, as the device driver would.
    fn emit_from_device(
        &self,
        points: Vec<PenPoint>,
        color: SerializableColor,
        width: f64,
    ) -> AppResult<()> {
        let points = points
            .into_iter()
            .map(|p| StrokePoint::new(p.x, p.y, p.pressure, p.timestamp))
            .collect();
        let stroke = Stroke::from_points(points, color, width)?;
        let feed = self.pen.clone();
        let delivered = std::thread::spawn(move || feed.emit(stroke))
            .join()
            .unwrap_or(false);
        if !delivered {
            log::warn!("pen stroke was not delivered");
        }
        Ok(())
    }

    fn paint(&mut self, redraw: Redraw) -> AppResult<()> {
        present(&mut self.renderer, &self.canvas, &self.render, redraw)?;
        Ok(())
    }

    /// Write the surface to `file` inside the output directory.
    ///
    /// `file` must be a bare file name; paths that would leave the output
    /// directory are refused.
    pub fn snapshot(&mut self, file: &str) -> AppResult<PathBuf> {
        let mut components = Path::new(file).components();
        let (Some(Component::Normal(_)), None) = (components.next(), components.next()) else {
            return Err(AppError::SnapshotName(file.to_string()));
        };
        let png = self.renderer.snapshot_png()?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file);
        std::fs::write(&path, &png)?;
        log::info!("snapshot written to {}", path.display());
        self.snapshots.push(path.clone());
        Ok(path)
    }

    /// Detach the surface and pen feed, write the notebook dump and report.
    pub fn finish(mut self) -> AppResult<SessionReport> {
        self.canvas.unmount_surface()?;
        self.canvas.disconnect_pen();

        let notebook = self.canvas.notebook();
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::write(self.output_dir.join("notebook.json"), notebook.to_json()?)?;

        let pages = notebook
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| PageSummary {
                index,
                id: page.id.clone(),
                strokes: page.strokes.len(),
            })
            .collect();

        Ok(SessionReport {
            commands: self.commands,
            current_page: notebook.current_page().map_or(0, |p| p.index),
            scale: self.canvas.viewport().scale(),
            pages,
            snapshots: self.snapshots,
        })
    }
}
