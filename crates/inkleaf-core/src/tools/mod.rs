//! Drawing tools and the local stroke capture state machine.

use crate::config::EngineConfig;
use crate::history::StrokeHistory;
use crate::input::InputSource;
use crate::stroke::{Segment, SerializableColor, Stroke, StrokeId, StrokePoint};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Mouse ink.
    #[default]
    Pen,
    /// Touch ink.
    Finger,
    /// Mouse ink painted in the background color.
    Eraser,
    /// Reserved for panning; never draws.
    Hand,
}

impl ToolKind {
    /// Whether this tool starts strokes from the given source.
    pub fn accepts(self, source: InputSource) -> bool {
        matches!(
            (self, source),
            (ToolKind::Pen | ToolKind::Eraser, InputSource::Mouse) | (ToolKind::Finger, InputSource::Touch)
        )
    }

    /// Color and width of a stroke started with this tool.
    pub fn ink(self, color: SerializableColor, width: f64, config: &EngineConfig) -> Ink {
        match self {
            ToolKind::Eraser => Ink {
                color: config.background_color,
                width: width * config.eraser_width_factor,
            },
            _ => Ink { color, width },
        }
    }
}

/// Resolved color and width for a new stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ink {
    pub color: SerializableColor,
    pub width: f64,
}

/// State of a tool interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ToolState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// A local stroke is growing.
    Active {
        stroke_id: StrokeId,
        /// Source that started the stroke; other sources cannot extend it.
        source: InputSource,
    },
}

/// Manages the current tool and the local stroke being drawn with it.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, committing any stroke in progress.
    pub fn set_tool(&mut self, tool: ToolKind, history: &mut StrokeHistory) {
        self.end(history);
        self.current_tool = tool;
    }

    /// Begin a stroke at a canvas-local point.
    ///
    /// Returns the first (dot) segment, or `None` when the tool ignores the
    /// source. A stroke still in progress is committed first.
    pub fn begin(
        &mut self,
        history: &mut StrokeHistory,
        point: StrokePoint,
        source: InputSource,
        ink: Ink,
    ) -> Option<Segment> {
        if !self.current_tool.accepts(source) {
            return None;
        }
        self.end(history);

        let stroke = match Stroke::begin(point, ink.color, ink.width) {
            Ok(stroke) => stroke,
            Err(e) => {
                log::warn!("cannot start stroke: {e}");
                return None;
            }
        };
        let stroke_id = stroke.id();
        let dot = history.begin_stroke(stroke)?;
        self.state = ToolState::Active { stroke_id, source };
        Some(dot)
    }

    /// Extend the active stroke. Returns the new segment.
    pub fn update(
        &mut self,
        history: &mut StrokeHistory,
        point: StrokePoint,
        source: InputSource,
    ) -> Option<Segment> {
        let ToolState::Active { stroke_id, source: started_by } = self.state else {
            return None;
        };
        if started_by != source {
            return None;
        }
        if history.active_stroke().map(Stroke::id) != Some(stroke_id) {
            // The stroke was undone or the page changed underneath us.
            self.state = ToolState::Idle;
            return None;
        }
        history.append_point(point)
    }

    /// Commit the active stroke. Returns its id if one was active.
    pub fn end(&mut self, history: &mut StrokeHistory) -> Option<StrokeId> {
        match std::mem::take(&mut self.state) {
            ToolState::Active { stroke_id, .. } => {
                if history.active_stroke().map(Stroke::id) == Some(stroke_id) {
                    history.end_stroke();
                    Some(stroke_id)
                } else {
                    None
                }
            }
            ToolState::Idle => None,
        }
    }

    /// Forget the interaction without touching the history.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// Check if a stroke is being drawn.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// Source that started the stroke in progress.
    pub fn active_source(&self) -> Option<InputSource> {
        match self.state {
            ToolState::Active { source, .. } => Some(source),
            ToolState::Idle => None,
        }
    }
}
