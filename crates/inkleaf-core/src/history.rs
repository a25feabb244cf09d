//! Stroke log and redo buffer for the active page.

use crate::stroke::{Segment, Stroke, StrokeId, StrokePoint};

/// Ordered stroke log with a tail-only undo/redo stack.
///
/// This is the only owner of the active page's log. Input capture and the pen
/// feed go through the mutation methods here; nothing else splices the log.
/// A stroke lives either in the log or in the redo buffer, never both.
#[derive(Debug, Clone, Default)]
pub struct StrokeHistory {
    /// Committed and in-progress strokes, back to front.
    log: Vec<Stroke>,
    /// Strokes removed by undo, most recent last.
    redo: Vec<Stroke>,
    /// Stroke currently receiving points from local input.
    active: Option<StrokeId>,
}

impl StrokeHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history over an existing page log.
    pub fn with_log(log: Vec<Stroke>) -> Self {
        Self {
            log: drawable(log),
            ..Self::default()
        }
    }

    /// Append a freshly started local stroke and make it the active one.
    ///
    /// Starting a stroke discards the redo buffer. Returns the dot segment of
    /// the first point, or `None` (and leaves the log alone) for an empty stroke.
    pub fn begin_stroke(&mut self, stroke: Stroke) -> Option<Segment> {
        let id = stroke.id();
        let dot = Segment::tail_of(&stroke)?;
        self.redo.clear();
        self.log.push(stroke);
        self.active = Some(id);
        log::debug!("stroke {id} started ({} in log)", self.log.len());
        Some(dot)
    }

    /// Append a point to the active stroke, wherever it sits in the log.
    ///
    /// Returns the new segment, or `None` if no stroke is active.
    pub fn append_point(&mut self, point: StrokePoint) -> Option<Segment> {
        let id = self.active?;
        let stroke = self.log.iter_mut().rev().find(|s| s.id() == id)?;
        stroke.add_point(point);
        Segment::tail_of(stroke)
    }

    /// Freeze the active stroke. Returns its id if one was active.
    pub fn end_stroke(&mut self) -> Option<StrokeId> {
        let id = self.active.take()?;
        if let Some(stroke) = self.get(id) {
            log::debug!("stroke {id} committed with {} points", stroke.len());
        }
        Some(id)
    }

    /// Append a stroke that arrived complete (e.g. from the pen feed).
    ///
    /// Strokes that fail [`Stroke::validate`] and ids already present in the
    /// log or redo buffer are refused. The active stroke, if any, stays active.
    pub fn push_completed(&mut self, stroke: Stroke) -> bool {
        if let Err(e) = stroke.validate() {
            log::warn!("dropping stroke {}: {e}", stroke.id());
            return false;
        }
        if self.contains(stroke.id()) {
            log::warn!("dropping duplicate stroke {}", stroke.id());
            return false;
        }
        self.log.push(stroke);
        true
    }

    /// Move the last stroke of the log onto the redo buffer.
    /// Returns true if undo was performed, false if the log is empty.
    pub fn undo(&mut self) -> bool {
        let Some(stroke) = self.log.pop() else {
            return false;
        };
        if self.active == Some(stroke.id()) {
            self.active = None;
        }
        self.redo.push(stroke);
        true
    }

    /// Move the last undone stroke back to the end of the log.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        if let Some(stroke) = self.redo.pop() {
            self.log.push(stroke);
            true
        } else {
            false
        }
    }

    /// Empty both the log and the redo buffer.
    pub fn clear(&mut self) {
        self.log.clear();
        self.redo.clear();
        self.active = None;
    }

    /// Install another page's log, returning the previous one.
    ///
    /// Redo history does not carry across pages.
    pub fn replace_log(&mut self, log: Vec<Stroke>) -> Vec<Stroke> {
        self.redo.clear();
        self.active = None;
        std::mem::replace(&mut self.log, drawable(log))
    }

    /// Strokes in z-order (back to front).
    pub fn strokes(&self) -> &[Stroke] {
        &self.log
    }

    /// Undone strokes, most recent last.
    pub fn redo_strokes(&self) -> &[Stroke] {
        &self.redo
    }

    /// The stroke receiving local input, if any.
    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    /// Get a stroke of the log by id.
    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.log.iter().rev().find(|s| s.id() == id)
    }

    fn contains(&self, id: StrokeId) -> bool {
        self.get(id).is_some() || self.redo.iter().any(|s| s.id() == id)
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.log.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Get the number of strokes in the log.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// Drop strokes that cannot be drawn, such as malformed ones read back from storage.
fn drawable(mut log: Vec<Stroke>) -> Vec<Stroke> {
    log.retain(|stroke| match stroke.validate() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("dropping stroke {}: {e}", stroke.id());
            false
        }
    });
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::SerializableColor;

    fn stroke_at(x: f64) -> Stroke {
        Stroke::from_points(
            vec![StrokePoint::new(x, 0.0, 1.0, 0), StrokePoint::new(x, 10.0, 1.0, 1)],
            SerializableColor::black(),
            2.0,
        )
        .unwrap()
    }

    fn history_with(n: usize) -> StrokeHistory {
        StrokeHistory::with_log((0..n).map(|i| stroke_at(i as f64)).collect())
    }

    #[test]
    fn test_undo_empty_is_noop() {
        let mut history = StrokeHistory::new();
        assert!(!history.can_undo());
        assert!(!history.undo());
        assert!(history.is_empty());
        assert!(history.redo_strokes().is_empty());

        assert!(!history.can_redo());
        assert!(!history.redo());
        assert!(history.is_empty());
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = history_with(2);
        let original = history.strokes().to_vec();

        assert!(history.undo());
        assert_eq!(history.len(), 1);
        assert_eq!(history.redo_strokes(), &original[1..]);

        assert!(history.redo());
        assert_eq!(history.strokes(), original.as_slice());
        assert!(history.redo_strokes().is_empty());
    }

    #[test]
    fn test_undo_redo_is_lossless() {
        let mut history = history_with(5);
        let original = history.strokes().to_vec();

        for n in 0..=5 {
            for _ in 0..n {
                assert!(history.undo());
            }
            assert_eq!(history.len() + history.redo_strokes().len(), 5);
            for _ in 0..n {
                assert!(history.redo());
            }
            assert_eq!(history.strokes(), original.as_slice());
        }
    }

    #[test]
    fn test_begin_clears_redo() {
        let mut history = history_with(2);
        history.undo();
        assert!(history.can_redo());

        history.begin_stroke(stroke_at(9.0));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_append_targets_active_stroke() {
        let mut history = StrokeHistory::new();
        let local = Stroke::begin(StrokePoint::new(0.0, 0.0, 1.0, 0), SerializableColor::black(), 2.0).unwrap();
        let local_id = local.id();
        history.begin_stroke(local);

        // Another stroke lands on top while the local one is still growing.
        let pen = stroke_at(50.0);
        let pen_points = pen.points().to_vec();
        assert!(history.push_completed(pen));

        let segment = history.append_point(StrokePoint::new(5.0, 5.0, 1.0, 1)).unwrap();
        assert_eq!(segment.from.position(), kurbo::Point::new(0.0, 0.0));
        assert_eq!(segment.to.position(), kurbo::Point::new(5.0, 5.0));

        assert_eq!(history.strokes()[0].id(), local_id);
        assert_eq!(history.strokes()[0].len(), 2);
        assert_eq!(history.strokes()[1].points(), pen_points.as_slice());
    }

    #[test]
    fn test_append_without_active_is_noop() {
        let mut history = history_with(1);
        assert!(history.append_point(StrokePoint::new(1.0, 1.0, 1.0, 0)).is_none());
        assert_eq!(history.strokes()[0].len(), 2);
    }

    #[test]
    fn test_end_stroke_freezes() {
        let mut history = StrokeHistory::new();
        history.begin_stroke(stroke_at(0.0));
        assert!(history.is_drawing());
        assert!(history.end_stroke().is_some());
        assert!(!history.is_drawing());
        assert!(history.append_point(StrokePoint::new(1.0, 1.0, 1.0, 0)).is_none());
        assert!(history.end_stroke().is_none());
    }

    #[test]
    fn test_undo_active_stroke_drops_marker() {
        let mut history = StrokeHistory::new();
        history.begin_stroke(stroke_at(0.0));
        assert!(history.undo());
        assert!(!history.is_drawing());
        assert!(history.active_stroke().is_none());
    }

    #[test]
    fn test_push_completed_rejects_duplicates() {
        let mut history = StrokeHistory::new();
        let stroke = stroke_at(0.0);
        assert!(history.push_completed(stroke.clone()));
        assert!(!history.push_completed(stroke.clone()));

        history.undo();
        assert!(!history.push_completed(stroke));
        assert!(history.is_empty());
    }

    #[test]
    fn test_push_completed_rejects_empty() {
        let mut history = StrokeHistory::new();
        let empty: Stroke = serde_json::from_str(
            r##"{ "id": "67e55044-10b1-426f-9247-bb680e5fe0c8", "points": [], "color": "#000000", "width": 1.0 }"##,
        )
        .unwrap();
        assert!(!history.push_completed(empty));
        assert!(history.is_empty());
    }

    #[test]
    fn test_push_completed_rejects_bad_width() {
        let mut history = StrokeHistory::new();
        for width in ["-4.0", "0.0"] {
            let stroke: Stroke = serde_json::from_str(&format!(
                r##"{{ "id": "{}", "points": [{{ "x": 1.0, "y": 1.0, "pressure": 1.0, "timestamp": 0 }}], "color": "#000000", "width": {width} }}"##,
                uuid::Uuid::new_v4()
            ))
            .unwrap();
            assert!(!history.push_completed(stroke));
        }
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut history = history_with(3);
        history.undo();
        history.clear();
        assert!(history.is_empty());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_replace_log_resets_redo() {
        let mut history = history_with(3);
        history.undo();
        let previous = history.replace_log(Vec::new());

        assert_eq!(previous.len(), 2);
        assert!(history.is_empty());
        assert!(!history.can_redo());
        assert!(!history.undo());
    }

    #[test]
    fn test_loaded_log_drops_malformed_strokes() {
        let empty: Stroke = serde_json::from_str(
            r##"{ "id": "67e55044-10b1-426f-9247-bb680e5fe0c8", "points": [], "color": "#000000", "width": 1.0 }"##,
        )
        .unwrap();
        let negative: Stroke = serde_json::from_str(
            r##"{ "id": "0c4f5c1e-7f3b-4d35-9c55-1f6d2b0a9e11", "points": [{ "x": 0.0, "y": 0.0, "pressure": 1.0, "timestamp": 0 }], "color": "#000000", "width": -4.0 }"##,
        )
        .unwrap();
        let kept = stroke_at(1.0);

        let history = StrokeHistory::with_log(vec![empty.clone(), kept.clone(), negative.clone()]);
        assert_eq!(history.strokes(), std::slice::from_ref(&kept));

        let mut history = StrokeHistory::new();
        history.replace_log(vec![negative, kept, empty]);
        assert_eq!(history.len(), 1);
    }
}
