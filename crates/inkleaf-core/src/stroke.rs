//! Stroke model: points, strokes and ink colors.

use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a stroke.
pub type StrokeId = Uuid;

/// Errors raised when building a stroke.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrokeError {
    #[error("stroke has no points")]
    Empty,
    #[error("stroke width must be positive and finite, got {0}")]
    InvalidWidth(f64),
}

/// Errors raised when parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),
}

/// A single sampled input point in logical canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// Pen pressure in `[0, 1]`.
    pub pressure: f64,
    /// Monotonic timestamp in milliseconds.
    pub timestamp: u64,
}

impl StrokePoint {
    /// Create a point, clamping pressure into `[0, 1]`.
    pub fn new(x: f64, y: f64, pressure: f64, timestamp: u64) -> Self {
        let pressure = if pressure.is_nan() { 1.0 } else { pressure.clamp(0.0, 1.0) };
        Self { x, y, pressure, timestamp }
    }

    /// Create a full-pressure point at a canvas position.
    pub fn at(position: Point, timestamp: u64) -> Self {
        Self::new(position.x, position.y, 1.0, timestamp)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Serializable color representation (RGBA8), written as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(color: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError::InvalidHex(color.to_string());
        let hex = color.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = byte(&hex[0..1])? * 17;
                let g = byte(&hex[1..2])? * 17;
                let b = byte(&hex[2..3])? * 17;
                Ok(Self::rgb(r, g, b))
            }
            6 => Ok(Self::rgb(byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?)),
            8 => Ok(Self::new(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
                byte(&hex[6..8])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// One continuous freehand mark.
///
/// A stroke built through the public constructors always holds at least one
/// point. Points keep insertion order; timestamps are not required to be
/// monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: StrokeId,
    pub(crate) points: Vec<StrokePoint>,
    color: SerializableColor,
    width: f64,
}

impl Stroke {
    /// Start a stroke from its first point.
    pub fn begin(first: StrokePoint, color: SerializableColor, width: f64) -> Result<Self, StrokeError> {
        Self::from_points(vec![first], color, width)
    }

    /// Build a stroke from an existing point sequence.
    pub fn from_points(
        points: Vec<StrokePoint>,
        color: SerializableColor,
        width: f64,
    ) -> Result<Self, StrokeError> {
        let stroke = Self {
            id: Uuid::new_v4(),
            points,
            color,
            width,
        };
        stroke.validate()?;
        Ok(stroke)
    }

    /// Check the invariants the constructors enforce. Deserialized strokes
    /// have to pass this before they are committed anywhere.
    pub fn validate(&self) -> Result<(), StrokeError> {
        if self.points.is_empty() {
            return Err(StrokeError::Empty);
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(StrokeError::InvalidWidth(self.width));
        }
        Ok(())
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn color(&self) -> SerializableColor {
        self.color
    }

    /// Ink width in logical units.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    /// Add a point to the end of the stroke.
    pub fn add_point(&mut self, point: StrokePoint) {
        self.points.push(point);
    }

    pub fn last_point(&self) -> Option<&StrokePoint> {
        self.points.last()
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Only true for strokes that bypassed the constructors (e.g. deserialized).
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consecutive point pairs in drawing order.
    pub fn segments(&self) -> impl Iterator<Item = (&StrokePoint, &StrokePoint)> {
        self.points.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Bounding box of the point positions (stroke width not included).
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.points.first()?;
        let start = Rect::from_points(first.position(), first.position());
        Some(
            self.points
                .iter()
                .skip(1)
                .fold(start, |rect, p| rect.union_pt(p.position())),
        )
    }
}

/// A straight piece of ink between two consecutive points of one stroke.
///
/// `from == to` for the first point of a stroke, which draws as a dot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: StrokePoint,
    pub to: StrokePoint,
    pub color: SerializableColor,
    pub width: f64,
}

impl Segment {
    /// The newest segment of a stroke.
    pub fn tail_of(stroke: &Stroke) -> Option<Self> {
        let to = *stroke.last_point()?;
        let from = stroke
            .points
            .len()
            .checked_sub(2)
            .map_or(to, |i| stroke.points[i]);
        Some(Self {
            from,
            to,
            color: stroke.color,
            width: stroke.width,
        })
    }
}

/// Return `stroke` with `point` appended.
pub fn append_point(mut stroke: Stroke, point: StrokePoint) -> Stroke {
    stroke.add_point(point);
    stroke
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64, t: u64) -> StrokePoint {
        StrokePoint::new(x, y, 1.0, t)
    }

    #[test]
    fn test_empty_stroke_rejected() {
        let result = Stroke::from_points(Vec::new(), SerializableColor::black(), 2.0);
        assert_eq!(result, Err(StrokeError::Empty));
    }

    #[test]
    fn test_invalid_width_rejected() {
        assert!(matches!(
            Stroke::begin(pt(0.0, 0.0, 0), SerializableColor::black(), 0.0),
            Err(StrokeError::InvalidWidth(_))
        ));
        assert!(matches!(
            Stroke::begin(pt(0.0, 0.0, 0), SerializableColor::black(), f64::NAN),
            Err(StrokeError::InvalidWidth(_))
        ));
    }

    #[test]
    fn test_validate_deserialized_stroke() {
        let json = r##"{"id":"6f9619ff-8b86-d011-b42d-00cf4fc964ff","points":[{"x":1.0,"y":1.0,"pressure":1.0,"timestamp":0}],"color":"#000000","width":-4.0}"##;
        let stroke: Stroke = serde_json::from_str(json).unwrap();
        assert_eq!(stroke.validate(), Err(StrokeError::InvalidWidth(-4.0)));

        let json = r##"{"id":"6f9619ff-8b86-d011-b42d-00cf4fc964ff","points":[],"color":"#000000","width":2.0}"##;
        let stroke: Stroke = serde_json::from_str(json).unwrap();
        assert_eq!(stroke.validate(), Err(StrokeError::Empty));
    }

    #[test]
    fn test_append_point_keeps_insertion_order() {
        let stroke = Stroke::begin(pt(0.0, 0.0, 10), SerializableColor::black(), 2.0).unwrap();
        let id = stroke.id();
        // Out-of-order timestamp is preserved, not rejected.
        let stroke = append_point(stroke, pt(5.0, 0.0, 5));
        let stroke = append_point(stroke, pt(9.0, 0.0, 20));

        assert_eq!(stroke.id(), id);
        let xs: Vec<f64> = stroke.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 5.0, 9.0]);
        assert_eq!(stroke.points()[1].timestamp, 5);
    }

    #[test]
    fn test_segments() {
        let stroke = Stroke::from_points(
            vec![pt(0.0, 0.0, 0), pt(10.0, 0.0, 1), pt(10.0, 10.0, 2)],
            SerializableColor::black(),
            1.0,
        )
        .unwrap();
        assert_eq!(stroke.segments().count(), 2);

        let dot = Stroke::begin(pt(3.0, 3.0, 0), SerializableColor::black(), 1.0).unwrap();
        assert_eq!(dot.segments().count(), 0);
    }

    #[test]
    fn test_bounds() {
        let stroke = Stroke::from_points(
            vec![pt(0.0, 0.0, 0), pt(100.0, 50.0, 1), pt(50.0, 100.0, 2)],
            SerializableColor::black(),
            1.0,
        )
        .unwrap();

        let bounds = stroke.bounds().unwrap();
        assert!((bounds.x0).abs() < f64::EPSILON);
        assert!((bounds.y0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pressure_clamped() {
        assert_eq!(StrokePoint::new(0.0, 0.0, 1.7, 0).pressure, 1.0);
        assert_eq!(StrokePoint::new(0.0, 0.0, -0.2, 0).pressure, 0.0);
        assert_eq!(StrokePoint::new(0.0, 0.0, f64::NAN, 0).pressure, 1.0);
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(SerializableColor::from_hex("#fff").unwrap(), SerializableColor::white());
        assert_eq!(
            SerializableColor::from_hex("#1e90ff").unwrap(),
            SerializableColor::rgb(0x1e, 0x90, 0xff)
        );
        assert_eq!(
            SerializableColor::from_hex("#00000080").unwrap(),
            SerializableColor::new(0, 0, 0, 128)
        );
        assert!(SerializableColor::from_hex("1e90ff").is_err());
        assert!(SerializableColor::from_hex("#12345").is_err());
        assert!(SerializableColor::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_string(&SerializableColor::rgb(255, 0, 0)).unwrap();
        assert_eq!(json, "\"#ff0000\"");

        let back: SerializableColor = serde_json::from_str("\"#00ff0080\"").unwrap();
        assert_eq!(back, SerializableColor::new(0, 255, 0, 128));
    }

    #[test]
    fn test_peniko_conversion() {
        let color = SerializableColor::rgb(12, 34, 56);
        let peniko: Color = color.into();
        assert_eq!(SerializableColor::from(peniko), color);
    }

    #[test]
    fn test_tail_segment() {
        let mut stroke = Stroke::begin(pt(1.0, 1.0, 0), SerializableColor::black(), 2.0).unwrap();
        let dot = Segment::tail_of(&stroke).unwrap();
        assert_eq!(dot.from, dot.to);

        stroke.add_point(pt(4.0, 5.0, 1));
        let seg = Segment::tail_of(&stroke).unwrap();
        assert_eq!(seg.from.position(), Point::new(1.0, 1.0));
        assert_eq!(seg.to.position(), Point::new(4.0, 5.0));
        assert!((seg.width - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stroke_json() {
        let stroke = Stroke::from_points(
            vec![pt(1.0, 2.0, 3), pt(4.0, 5.0, 6)],
            SerializableColor::rgb(0, 0, 255),
            2.5,
        )
        .unwrap();
        let json = serde_json::to_string(&stroke).unwrap();
        let back: Stroke = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stroke);
    }
}
