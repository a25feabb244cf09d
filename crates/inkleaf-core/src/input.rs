//! Pointer and touch events delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    #[default]
    Mouse,
    Touch,
}

/// Pointer event type for unified mouse/touch handling.
///
/// Positions are in screen coordinates; `timestamp` is a monotonic clock
/// reading in milliseconds supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Mouse button pressed or touch started.
    Down {
        position: Point,
        source: InputSource,
        timestamp: u64,
    },
    Move {
        position: Point,
        source: InputSource,
        timestamp: u64,
    },
    /// Mouse button released or touch ended.
    Up {
        position: Point,
        source: InputSource,
        timestamp: u64,
    },
    /// Pointer left the surface or the touch was cancelled.
    Leave { source: InputSource, timestamp: u64 },
}

/// Milliseconds elapsed since the first call in this process.
pub fn monotonic_ms() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock() {
        let a = monotonic_ms();
        let b = monotonic_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_event_json() {
        let json = r#"{ "kind": "move", "position": { "x": 3.0, "y": 4.0 }, "source": "mouse", "timestamp": 12 }"#;
        let event: PointerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PointerEvent::Move {
                position: Point::new(3.0, 4.0),
                source: InputSource::Mouse,
                timestamp: 12,
            }
        );
    }
}
