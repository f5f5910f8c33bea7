//! Remote pointer commands and the stroke paths they replay as.
//!
//! A [`GestureCommand`] is what the transport layer hands us; a
//! [`Gesture`] is what the input-injection surface receives. Conversion
//! between the two is where untrusted parameters get validated.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CastError;

/// Default hold time of a synthetic tap.
pub const CLICK_DURATION: Duration = Duration::from_millis(100);

// ── Inbound command ───────────────────────────────────────────────

/// Pointer command received from a remote viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureCommand {
    /// Opaque identifier assigned by the transport layer.
    pub id: String,

    /// What to replay.
    #[serde(flatten)]
    pub kind: GestureKind,
}

/// Kind of pointer action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureKind {
    /// Single tap at a screen coordinate.
    Click { x: f64, y: f64 },

    /// Drag from `(x0, y0)` to `(x1, y1)` over `duration_ms`.
    Swipe {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        duration_ms: i64,
    },
}

impl GestureCommand {
    /// Create a click command.
    pub fn click(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind: GestureKind::Click { x, y },
        }
    }

    /// Create a swipe command.
    pub fn swipe(
        id: impl Into<String>,
        (x0, y0): (f64, f64),
        (x1, y1): (f64, f64),
        duration_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: GestureKind::Swipe {
                x0,
                y0,
                x1,
                y1,
                duration_ms,
            },
        }
    }

    /// Bus event name this command travels under.
    pub fn event_name(&self) -> &'static str {
        match self.kind {
            GestureKind::Click { .. } => "ClientClick",
            GestureKind::Swipe { .. } => "ClientSwipe",
        }
    }

    /// Validate the command and build the stroke path to dispatch.
    ///
    /// Clicks hold for `click_duration`; swipes use their own duration,
    /// which must be strictly positive.
    pub fn to_gesture(&self, click_duration: Duration) -> Result<Gesture, CastError> {
        let stroke = match self.kind {
            GestureKind::Click { x, y } => {
                let at = self.point(x, y)?;
                Stroke::new(vec![at], click_duration)
            }
            GestureKind::Swipe {
                x0,
                y0,
                x1,
                y1,
                duration_ms,
            } => {
                if duration_ms <= 0 {
                    return Err(self.invalid("swipe duration must be positive"));
                }
                let from = self.point(x0, y0)?;
                let to = self.point(x1, y1)?;
                Stroke::new(vec![from, to], Duration::from_millis(duration_ms as u64))
            }
        };

        Ok(Gesture {
            command_id: self.id.clone(),
            strokes: vec![stroke],
        })
    }

    fn point(&self, x: f64, y: f64) -> Result<Point, CastError> {
        // Checked after narrowing: finite values beyond f32::MAX become inf.
        let at = Point {
            x: x as f32,
            y: y as f32,
        };
        if !at.x.is_finite() || !at.y.is_finite() {
            return Err(self.invalid("coordinates must be finite"));
        }
        // Injection surfaces reject paths with negative bounds.
        if at.x < 0.0 || at.y < 0.0 {
            return Err(self.invalid("coordinates must not be negative"));
        }
        Ok(at)
    }

    fn invalid(&self, reason: &'static str) -> CastError {
        CastError::InvalidCommand {
            id: self.id.clone(),
            reason,
        }
    }
}

// ── Outbound gesture ──────────────────────────────────────────────

/// A screen coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One timed stroke: the pointer follows `path` starting at
/// `start_time` and lasting `duration`.
///
/// A single-point path is a tap held in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub path: Vec<Point>,
    pub start_time: Duration,
    pub duration: Duration,
}

impl Stroke {
    /// A stroke that starts immediately.
    pub fn new(path: Vec<Point>, duration: Duration) -> Self {
        Self {
            path,
            start_time: Duration::ZERO,
            duration,
        }
    }
}

/// A fully validated gesture ready for the injection surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    /// Id of the command this gesture was built from.
    pub command_id: String,
    pub strokes: Vec<Stroke>,
}

impl Gesture {
    /// Wall time from the first stroke's start to the last stroke's end.
    pub fn total_duration(&self) -> Duration {
        self.strokes
            .iter()
            .map(|s| s.start_time + s.duration)
            .max()
            .unwrap_or_default()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_is_single_point_tap() {
        let g = GestureCommand::click("c1", 10.0, 20.0)
            .to_gesture(CLICK_DURATION)
            .unwrap();
        assert_eq!(g.command_id, "c1");
        assert_eq!(g.strokes.len(), 1);
        assert_eq!(g.strokes[0].path, vec![Point { x: 10.0, y: 20.0 }]);
        assert_eq!(g.strokes[0].duration, Duration::from_millis(100));
    }

    #[test]
    fn swipe_is_two_point_stroke() {
        let g = GestureCommand::swipe("s1", (0.0, 0.0), (100.0, 50.0), 250)
            .to_gesture(CLICK_DURATION)
            .unwrap();
        assert_eq!(g.strokes.len(), 1);
        let stroke = &g.strokes[0];
        assert_eq!(stroke.path.len(), 2);
        assert_eq!(stroke.path[1], Point { x: 100.0, y: 50.0 });
        assert_eq!(stroke.duration, Duration::from_millis(250));
        assert_eq!(g.total_duration(), Duration::from_millis(250));
    }

    #[test]
    fn swipe_rejects_non_positive_duration() {
        for duration in [0, -5] {
            let err = GestureCommand::swipe("s", (0.0, 0.0), (1.0, 1.0), duration)
                .to_gesture(CLICK_DURATION)
                .unwrap_err();
            assert!(matches!(err, CastError::InvalidCommand { .. }));
        }
    }

    #[test]
    fn rejects_bad_coordinates() {
        let nan = GestureCommand::click("c", f64::NAN, 1.0).to_gesture(CLICK_DURATION);
        assert!(nan.is_err());
        let negative = GestureCommand::click("c", -1.0, 1.0).to_gesture(CLICK_DURATION);
        assert!(negative.is_err());
    }

    #[test]
    fn rejects_coordinates_beyond_f32_range() {
        let huge = GestureCommand::click("c", 1e39, 1.0).to_gesture(CLICK_DURATION);
        assert!(matches!(huge, Err(CastError::InvalidCommand { .. })));

        let swipe = GestureCommand::swipe("s", (0.0, 0.0), (1.0, 1e300), 100)
            .to_gesture(CLICK_DURATION);
        assert!(matches!(swipe, Err(CastError::InvalidCommand { .. })));

        let edge = GestureCommand::click("c", f32::MAX as f64, 0.0).to_gesture(CLICK_DURATION);
        assert!(edge.is_ok());
    }

    #[test]
    fn event_names() {
        assert_eq!(GestureCommand::click("c", 0.0, 0.0).event_name(), "ClientClick");
        assert_eq!(
            GestureCommand::swipe("s", (0.0, 0.0), (1.0, 1.0), 1).event_name(),
            "ClientSwipe"
        );
    }

    #[test]
    fn decodes_tagged_json() {
        let cmd: GestureCommand =
            serde_json::from_str(r#"{"id":"s9","kind":"swipe","x0":1,"y0":2,"x1":3,"y1":4,"duration_ms":250}"#)
                .unwrap();
        assert_eq!(cmd, GestureCommand::swipe("s9", (1.0, 2.0), (3.0, 4.0), 250));
    }
}
