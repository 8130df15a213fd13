use crate::{Error, Point, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orientation of a doorway's counting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// The line spans the frame from left to right; sides are `Above`/`Below` by `y`.
    #[default]
    Horizontal,
    /// The line spans the frame from top to bottom; sides are `Left`/`Right` by `x`.
    Vertical,
}

impl Orientation {
    /// Returns the coordinate of `point` compared against the line.
    pub fn coordinate(&self, point: &Point) -> f32 {
        match self {
            Orientation::Horizontal => point.y(),
            Orientation::Vertical => point.x(),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

/// Per-door tracking and counting parameters.
///
/// Immutable once a `DoorCounter` has been built from it; changing the configuration means building a new counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Position of the counting line in pixels (a `y` for horizontal lines, an `x` for vertical ones).
    pub line_position: f32,
    /// Orientation of the counting line.
    pub orientation: Orientation,
    /// Gating threshold. Observations further than this from a track are never associated with it.
    pub match_distance: f32,
    /// Frames that must elapse after a counted crossing (or track creation) before another crossing counts.
    pub debounce_frames: u32,
    /// Maximum number of consecutive unmatched frames before a track is destroyed.
    pub persistence_frames: u32,
    /// Number of recent positions kept per track.
    pub history_capacity: usize,
    /// Half-width of a band around the line where positions have no side. `0.0` disables it.
    pub dead_band: f32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        DoorConfig {
            line_position: 240.0,
            orientation: Orientation::Horizontal,
            match_distance: 80.0,
            debounce_frames: 15,
            persistence_frames: 150,
            history_capacity: 30,
            dead_band: 0.0,
        }
    }
}

impl DoorConfig {
    /// Returns a config with default parameters and the given line.
    pub fn new(line_position: f32, orientation: Orientation) -> DoorConfig {
        DoorConfig {
            line_position,
            orientation,
            ..Default::default()
        }
    }

    /// Set match_distance
    pub fn with_match_distance(&mut self, match_distance: f32) -> &mut Self {
        self.match_distance = match_distance;
        self
    }

    /// Set debounce_frames
    pub fn with_debounce_frames(&mut self, debounce_frames: u32) -> &mut Self {
        self.debounce_frames = debounce_frames;
        self
    }

    /// Set persistence_frames
    pub fn with_persistence_frames(&mut self, persistence_frames: u32) -> &mut Self {
        self.persistence_frames = persistence_frames;
        self
    }

    /// Set history_capacity
    pub fn with_history_capacity(&mut self, history_capacity: usize) -> &mut Self {
        self.history_capacity = history_capacity;
        self
    }

    /// Set dead_band
    pub fn with_dead_band(&mut self, dead_band: f32) -> &mut Self {
        self.dead_band = dead_band;
        self
    }

    /// Check the parameters for door `door`, failing on the first invalid one.
    pub fn validate(&self, door: &str) -> Result<()> {
        let invalid = |reason: String| {
            Err(Error::InvalidConfig {
                door: door.to_string(),
                reason,
            })
        };

        if !self.line_position.is_finite() {
            return invalid(format!(
                "line_position must be finite, got {}",
                self.line_position
            ));
        }
        if !(self.match_distance.is_finite() && self.match_distance > 0.0) {
            return invalid(format!(
                "match_distance must be a positive number, got {}",
                self.match_distance
            ));
        }
        if self.persistence_frames == 0 {
            return invalid("persistence_frames must be at least 1".to_string());
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity must be at least 1".to_string());
        }
        if !(self.dead_band.is_finite() && self.dead_band >= 0.0) {
            return invalid(format!(
                "dead_band must be a non-negative number, got {}",
                self.dead_band
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DoorConfig::default().validate("door").is_ok());
    }

    #[test]
    fn rejects_non_positive_match_distance() {
        for match_distance in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = DoorConfig::default()
                .with_match_distance(match_distance)
                .to_owned();
            match config.validate("front") {
                Err(Error::InvalidConfig { door, reason }) => {
                    assert_eq!(door, "front");
                    assert!(reason.contains("match_distance"));
                }
                other => panic!("expected InvalidConfig, got {:?}", other),
            }
        }
    }

    #[test]
    fn rejects_zero_capacities() {
        let config = DoorConfig::default().with_persistence_frames(0).to_owned();
        assert!(config.validate("door").is_err());

        let config = DoorConfig::default().with_history_capacity(0).to_owned();
        assert!(config.validate("door").is_err());
    }

    #[test]
    fn rejects_negative_dead_band() {
        let config = DoorConfig::default().with_dead_band(-5.0).to_owned();
        assert!(config.validate("door").is_err());
    }

    #[test]
    fn orientation_selects_coordinate() {
        let point = Point::new(10.0, 20.0);
        assert_eq!(Orientation::Horizontal.coordinate(&point), 20.0);
        assert_eq!(Orientation::Vertical.coordinate(&point), 10.0);
    }
}
