use crate::*;
use serde::Serialize;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Which side of a doorway's counting line a track is on.
///
/// - Newly created tracks are `Unknown` until the crossing detector has established a starting side.
/// - Horizontal lines use `Above` and `Below` (image `y` grows downwards, so `Above` means a smaller `y`).
/// - Vertical lines use `Left` and `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Unknown,
    Above,
    Below,
    Left,
    Right,
}

impl Side {
    /// Returns true if no starting side has been established.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Side::Unknown)
    }
}

/// A single hypothesized person followed across frames.
pub struct Track {
    /// A unique track identifier, never reused within a session.
    track_id: usize,
    /// The latest associated position.
    position: Point,
    /// Recent positions, newest at the back.
    history: VecDeque<Point>,
    /// Maximum length of `history`.
    history_capacity: usize,
    /// The side of the counting line this track was last confirmed on.
    side: Side,
    /// Frames since creation or the last counted crossing.
    frames_since_crossing: u32,
    /// The side the latest position fell on, which may differ from `side` while a crossing is pending.
    observed_side: Side,
    /// Consecutive frames spent on `observed_side`.
    frames_on_side: u32,
    /// Consecutive frames without an associated observation.
    frames_unseen: u32,
    /// Frame index of the latest associated observation.
    last_seen: u64,
    /// Total number of associated observations.
    hits: usize,
    /// Total number of frames since first occurance.
    age: usize,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("track_id", &self.track_id)
            .field("position", &self.position)
            .field("side", &self.side)
            .field("frames_since_crossing", &self.frames_since_crossing)
            .field("observed_side", &self.observed_side)
            .field("frames_on_side", &self.frames_on_side)
            .field("frames_unseen", &self.frames_unseen)
            .field("last_seen", &self.last_seen)
            .field("hits", &self.hits)
            .field("age", &self.age)
            .finish()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.track_id == other.track_id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.track_id.hash(state);
    }
}

impl Track {
    /// Returns a new Track seeded with the observation it originates from.
    ///
    /// # Parameters
    ///
    /// * `track_id`: A unique track identifier.
    /// * `observation`: The unmatched observation that starts this track.
    /// * `history_capacity`: Number of recent positions to keep.
    pub fn new(track_id: usize, observation: &Observation, history_capacity: usize) -> Track {
        let capacity = history_capacity.max(1);
        let mut history = VecDeque::with_capacity(capacity);
        history.push_back(*observation.position());

        Track {
            track_id,
            position: *observation.position(),
            history,
            history_capacity: capacity,
            side: Side::Unknown,
            frames_since_crossing: 0,
            observed_side: Side::Unknown,
            frames_on_side: 0,
            frames_unseen: 0,
            last_seen: observation.frame_index(),
            hits: 1,
            age: 1,
        }
    }

    /// Return the identifier of the track
    pub fn track_id(&self) -> usize {
        self.track_id
    }

    /// Return the latest associated position
    pub fn position(&self) -> &Point {
        &self.position
    }

    /// Return the recent positions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Point> {
        self.history.iter()
    }

    /// Return the side of the counting line
    pub fn side(&self) -> Side {
        self.side
    }

    /// Return the frames since creation or the last counted crossing
    pub fn frames_since_crossing(&self) -> u32 {
        self.frames_since_crossing
    }

    /// Return the side the latest position fell on
    pub fn observed_side(&self) -> Side {
        self.observed_side
    }

    /// Return the consecutive frames spent on the observed side
    pub fn frames_on_side(&self) -> u32 {
        self.frames_on_side
    }

    /// Return the consecutive frames without an observation
    pub fn frames_unseen(&self) -> u32 {
        self.frames_unseen
    }

    /// Return the frame index of the latest associated observation
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Return the number of associated observations
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Return the number of frames the track has been alive
    pub fn age(&self) -> usize {
        self.age
    }

    /// Returns the motion across the history window (newest minus oldest), if there is any history to compare.
    pub fn displacement(&self) -> Option<(f32, f32)> {
        if self.history.len() < 2 {
            return None;
        }
        let oldest = self.history.front()?;
        let newest = self.history.back()?;
        Some((newest.x() - oldest.x(), newest.y() - oldest.y()))
    }

    /// Associate an observation with this track.
    pub(crate) fn update(&mut self, observation: &Observation) {
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(*observation.position());

        self.position = *observation.position();
        self.last_seen = observation.frame_index();
        self.frames_unseen = 0;
        self.hits += 1;
        self.age += 1;
    }

    /// Mark this track as missed for one frame.
    pub(crate) fn mark_missed(&mut self) {
        self.frames_unseen = self.frames_unseen.saturating_add(1);
        self.age += 1;
    }

    /// Transition to a new side. This is the only way `side` changes.
    pub(crate) fn set_side(&mut self, side: Side) {
        debug!(
            track_id = self.track_id,
            from = ?self.side,
            to = ?side,
            "track side changed"
        );
        self.side = side;
    }

    /// Record the side of the latest position, returning how long the previous run lasted if the side changed.
    pub(crate) fn observe_side(&mut self, side: Side) -> Option<u32> {
        if side == self.observed_side {
            self.frames_on_side = self.frames_on_side.saturating_add(1);
            return None;
        }

        let previous = self.frames_on_side;
        self.observed_side = side;
        self.frames_on_side = 1;
        Some(previous)
    }

    pub(crate) fn advance_debounce(&mut self) {
        self.frames_since_crossing = self.frames_since_crossing.saturating_add(1);
    }

    pub(crate) fn reset_debounce(&mut self) {
        self.frames_since_crossing = 0;
    }
}
