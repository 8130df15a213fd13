use crate::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observation represents a single person position reported by a detector for one frame.
///
/// Observations carry no persistent identity; the tracker decides which track each one belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Unique observation identifier, only used for diagnostics.
    id: Uuid,
    /// Position of the person in image space.
    position: Point,
    /// Frame the observation was produced for.
    frame_index: u64,
    /// Whether the detector considers this observation usable.
    valid: bool,
}

impl PartialEq for Observation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Observation {
    /// Returns a new Observation
    ///
    /// # Parameters
    ///
    /// * `id`: An optional identifier. A random one is generated when `None`.
    /// * `position`: The observed position.
    /// * `frame_index`: The frame the observation belongs to.
    /// * `valid`: Whether the observation should be considered by the tracker.
    pub fn new(id: Option<Uuid>, position: Point, frame_index: u64, valid: bool) -> Observation {
        Observation {
            id: id.unwrap_or_else(Uuid::new_v4),
            position,
            frame_index,
            valid,
        }
    }

    /// Returns a valid observation at `(x, y)` for `frame_index`
    pub fn at(x: f32, y: f32, frame_index: u64) -> Observation {
        Observation::new(None, Point::new(x, y), frame_index, true)
    }

    /// Returns the unique id of the observation
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Returns the observed position
    pub fn position(&self) -> &Point {
        &self.position
    }

    /// Returns the frame index of the observation
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns whether the observation is valid
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// All observations a detector produced for one frame of one doorway.
#[derive(Debug, Clone, Default)]
pub struct ObservationBatch {
    pub frame_index: u64,
    pub observations: Vec<Observation>,
}

impl ObservationBatch {
    pub fn new(frame_index: u64, observations: Vec<Observation>) -> ObservationBatch {
        ObservationBatch {
            frame_index,
            observations,
        }
    }

    /// A batch with no observations, i.e. a detector gap.
    pub fn empty(frame_index: u64) -> ObservationBatch {
        ObservationBatch::new(frame_index, vec![])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
