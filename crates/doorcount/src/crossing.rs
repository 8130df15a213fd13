use crate::*;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Direction of a counted line crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `Above -> Below` for horizontal lines, `Left -> Right` for vertical lines.
    Entry,
    /// `Below -> Above` for horizontal lines, `Right -> Left` for vertical lines.
    Exit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Entry => write!(f, "entry"),
            Direction::Exit => write!(f, "exit"),
        }
    }
}

static EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A counted crossing, as reported to presentation and logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingEvent {
    pub door: String,
    pub direction: Direction,
    pub track_id: usize,
    pub frame_index: u64,
    /// Process-wide ordering of events across all doors.
    pub sequence: u64,
}

impl CrossingEvent {
    pub fn new(door: &str, direction: Direction, track_id: usize, frame_index: u64) -> CrossingEvent {
        CrossingEvent {
            door: door.to_string(),
            direction,
            track_id,
            frame_index,
            sequence: EVENT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Decides when a track has crossed a doorway's counting line.
///
/// Each track carries its own `side` state. The first evaluation of a track only establishes that side; afterwards
/// a change of side counts as a crossing when both hold:
///
/// - `debounce_frames` have passed since the track was created or last counted.
/// - The track is settled: it stayed on its confirmed side for `debounce_frames` right before the change, or it has
///   now stayed on the new side for `debounce_frames`.
///
/// Other side changes are dropped as jitter: the track keeps its side and its debounce counter keeps running. A
/// person hovering on the line is therefore never counted, however long they hover.
#[derive(Debug, Clone)]
pub struct CrossingDetector {
    line_position: f32,
    orientation: Orientation,
    debounce_frames: u32,
    dead_band: f32,
}

impl CrossingDetector {
    /// Returns a new CrossingDetector
    ///
    /// # Parameters
    ///
    /// * `line_position`: The line coordinate (`y` for horizontal lines, `x` for vertical ones).
    /// * `orientation`: The line orientation.
    /// * `debounce_frames`: Frames required between counted crossings of one track.
    pub fn new(line_position: f32, orientation: Orientation, debounce_frames: u32) -> CrossingDetector {
        CrossingDetector {
            line_position,
            orientation,
            debounce_frames,
            dead_band: 0.0,
        }
    }

    /// Returns a new CrossingDetector using the line parameters of `config`
    pub fn from_config(config: &DoorConfig) -> CrossingDetector {
        CrossingDetector {
            line_position: config.line_position,
            orientation: config.orientation,
            debounce_frames: config.debounce_frames,
            dead_band: config.dead_band,
        }
    }

    /// Set dead_band
    pub fn with_dead_band(&mut self, dead_band: f32) -> &mut Self {
        self.dead_band = dead_band;
        self
    }

    /// Returns the side of the line `point` is on, or `None` when it lies inside the dead band.
    ///
    /// Points exactly on the line belong to `Above` (horizontal) or `Left` (vertical).
    pub fn side_of(&self, point: &Point) -> Option<Side> {
        let coordinate = self.orientation.coordinate(point);
        if (coordinate - self.line_position).abs() < self.dead_band {
            return None;
        }

        let beyond = coordinate > self.line_position;
        Some(match (self.orientation, beyond) {
            (Orientation::Horizontal, false) => Side::Above,
            (Orientation::Horizontal, true) => Side::Below,
            (Orientation::Vertical, false) => Side::Left,
            (Orientation::Vertical, true) => Side::Right,
        })
    }

    /// Evaluate `track` for the current frame. Must be called exactly once per live track per frame.
    ///
    /// # Returns
    ///
    /// The direction of the crossing if one has just been counted.
    pub fn evaluate(&self, track: &mut Track) -> Option<Direction> {
        let Some(current_side) = self.side_of(track.position()) else {
            track.advance_debounce();
            return None;
        };
        let previous_run = track.observe_side(current_side);

        if track.side().is_unknown() {
            track.set_side(current_side);
            return None;
        }

        if current_side == track.side() {
            track.advance_debounce();
            return None;
        }

        let settled = match previous_run {
            Some(frames) => frames >= self.debounce_frames,
            None => track.frames_on_side() >= self.debounce_frames,
        };
        if track.frames_since_crossing() < self.debounce_frames || !settled {
            debug!(
                track_id = track.track_id(),
                frames_since_crossing = track.frames_since_crossing(),
                frames_on_side = track.frames_on_side(),
                debounce_frames = self.debounce_frames,
                "crossing blocked by debounce"
            );
            track.advance_debounce();
            return None;
        }

        let direction = match (track.side(), current_side) {
            (Side::Above, Side::Below) | (Side::Left, Side::Right) => Direction::Entry,
            (Side::Below, Side::Above) | (Side::Right, Side::Left) => Direction::Exit,
            _ => return None,
        };

        track.set_side(current_side);
        track.reset_debounce();
        Some(direction)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn track_at(x: f32, y: f32) -> Track {
        Track::new(0, &Observation::at(x, y, 0), 10)
    }

    fn move_to(track: &mut Track, x: f32, y: f32, frame: u64) {
        track.update(&Observation::at(x, y, frame));
    }

    #[test]
    fn side_of_horizontal_line() {
        let detector = CrossingDetector::new(240.0, Orientation::Horizontal, 15);
        assert_eq!(detector.side_of(&Point::new(0.0, 100.0)), Some(Side::Above));
        assert_eq!(detector.side_of(&Point::new(0.0, 240.0)), Some(Side::Above));
        assert_eq!(detector.side_of(&Point::new(0.0, 240.5)), Some(Side::Below));
    }

    #[test]
    fn side_of_vertical_line() {
        let detector = CrossingDetector::new(320.0, Orientation::Vertical, 15);
        assert_eq!(detector.side_of(&Point::new(10.0, 900.0)), Some(Side::Left));
        assert_eq!(detector.side_of(&Point::new(330.0, 0.0)), Some(Side::Right));
    }

    #[test]
    fn first_observation_is_neutral() {
        let detector = CrossingDetector::new(240.0, Orientation::Horizontal, 0);
        for y in [0.0, 239.0, 240.0, 241.0, 480.0] {
            let mut track = track_at(50.0, y);
            assert_eq!(detector.evaluate(&mut track), None);
            assert!(!track.side().is_unknown());
        }
    }

    #[test]
    fn entry_then_exit() {
        let detector = CrossingDetector::new(240.0, Orientation::Horizontal, 3);
        let mut track = track_at(100.0, 200.0);
        assert_eq!(detector.evaluate(&mut track), None);
        assert_eq!(track.side(), Side::Above);

        let mut frame = 1;
        let mut events = vec![];
        for y in [210.0, 220.0, 230.0, 250.0, 260.0, 270.0, 280.0, 230.0, 220.0] {
            move_to(&mut track, 100.0, y, frame);
            events.extend(detector.evaluate(&mut track));
            frame += 1;
        }

        assert_eq!(events, vec![Direction::Entry, Direction::Exit]);
        assert_eq!(track.side(), Side::Above);
        assert_eq!(track.frames_since_crossing(), 1);
    }

    #[test]
    fn vertical_entry() {
        let detector = CrossingDetector::new(320.0, Orientation::Vertical, 0);
        let mut track = track_at(300.0, 100.0);
        detector.evaluate(&mut track);

        move_to(&mut track, 340.0, 100.0, 1);
        assert_eq!(detector.evaluate(&mut track), Some(Direction::Entry));
        assert_eq!(track.side(), Side::Right);

        move_to(&mut track, 300.0, 100.0, 2);
        assert_eq!(detector.evaluate(&mut track), Some(Direction::Exit));
    }

    #[test]
    fn blocked_crossing_keeps_side_and_counter() {
        let detector = CrossingDetector::new(240.0, Orientation::Horizontal, 5);
        let mut track = track_at(0.0, 200.0);
        detector.evaluate(&mut track);

        move_to(&mut track, 0.0, 200.0, 1);
        detector.evaluate(&mut track);
        assert_eq!(track.frames_since_crossing(), 1);

        move_to(&mut track, 0.0, 260.0, 2);
        assert_eq!(detector.evaluate(&mut track), None);
        assert_eq!(track.side(), Side::Above);
        // the blocked attempt does not restart the window
        assert_eq!(track.frames_since_crossing(), 2);
        assert_eq!(track.observed_side(), Side::Below);
        assert_eq!(track.frames_on_side(), 1);
    }

    /// Alternate between both sides of the line every 2 frames, for `frames` frames.
    fn hover(
        detector: &CrossingDetector,
        track: &mut Track,
        frame: &mut u64,
        frames: u64,
        events: &mut Vec<(u64, Direction)>,
    ) {
        for _ in 0..frames {
            let y = if (*frame / 2) % 2 == 0 { 230.0 } else { 250.0 };
            move_to(track, 0.0, y, *frame);
            events.extend(detector.evaluate(track).map(|direction| (*frame, direction)));
            *frame += 1;
        }
    }

    #[test]
    fn hovering_is_never_counted() {
        let debounce_frames = 15;
        let detector = CrossingDetector::new(240.0, Orientation::Horizontal, debounce_frames);
        let mut track = track_at(0.0, 230.0);
        detector.evaluate(&mut track);

        // hover across the line for four debounce windows
        let mut frame = 1u64;
        let mut events = vec![];
        hover(&detector, &mut track, &mut frame, 60, &mut events);
        assert!(events.is_empty());
        assert_eq!(track.side(), Side::Above);
        assert!(track.frames_since_crossing() > debounce_frames);

        // settle above the line for a full debounce window
        for _ in 0..debounce_frames {
            move_to(&mut track, 0.0, 230.0, frame);
            events.extend(detector.evaluate(&mut track).map(|direction| (frame, direction)));
            frame += 1;
        }
        assert!(events.is_empty());

        // the next genuine transition counts once
        let crossing_frame = frame;
        for _ in 0..5 {
            move_to(&mut track, 0.0, 260.0, frame);
            events.extend(detector.evaluate(&mut track).map(|direction| (frame, direction)));
            frame += 1;
        }
        assert_eq!(events, vec![(crossing_frame, Direction::Entry)]);
    }

    #[test]
    fn hovering_then_leaving_counts_once_settled() {
        let debounce_frames = 15;
        let detector = CrossingDetector::new(240.0, Orientation::Horizontal, debounce_frames);
        let mut track = track_at(0.0, 230.0);
        detector.evaluate(&mut track);

        let mut frame = 1u64;
        let mut events = vec![];
        hover(&detector, &mut track, &mut frame, 20, &mut events);
        assert!(events.is_empty());

        // step below the line and stay there
        let first_below = frame;
        for _ in 0..30 {
            move_to(&mut track, 0.0, 260.0, frame);
            events.extend(detector.evaluate(&mut track).map(|direction| (frame, direction)));
            frame += 1;
        }

        // counted once the new side has been held for the window
        let settled_frame = first_below + debounce_frames as u64 - 1;
        assert_eq!(events, vec![(settled_frame, Direction::Entry)]);
        assert_eq!(track.side(), Side::Below);
    }

    #[test]
    fn dead_band_has_no_side() {
        let mut detector = CrossingDetector::new(240.0, Orientation::Horizontal, 0);
        detector.with_dead_band(30.0);

        let mut track = track_at(0.0, 235.0);
        assert_eq!(detector.evaluate(&mut track), None);
        assert!(track.side().is_unknown());

        move_to(&mut track, 0.0, 200.0, 1);
        assert_eq!(detector.evaluate(&mut track), None);
        assert_eq!(track.side(), Side::Above);

        // inside the band: no crossing, side untouched
        move_to(&mut track, 0.0, 260.0, 2);
        assert_eq!(detector.evaluate(&mut track), None);
        assert_eq!(track.side(), Side::Above);

        move_to(&mut track, 0.0, 275.0, 3);
        assert_eq!(detector.evaluate(&mut track), Some(Direction::Entry));
    }
}
