use crate::*;
use serde::Serialize;
use tracing::info;

/// A consistent copy of one door's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoorTotals {
    pub entries: u64,
    pub exits: u64,
    /// Tracks alive after the last processed frame.
    pub live_tracks: usize,
    /// Tracks dropped after exceeding the persistence threshold.
    pub tracks_destroyed: u64,
    /// Whether the last processed frame carried at least one valid observation.
    pub active: bool,
    pub frames_processed: u64,
}

impl DoorTotals {
    /// Entries minus exits through this door alone.
    pub fn net(&self) -> i64 {
        self.entries as i64 - self.exits as i64
    }
}

/// Counts entries and exits through a single doorway.
///
/// Owns the door's tracker and crossing detector. It knows nothing about other doors.
#[derive(Debug)]
pub struct DoorCounter {
    name: String,
    config: DoorConfig,
    tracker: Tracker,
    detector: CrossingDetector,
    entries: u64,
    exits: u64,
    frames_processed: u64,
    active: bool,
    last_event: Option<CrossingEvent>,
}

impl DoorCounter {
    /// Returns a new DoorCounter, failing if `config` is invalid.
    ///
    /// # Parameters
    ///
    /// * `name`: The door name used in events and logs.
    /// * `config`: Line and tracking parameters.
    pub fn new(name: impl Into<String>, config: DoorConfig) -> Result<DoorCounter> {
        let name = name.into();
        config.validate(&name)?;

        Ok(DoorCounter {
            tracker: Tracker::from_config(&config),
            detector: CrossingDetector::from_config(&config),
            name,
            config,
            entries: 0,
            exits: 0,
            frames_processed: 0,
            active: false,
            last_event: None,
        })
    }

    /// Return the door name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the door configuration
    pub fn config(&self) -> &DoorConfig {
        &self.config
    }

    /// Return the tracker
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Return the total entries since construction or the last reset
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Return the total exits since construction or the last reset
    pub fn exits(&self) -> u64 {
        self.exits
    }

    /// Return the most recent counted crossing
    pub fn last_event(&self) -> Option<&CrossingEvent> {
        self.last_event.as_ref()
    }

    /// Return a copy of the counters
    pub fn totals(&self) -> DoorTotals {
        DoorTotals {
            entries: self.entries,
            exits: self.exits,
            live_tracks: self.tracker.len(),
            tracks_destroyed: self.tracker.tracks_destroyed(),
            active: self.active,
            frames_processed: self.frames_processed,
        }
    }

    /// Track one frame's observations and count the crossings they produce.
    ///
    /// An empty batch is a detector gap: tracks age, counters stay as they are.
    pub fn process_frame(&mut self, batch: ObservationBatch) -> Vec<CrossingEvent> {
        let ObservationBatch {
            frame_index,
            observations,
        } = batch;

        self.active = observations.iter().any(Observation::is_valid);
        self.frames_processed += 1;

        let detector = &self.detector;
        let crossings = self
            .tracker
            .update(observations, frame_index)
            .into_iter()
            .filter_map(|track| {
                detector
                    .evaluate(track)
                    .map(|direction| (track.track_id(), direction))
            })
            .collect::<Vec<_>>();

        let events = crossings
            .into_iter()
            .map(|(track_id, direction)| {
                match direction {
                    Direction::Entry => self.entries += 1,
                    Direction::Exit => self.exits += 1,
                }
                info!(
                    door = %self.name,
                    track_id,
                    frame = frame_index,
                    entries = self.entries,
                    exits = self.exits,
                    "{direction} detected"
                );

                CrossingEvent::new(&self.name, direction, track_id, frame_index)
            })
            .collect::<Vec<_>>();

        if let Some(event) = events.last() {
            self.last_event = Some(event.clone());
        }

        events
    }

    /// Zero both counters and discard all tracks.
    pub fn reset(&mut self) {
        self.entries = 0;
        self.exits = 0;
        self.last_event = None;
        self.tracker.clear();
        info!(door = %self.name, "counters reset");
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use anyhow::Result;

    fn config(debounce_frames: u32) -> DoorConfig {
        DoorConfig::new(240.0, Orientation::Horizontal)
            .with_debounce_frames(debounce_frames)
            .to_owned()
    }

    /// Feed one person walking from `from_y` to `to_y` in steps of `step`, starting at `frame`.
    fn walk(
        door: &mut DoorCounter,
        from_y: f32,
        to_y: f32,
        step: f32,
        frame: &mut u64,
    ) -> Vec<CrossingEvent> {
        let mut events = vec![];
        let mut y = from_y;
        loop {
            events.extend(door.process_frame(ObservationBatch::new(
                *frame,
                vec![Observation::at(320.0, y, *frame)],
            )));
            *frame += 1;
            if (to_y - y).abs() < step {
                break;
            }
            y += step * (to_y - y).signum();
        }
        events
    }

    #[test]
    fn rejects_invalid_config() {
        let result = DoorCounter::new(
            "front",
            DoorConfig::default().with_match_distance(0.0).to_owned(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn counts_entry_and_exit() -> Result<()> {
        let mut door = DoorCounter::new("Door 1", config(5))?;
        let mut frame = 0;

        let events = walk(&mut door, 150.0, 330.0, 10.0, &mut frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Entry);
        assert_eq!(events[0].door, "Door 1");
        assert_eq!(events[0].track_id, 0);

        let events = walk(&mut door, 330.0, 150.0, 10.0, &mut frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Exit);
        assert_eq!(events[0].track_id, 0);

        assert_eq!(door.entries(), 1);
        assert_eq!(door.exits(), 1);
        assert_eq!(door.last_event().unwrap().direction, Direction::Exit);
        assert_eq!(door.totals().net(), 0);

        Ok(())
    }

    #[test]
    fn counts_are_monotonic() -> Result<()> {
        let mut door = DoorCounter::new("door", config(2))?;
        let mut previous = door.totals();

        for frame in 0..200u64 {
            // a hovering person plus periodic noise near the line
            let y = 240.0 + 20.0 * ((frame as f32) * 0.7).sin();
            let mut observations = vec![Observation::at(100.0, y, frame)];
            if frame % 7 == 0 {
                observations.push(Observation::at(500.0, 250.0 - (frame % 3) as f32 * 20.0, frame));
            }
            door.process_frame(ObservationBatch::new(frame, observations));

            let totals = door.totals();
            assert!(totals.entries >= previous.entries);
            assert!(totals.exits >= previous.exits);
            previous = totals;
        }

        door.reset();
        assert_eq!(door.entries(), 0);
        assert_eq!(door.exits(), 0);
        assert_eq!(door.tracker().len(), 0);
        assert!(door.last_event().is_none());

        Ok(())
    }

    #[test]
    fn empty_frames_do_not_count() -> Result<()> {
        let mut door = DoorCounter::new("door", config(0))?;
        let mut frame = 0;
        walk(&mut door, 200.0, 300.0, 20.0, &mut frame);
        assert_eq!(door.entries(), 1);

        for _ in 0..200 {
            let events = door.process_frame(ObservationBatch::empty(frame));
            assert!(events.is_empty());
            frame += 1;
        }

        let totals = door.totals();
        assert_eq!(totals.entries, 1);
        assert_eq!(totals.exits, 0);
        assert!(!totals.active);
        assert_eq!(totals.live_tracks, 0);
        assert_eq!(totals.tracks_destroyed, 1);

        Ok(())
    }

    #[test]
    fn re_matched_track_keeps_identity_and_side() -> Result<()> {
        let mut door = DoorCounter::new(
            "door",
            config(0).with_persistence_frames(20).to_owned(),
        )?;

        door.process_frame(ObservationBatch::new(0, vec![Observation::at(100.0, 300.0, 0)]));
        for frame in 1..10 {
            door.process_frame(ObservationBatch::empty(frame));
        }
        let events =
            door.process_frame(ObservationBatch::new(10, vec![Observation::at(110.0, 310.0, 10)]));

        assert!(events.is_empty());
        let track = door.tracker().track(0).unwrap();
        assert_eq!(track.side(), Side::Below);
        assert_eq!(track.frames_unseen(), 0);
        assert_eq!(door.tracker().len(), 1);

        Ok(())
    }

    #[test]
    fn reset_does_not_recycle_ids() -> Result<()> {
        let mut door = DoorCounter::new("door", config(0))?;
        let mut frame = 0;
        walk(&mut door, 200.0, 300.0, 20.0, &mut frame);
        door.reset();

        let events = walk(&mut door, 200.0, 300.0, 20.0, &mut frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].track_id, 1);
        assert_eq!(door.entries(), 1);

        Ok(())
    }

    #[test]
    fn person_hovering_on_the_line_is_not_counted() -> Result<()> {
        let mut door = DoorCounter::new("door", config(15))?;

        for frame in 0..120u64 {
            let y = if (frame / 2) % 2 == 0 { 230.0 } else { 250.0 };
            let events =
                door.process_frame(ObservationBatch::new(frame, vec![Observation::at(320.0, y, frame)]));
            assert!(events.is_empty(), "counted {:?} at frame {}", events, frame);
        }

        assert_eq!(door.totals().net(), 0);
        assert_eq!(door.tracker().len(), 1);

        Ok(())
    }

    #[test]
    fn two_people_cross_in_opposite_directions() -> Result<()> {
        let mut door = DoorCounter::new("door", config(3))?;
        let mut events = vec![];

        for frame in 0..20u64 {
            let offset = frame as f32 * 10.0;
            events.extend(door.process_frame(ObservationBatch::new(
                frame,
                vec![
                    Observation::at(100.0, 150.0 + offset, frame),
                    Observation::at(500.0, 330.0 - offset, frame),
                ],
            )));
        }

        assert_eq!(door.entries(), 1);
        assert_eq!(door.exits(), 1);
        let mut directions = events
            .iter()
            .map(|event| (event.track_id, event.direction))
            .collect::<Vec<_>>();
        directions.sort_by_key(|(track_id, _)| *track_id);
        assert_eq!(directions, vec![(0, Direction::Entry), (1, Direction::Exit)]);

        Ok(())
    }
}
