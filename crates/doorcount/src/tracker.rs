use crate::*;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// This is the per-door multi-person tracker.
///
/// Observations are associated with live tracks by greedy nearest-neighbour matching under a distance gate.
/// Tracks that go unmatched for more than `persistence_frames` consecutive frames are destroyed, and every
/// observation left over starts a new track with a fresh identifier.
///
/// # Examples
///
/// ```
/// use doorcount::{Observation, Tracker};
///
/// let mut tracker = Tracker::new(80.0, 150, 30);
///
/// tracker.update(vec![Observation::at(100.0, 50.0, 0)], 0);
/// tracker.update(vec![Observation::at(104.0, 60.0, 1)], 1);
///
/// for track in tracker.tracks() {
///     println!("{} {:?} {:?}", track.track_id(), track.position(), track.side());
/// }
/// assert_eq!(tracker.len(), 1);
/// ```
#[derive(Debug)]
pub struct Tracker {
    /// Gating threshold. Observations this far or further from a track are never associated with it.
    match_distance: f32,
    /// Maximum number of consecutive misses before a track is deleted.
    persistence_frames: u32,
    /// Number of recent positions kept per track.
    history_capacity: usize,
    /// The live tracks, ordered by identifier.
    tracks: BTreeMap<usize, Track>,
    /// Used to allocate identifiers to new tracks.
    next_id: usize,
    /// Number of tracks destroyed after exceeding `persistence_frames`.
    tracks_destroyed: u64,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::from_config(&DoorConfig::default())
    }
}

impl Tracker {
    /// Returns a new Tracker
    ///
    /// # Arguments
    ///
    /// * `match_distance`: Gating threshold for association, in pixels.
    /// * `persistence_frames`: Maximum number of consecutive misses before a track is deleted.
    /// * `history_capacity`: Number of recent positions kept per track.
    pub fn new(match_distance: f32, persistence_frames: u32, history_capacity: usize) -> Tracker {
        Tracker {
            match_distance,
            persistence_frames,
            history_capacity,
            tracks: BTreeMap::new(),
            next_id: 0,
            tracks_destroyed: 0,
        }
    }

    /// Returns a new Tracker using the association parameters of `config`
    pub fn from_config(config: &DoorConfig) -> Tracker {
        Self::new(
            config.match_distance,
            config.persistence_frames,
            config.history_capacity,
        )
    }

    /// Return the live tracks in identifier order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Return the track with identifier `track_id`, if it is still live
    pub fn track(&self, track_id: usize) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Return the number of live tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Return true if there are no live tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Return the number of tracks destroyed for going unseen too long
    pub fn tracks_destroyed(&self) -> u64 {
        self.tracks_destroyed
    }

    /// Discard all live tracks. Identifiers already issued are not reused.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Perform association and track management for one frame.
    ///
    /// # Parameters
    ///
    /// * `observations`: The observations of the current frame. Invalid observations are ignored.
    /// * `now`: The current frame index.
    pub fn update(&mut self, observations: Vec<Observation>, now: u64) -> Vec<&mut Track> {
        let (observations, rejected): (Vec<Observation>, Vec<Observation>) = observations
            .into_iter()
            .partition(|observation| observation.is_valid());
        if !rejected.is_empty() {
            trace!(frame = now, count = rejected.len(), "ignoring invalid observations");
        }

        // BTreeMap values come out in identifier order which keeps matching deterministic
        let tracks = std::mem::take(&mut self.tracks)
            .into_values()
            .collect::<Vec<_>>();

        // Step 1
        // Associate observations with live tracks, closest pair first.
        let (matches, unmatched_tracks, unmatched_observations) = assignment::greedy_matching(
            nn_matching::euclidean_cost,
            self.match_distance,
            tracks,
            observations,
        );

        // Step 2
        // Update matched tracks with their observation.
        matches.into_iter().for_each(|r#match| {
            let Match {
                mut track,
                observation,
                ..
            } = r#match;

            track.update(&observation);
            self.tracks.insert(track.track_id(), track);
        });

        // Step 3
        // Age unmatched tracks and remove those unseen for too long.
        unmatched_tracks.into_iter().for_each(|mut track| {
            track.mark_missed();
            if track.frames_unseen() > self.persistence_frames {
                debug!(
                    frame = now,
                    track_id = track.track_id(),
                    side = ?track.side(),
                    "lost track"
                );
                self.tracks_destroyed += 1;
            } else {
                self.tracks.insert(track.track_id(), track);
            }
        });

        // Step 4
        // Initialize new tracks from the remaining observations.
        unmatched_observations.iter().for_each(|observation| {
            let track = self.activate(observation);
            debug!(
                frame = now,
                track_id = track.track_id(),
                x = observation.position().x(),
                y = observation.position().y(),
                "new track"
            );
            self.tracks.insert(track.track_id(), track);
        });

        self.tracks.values_mut().collect()
    }

    fn activate(&mut self, observation: &Observation) -> Track {
        let track = Track::new(self.next_id, observation, self.history_capacity);
        self.next_id += 1;
        track
    }
}
