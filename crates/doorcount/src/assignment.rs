use crate::*;
use fixedbitset::FixedBitSet;
use ndarray::*;

pub type DistanceMetricFn = fn(&[Track], &[Observation]) -> Array2<f32>;

#[derive(Debug)]
pub struct Match {
    pub track: Track,
    pub observation: Observation,
    pub distance: f32,
}

impl Match {
    /// Return a new Match
    ///
    /// # Parameters
    ///
    /// * `track`: The matched track.
    /// * `observation`: The matched observation.
    /// * `distance`: Match strength.
    pub fn new(track: Track, observation: Observation, distance: f32) -> Match {
        Match {
            track,
            observation,
            distance,
        }
    }

    /// Return the distance of the match
    pub fn distance(&self) -> f32 {
        self.distance
    }
}

impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        self.track == other.track && self.observation == other.observation
    }
}

/// Greedily assign observations to tracks, closest pair first.
///
/// This is not an optimal bipartite assignment: the globally closest (track, observation) pair within the gate is
/// fixed first, both are removed from consideration, and the process repeats. Equal distances are resolved by the
/// lower track id, then by the lower observation index, so the outcome is fully deterministic.
///
/// # Parameters
///
/// * `distance_metric`: Given N tracks and M observations, returns the NxM cost matrix.
/// * `max_distance`: Gating threshold. Pairs with a distance of `max_distance` or more are never matched.
/// * `tracks`: The live tracks.
/// * `observations`: The valid observations of the current frame.
///
/// # Returns
///
/// A tuple with the following three entries:
///
/// - The matches, in the order they were assigned.
/// - The unmatched tracks, in input order.
/// - The unmatched observations, in input order.
#[allow(clippy::type_complexity)]
pub fn greedy_matching(
    distance_metric: DistanceMetricFn,
    max_distance: f32,
    tracks: Vec<Track>,
    observations: Vec<Observation>,
) -> (Vec<Match>, Vec<Track>, Vec<Observation>) {
    if tracks.is_empty() || observations.is_empty() {
        return (vec![], tracks, observations);
    }

    let cost_matrix = (distance_metric)(&tracks, &observations);

    // (distance, track_id, row, col) for every pair inside the gate
    let mut candidates = cost_matrix
        .indexed_iter()
        .filter(|(_, distance)| **distance < max_distance)
        .map(|((row, col), distance)| (*distance, tracks[row].track_id(), row, col))
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.3.cmp(&b.3))
    });

    let mut assigned_rows = FixedBitSet::with_capacity(tracks.len());
    let mut assigned_cols = FixedBitSet::with_capacity(observations.len());
    let mut pairs = Vec::with_capacity(tracks.len().min(observations.len()));
    for (distance, _, row, col) in candidates {
        if assigned_rows.contains(row) || assigned_cols.contains(col) {
            continue;
        }
        assigned_rows.insert(row);
        assigned_cols.insert(col);
        pairs.push((row, col, distance));
    }

    let mut tracks = tracks.into_iter().map(Some).collect::<Vec<_>>();
    let mut observations = observations.into_iter().map(Some).collect::<Vec<_>>();

    let matches = pairs
        .into_iter()
        .filter_map(|(row, col, distance)| {
            let track = tracks[row].take()?;
            let observation = observations[col].take()?;
            Some(Match::new(track, observation, distance))
        })
        .collect::<Vec<_>>();

    (
        matches,
        tracks.into_iter().flatten().collect(),
        observations.into_iter().flatten().collect(),
    )
}
