use crate::{Observation, Track};
use ndarray::*;

/// Compute pair-wise Euclidean distance between track positions and observed positions.
///
/// # Parameters
///
/// * `tracks`: A list of N live tracks.
/// * `observations`: A list of M observations.
///
/// # Returns
///
/// A cost matrix of shape (N, M) where entry (i, j) is the distance between the latest position of `tracks[i]` and the position of `observations[j]`.
pub fn euclidean_cost(tracks: &[Track], observations: &[Observation]) -> Array2<f32> {
    Array2::from_shape_fn((tracks.len(), observations.len()), |(row, col)| {
        tracks[row]
            .position()
            .distance(observations[col].position())
    })
}

#[cfg(test)]
mod tests {
    use crate::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn euclidean_cost() {
        let tracks = vec![
            Track::new(0, &Observation::at(0.0, 0.0, 0), 1),
            Track::new(1, &Observation::at(10.0, 10.0, 0), 1),
        ];
        let observations = vec![
            Observation::at(3.0, 4.0, 1),
            Observation::at(10.0, 10.0, 1),
            Observation::at(0.0, 0.0, 1),
        ];

        let cost = nn_matching::euclidean_cost(&tracks, &observations);

        assert_eq!(cost.dim(), (2, 3));
        assert_approx_eq!(cost[[0, 0]], 5.0);
        assert_approx_eq!(cost[[0, 1]], 200.0f32.sqrt(), 1e-4);
        assert_approx_eq!(cost[[0, 2]], 0.0);
        assert_approx_eq!(cost[[1, 0]], 149.0f32.sqrt(), 1e-4);
        assert_approx_eq!(cost[[1, 1]], 0.0);
    }

    #[test]
    fn empty_inputs() {
        let cost = nn_matching::euclidean_cost(&[], &[Observation::at(0.0, 0.0, 0)]);
        assert_eq!(cost.dim(), (0, 1));
    }
}
