//! K-nearest-neighbor search and voting
//!
//! Full linear scan over the training set: every point's Euclidean distance to
//! the query is computed, the points are ranked by distance, and the `k`
//! nearest vote on the class.
//!
//! Ranking uses a stable sort, so among points at equal distance the one that
//! appears earlier in the training set ranks first. Reordering a training set
//! that contains tied distances can therefore change which neighbors vote.

use crate::types::{FeatureVector, Neighbor, StressLevel, TrainingPoint, VoteCount};

/// Number of neighbors that vote on each prediction
pub const K_NEIGHBORS: usize = 15;

/// Euclidean distance over the components both slices share
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Rank every training point by distance to `query` and keep the `k` nearest.
///
/// Returns `min(k, training_set.len())` neighbors, nearest first.
pub fn nearest_neighbors(
    query: &FeatureVector,
    training_set: &[TrainingPoint],
    k: usize,
) -> Vec<Neighbor> {
    let mut ranked: Vec<Neighbor> = training_set
        .iter()
        .enumerate()
        .map(|(index, point)| Neighbor {
            index,
            distance: euclidean_distance(query.as_slice(), point.features.as_slice()),
            level: point.level,
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked.truncate(k);
    ranked
}

/// Count labels, keeping them in the order they were first seen
pub fn tally<L: Copy + PartialEq>(labels: impl IntoIterator<Item = L>) -> Vec<(L, usize)> {
    let mut counts: Vec<(L, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
}

/// Label with the strictly highest count. On a tie the label seen first wins.
pub fn majority<L: Copy>(counts: &[(L, usize)]) -> Option<L> {
    let mut best: Option<(L, usize)> = None;
    for &(label, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }
    best.map(|(label, _)| label)
}

/// Vote among neighbors, returning the winner and the tally
pub fn vote(neighbors: &[Neighbor]) -> Option<(StressLevel, Vec<VoteCount>)> {
    let counts = tally(neighbors.iter().map(|n| n.level));
    let winner = majority(&counts)?;
    let votes = counts
        .into_iter()
        .map(|(level, votes)| VoteCount { level, votes })
        .collect();
    Some((winner, votes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FEATURE_COUNT;
    use pretty_assertions::assert_eq;

    fn point(fill: f64, level: StressLevel) -> TrainingPoint {
        TrainingPoint {
            features: FeatureVector([fill; FEATURE_COUNT]),
            level,
        }
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let v = [0.1, 0.7, 0.3, 1.0, 0.0, 0.25, 0.5, 0.9, 0.4, 0.6, 0.8];
        assert_eq!(euclidean_distance(&v, &v), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = [0.1, 0.7, 0.3, 1.0, 0.0, 0.25, 0.5, 0.9, 0.4, 0.6, 0.8];
        let b = [0.9, 0.2, 0.3, 0.0, 1.0, 0.75, 0.5, 0.1, 0.4, 0.0, 0.2];
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn test_distance_known_value() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_neighbor_count_is_min_of_k_and_n() {
        let query = FeatureVector([0.0; FEATURE_COUNT]);
        for n in [0, 1, 7, 15, 16, 40] {
            let training: Vec<TrainingPoint> = (0..n)
                .map(|i| point(i as f64 / 40.0, StressLevel::Low))
                .collect();
            let neighbors = nearest_neighbors(&query, &training, K_NEIGHBORS);
            assert_eq!(neighbors.len(), n.min(K_NEIGHBORS));
        }
    }

    #[test]
    fn test_neighbors_sorted_ascending() {
        let query = FeatureVector([0.0; FEATURE_COUNT]);
        let training = vec![
            point(0.9, StressLevel::High),
            point(0.1, StressLevel::Low),
            point(0.5, StressLevel::Medium),
        ];

        let neighbors = nearest_neighbors(&query, &training, 2);
        let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(neighbors[0].distance <= neighbors[1].distance);
    }

    #[test]
    fn test_tied_distances_keep_training_order() {
        let query = FeatureVector([0.0; FEATURE_COUNT]);
        let training = vec![
            point(0.5, StressLevel::High),
            point(0.5, StressLevel::Low),
            point(0.5, StressLevel::Medium),
        ];

        let neighbors = nearest_neighbors(&query, &training, 3);
        let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_majority_first_seen_tie_break() {
        let counts = tally([0, 0, 1, 1, 2]);
        assert_eq!(counts, vec![(0, 2), (1, 2), (2, 1)]);
        assert_eq!(majority(&counts), Some(0));

        let counts = tally([1, 0, 0, 1, 2]);
        assert_eq!(majority(&counts), Some(1));
    }

    #[test]
    fn test_majority_strict_winner() {
        assert_eq!(majority(&tally([2, 0, 1, 2, 2])), Some(2));
        assert_eq!(majority::<u8>(&[]), None);
    }

    #[test]
    fn test_vote_over_neighbors() {
        let neighbors: Vec<Neighbor> = [
            StressLevel::Medium,
            StressLevel::High,
            StressLevel::High,
            StressLevel::Medium,
        ]
        .iter()
        .enumerate()
        .map(|(index, level)| Neighbor {
            index,
            distance: index as f64,
            level: *level,
        })
        .collect();

        let (winner, votes) = vote(&neighbors).unwrap();
        assert_eq!(winner, StressLevel::Medium);
        assert_eq!(
            votes,
            vec![
                VoteCount { level: StressLevel::Medium, votes: 2 },
                VoteCount { level: StressLevel::High, votes: 2 },
            ]
        );
        assert!(vote(&[]).is_none());
    }
}
