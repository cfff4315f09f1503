//! Clustering stage.
//!
//! Seed selection, k-means refinement and the final classification pass
//! that turns centroids into per-sentence cluster assignments.

pub mod kmeans;

pub use kmeans::{Centroid, KMeans, KMeansOutcome, Termination};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::store::StoreError;
use crate::types::ClusterId;
use crate::vectorize::{NamedVector, SparseVector};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("cluster count must be at least 1")]
    ZeroClusters,

    /// Fewer vectors than requested clusters is a configuration error,
    /// never a silent partial clustering.
    #[error("cannot select {k} seed vectors from a population of {population}")]
    TooFewVectors { k: usize, population: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// RNG for seed selection: fixed and reproducible when the configuration
/// pins a seed, OS-seeded otherwise.
pub fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Pick k distinct vectors uniformly at random as the initial centroids.
///
/// `dims` is the dictionary size; sparse seeds are densified so the
/// refinement loop works in one representation.
pub fn select_random_seeds(
    vectors: &[NamedVector],
    k: usize,
    dims: usize,
    rng: &mut StdRng,
) -> Result<Vec<Centroid>, ClusterError> {
    if k == 0 {
        return Err(ClusterError::ZeroClusters);
    }
    if k > vectors.len() {
        return Err(ClusterError::TooFewVectors {
            k,
            population: vectors.len(),
        });
    }

    let mut picks: Vec<usize> = sample(rng, vectors.len(), k).into_vec();
    picks.sort_unstable();

    Ok(picks
        .into_iter()
        .enumerate()
        .map(|(slot, index)| {
            let mut center = vec![0.0f64; dims];
            vectors[index].vector.add_to_dense(&mut center);
            Centroid::new(ClusterId::new(slot as u32), center)
        })
        .collect())
}

/// Final assignment decision for one vector.
///
/// `cluster_id` is `None` when the best membership weight fell below the
/// classification threshold; such points are reported as unassigned, never
/// dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredPoint {
    pub cluster_id: Option<ClusterId>,
    pub weight: f64,
    pub name: String,
    pub vector: SparseVector,
}

/// Assign every vector to its best cluster, or to none.
///
/// Membership weight per cluster is `1 / (1 + d)` over Euclidean distance,
/// normalized across clusters; the argmax cluster wins when its normalized
/// weight reaches `threshold`. Exactly one decision per input vector, in
/// input order.
pub fn classify(
    vectors: &[NamedVector],
    centroids: &[Centroid],
    threshold: f64,
) -> Vec<ClusteredPoint> {
    vectors
        .par_iter()
        .map(|point| {
            let weights: Vec<f64> = centroids
                .iter()
                .map(|c| 1.0 / (1.0 + c.distance_squared(point).sqrt()))
                .collect();
            let total: f64 = weights.iter().sum();

            let (best, weight) = weights
                .iter()
                .enumerate()
                .fold((0usize, f64::MIN), |acc, (slot, &w)| {
                    if w > acc.1 { (slot, w) } else { acc }
                });
            let normalized = if total > 0.0 { weight / total } else { 0.0 };

            let cluster_id = if normalized >= threshold {
                Some(centroids[best].id)
            } else {
                None
            };
            ClusteredPoint {
                cluster_id,
                weight: normalized,
                name: point.name.clone(),
                vector: point.vector.clone(),
            }
        })
        .collect()
}

/// Run the whole stage in memory: seeds → refinement → classification.
pub fn cluster(
    vectors: &[NamedVector],
    dims: usize,
    k: usize,
    convergence_delta: f64,
    max_iterations: usize,
    threshold: f64,
    rng: &mut StdRng,
) -> Result<(Vec<Centroid>, KMeansOutcome, Vec<ClusteredPoint>), ClusterError> {
    let seeds = select_random_seeds(vectors, k, dims, rng)?;
    let outcome = KMeans::new(convergence_delta, max_iterations).run(vectors, seeds.clone());
    let points = classify(vectors, &outcome.centroids, threshold);

    let unassigned = points.iter().filter(|p| p.cluster_id.is_none()).count();
    info!(
        k,
        iterations = outcome.iterations,
        termination = %outcome.termination,
        unassigned,
        "clustering complete"
    );
    Ok((seeds, outcome, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TermId;

    fn point(name: &str, values: &[f64]) -> NamedVector {
        let pairs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (TermId::new(i as u32), v))
            .collect();
        NamedVector::new(name, SparseVector::from_pairs(pairs))
    }

    #[test]
    fn seeds_are_distinct_population_members() {
        let vectors = vec![
            point("sentence0", &[1.0, 0.0]),
            point("sentence1", &[0.0, 1.0]),
            point("sentence2", &[1.0, 1.0]),
        ];
        let mut rng = seed_rng(Some(7));
        let seeds = select_random_seeds(&vectors, 2, 2, &mut rng).unwrap();

        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].id, ClusterId::new(0));
        assert_eq!(seeds[1].id, ClusterId::new(1));
        assert_ne!(seeds[0].center, seeds[1].center);
        for seed in &seeds {
            assert!(vectors.iter().any(|v| {
                let mut dense = vec![0.0; 2];
                v.vector.add_to_dense(&mut dense);
                dense == seed.center
            }));
        }
    }

    #[test]
    fn os_seeded_rng_draws_valid_seeds() {
        let vectors: Vec<NamedVector> = (0..10)
            .map(|i| point(&format!("sentence{i}"), &[i as f64]))
            .collect();

        let mut rng = seed_rng(None);
        let seeds = select_random_seeds(&vectors, 3, 1, &mut rng).unwrap();
        assert_eq!(seeds.len(), 3);
        // Distinct population members regardless of what the OS seeded
        let centers: std::collections::HashSet<_> = seeds
            .iter()
            .map(|s| s.center.iter().map(|v| v.to_bits()).collect::<Vec<_>>())
            .collect();
        assert_eq!(centers.len(), 3);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let vectors: Vec<NamedVector> = (0..10)
            .map(|i| point(&format!("sentence{i}"), &[i as f64]))
            .collect();

        let first = select_random_seeds(&vectors, 3, 1, &mut seed_rng(Some(42))).unwrap();
        let second = select_random_seeds(&vectors, 3, 1, &mut seed_rng(Some(42))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn k_beyond_population_is_a_configuration_error() {
        let vectors = vec![point("sentence0", &[1.0])];
        let err = select_random_seeds(&vectors, 2, 1, &mut seed_rng(Some(1))).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::TooFewVectors { k: 2, population: 1 }
        ));
    }

    #[test]
    fn zero_k_is_rejected() {
        let vectors = vec![point("sentence0", &[1.0])];
        let err = select_random_seeds(&vectors, 0, 1, &mut seed_rng(Some(1))).unwrap_err();
        assert!(matches!(err, ClusterError::ZeroClusters));
    }

    #[test]
    fn classify_produces_one_decision_per_vector() {
        let vectors = vec![
            point("sentence0", &[1.0, 0.0]),
            point("sentence1", &[0.0, 1.0]),
            point("sentence2", &[0.9, 0.1]),
        ];
        let centroids = vec![
            Centroid::new(ClusterId::new(0), vec![1.0, 0.0]),
            Centroid::new(ClusterId::new(1), vec![0.0, 1.0]),
        ];
        let points = classify(&vectors, &centroids, 0.0);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].cluster_id, Some(ClusterId::new(0)));
        assert_eq!(points[1].cluster_id, Some(ClusterId::new(1)));
        assert_eq!(points[2].cluster_id, Some(ClusterId::new(0)));
        assert_eq!(points[2].name, "sentence2");
    }

    #[test]
    fn threshold_marks_points_unassigned_instead_of_dropping() {
        let vectors = vec![point("sentence0", &[0.5, 0.5])];
        let centroids = vec![
            Centroid::new(ClusterId::new(0), vec![1.0, 0.0]),
            Centroid::new(ClusterId::new(1), vec![0.0, 1.0]),
        ];
        // Equidistant point: each normalized weight is 0.5, below 0.9
        let points = classify(&vectors, &centroids, 0.9);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].cluster_id, None);
        assert!((points[0].weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn single_cluster_takes_every_vector() {
        let vectors = vec![
            point("sentence0", &[1.0]),
            point("sentence1", &[5.0]),
            point("sentence2", &[9.0]),
        ];
        let mut rng = seed_rng(Some(3));
        let (_, outcome, points) = cluster(&vectors, 1, 1, 0.001, 10, 0.0, &mut rng).unwrap();

        assert_eq!(outcome.centroids.len(), 1);
        assert!(points.iter().all(|p| p.cluster_id == Some(ClusterId::new(0))));
        // With one cluster the normalized weight is always 1.0
        assert!(points.iter().all(|p| (p.weight - 1.0).abs() < 1e-12));
    }
}
