//! Lloyd-style k-means refinement.
//!
//! Centroids are dense over the dictionary space; points stay sparse.
//! Each iteration assigns every point to its nearest centroid under
//! squared Euclidean distance, then replaces each centroid with the mean
//! of its members. A centroid that loses every member keeps its previous
//! position, so k never silently shrinks mid-run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::types::ClusterId;
use crate::vectorize::NamedVector;

/// One cluster center, persisted in seed and iteration snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub id: ClusterId,
    pub center: Vec<f64>,
}

impl Centroid {
    pub fn new(id: ClusterId, center: Vec<f64>) -> Self {
        Self { id, center }
    }

    /// Squared Euclidean distance to a sparse point.
    pub fn distance_squared(&self, point: &NamedVector) -> f64 {
        let cross = point.vector.dot_dense(&self.center);
        let center_sq: f64 = self.center.iter().map(|c| c * c).sum();
        (point.vector.norm_squared() - 2.0 * cross + center_sq).max(0.0)
    }
}

/// How the refinement loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Largest centroid movement fell to or below the convergence delta.
    Converged,
    /// The iteration cap ran out first. Not an error; the centroids are
    /// still usable, just not settled.
    MaxIterationsReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::MaxIterationsReached => write!(f, "max iterations reached"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    pub centroids: Vec<Centroid>,
    /// Centroid positions after each completed iteration, for the
    /// `clusters/iteration-NNN.json` snapshots.
    pub history: Vec<Vec<Centroid>>,
    pub iterations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub convergence_delta: f64,
    pub max_iterations: usize,
}

impl KMeans {
    pub fn new(convergence_delta: f64, max_iterations: usize) -> Self {
        Self {
            convergence_delta,
            max_iterations,
        }
    }

    /// Refine `seeds` against `vectors` until convergence or the iteration
    /// cap. Caller guarantees `seeds` is non-empty and every centroid spans
    /// the same dimensionality.
    pub fn run(&self, vectors: &[NamedVector], seeds: Vec<Centroid>) -> KMeansOutcome {
        let dims = seeds.first().map_or(0, |c| c.center.len());
        let mut centroids = seeds;
        let mut history = Vec::new();
        let mut iterations = 0;
        let mut termination = Termination::MaxIterationsReached;

        while iterations < self.max_iterations {
            iterations += 1;

            let assignments: Vec<usize> = vectors
                .par_iter()
                .map(|point| nearest(&centroids, point).0)
                .collect();

            // Mean of members, previous position when a cluster empties
            let mut sums = vec![vec![0.0f64; dims]; centroids.len()];
            let mut counts = vec![0usize; centroids.len()];
            for (point, &slot) in vectors.iter().zip(&assignments) {
                point.vector.add_to_dense(&mut sums[slot]);
                counts[slot] += 1;
            }

            let mut movement = 0.0f64;
            for (slot, centroid) in centroids.iter_mut().enumerate() {
                if counts[slot] == 0 {
                    continue;
                }
                let next: Vec<f64> = sums[slot]
                    .iter()
                    .map(|sum| sum / counts[slot] as f64)
                    .collect();
                movement = movement.max(euclidean(&centroid.center, &next));
                centroid.center = next;
            }
            history.push(centroids.clone());
            debug!(iteration = iterations, movement, "k-means iteration");

            if movement <= self.convergence_delta {
                termination = Termination::Converged;
                break;
            }
        }

        KMeansOutcome {
            centroids,
            history,
            iterations,
            termination,
        }
    }
}

/// Index and squared distance of the nearest centroid; ties break to the
/// lowest cluster id.
pub(crate) fn nearest(centroids: &[Centroid], point: &NamedVector) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (slot, centroid) in centroids.iter().enumerate() {
        let distance = centroid.distance_squared(point);
        if distance < best.1 {
            best = (slot, distance);
        }
    }
    best
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
