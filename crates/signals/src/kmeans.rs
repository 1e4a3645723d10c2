//! Lloyd's K-means with k-means++ seeding over 2-D points.

use maestro_core::SignalError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-10;

/// Fitted clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansFit {
    pub centroids: Vec<[f64; 2]>,
    /// Cluster index per input point
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub iterations: usize,
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn nearest(point: &[f64; 2], centroids: &[[f64; 2]]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding: each new centroid drawn with probability proportional
/// to its squared distance from the nearest existing centroid.
fn seed_centroids(points: &[[f64; 2]], k: usize, rng: &mut ChaCha8Rng) -> Vec<[f64; 2]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };
        centroids.push(points[next]);
    }

    centroids
}

/// Clusters `points` into `k` groups.
///
/// Deterministic for a given `seed`. Empty clusters keep their previous
/// centroid.
///
/// # Errors
/// * [`SignalError::InvalidConfig`] when `k` is zero.
/// * [`SignalError::InsufficientData`] when there are fewer points than clusters.
/// * [`SignalError::ModelFit`] when a point is not finite.
pub fn kmeans(points: &[[f64; 2]], k: usize, seed: u64) -> Result<KMeansFit, SignalError> {
    if k == 0 {
        return Err(SignalError::InvalidConfig("k must be at least 1".into()));
    }
    if points.len() < k {
        return Err(SignalError::InsufficientData {
            required: k,
            actual: points.len(),
        });
    }
    if points.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(SignalError::ModelFit("non-finite clustering feature".into()));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = seed_centroids(points, k, &mut rng);
    let mut labels = vec![0usize; points.len()];
    let mut iterations = 0;

    for _ in 0..MAX_ITERATIONS {
        iterations += 1;

        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(point, &centroids).0;
        }

        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (label, point) in labels.iter().zip(points) {
            sums[*label][0] += point[0];
            sums[*label][1] += point[1];
            counts[*label] += 1;
        }

        let mut shift = 0.0f64;
        for (i, centroid) in centroids.iter_mut().enumerate() {
            if counts[i] == 0 {
                continue;
            }
            let n = counts[i] as f64;
            let updated = [sums[i][0] / n, sums[i][1] / n];
            shift = shift.max(squared_distance(centroid, &updated));
            *centroid = updated;
        }

        if shift <= TOLERANCE {
            break;
        }
    }

    for (label, point) in labels.iter_mut().zip(points) {
        *label = nearest(point, &centroids).0;
    }
    let inertia = labels
        .iter()
        .zip(points)
        .map(|(label, point)| squared_distance(point, &centroids[*label]))
        .sum();

    Ok(KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
    })
}
