use log::trace;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::{ClusterAssignment, Clusterer, TermCriteria, nearest_center};

/// Lloyd's k-means with k-means++ seeding.
pub struct KMeans {
    rng: ChaCha8Rng,
}

impl KMeans {
    pub fn new() -> KMeans {
        KMeans {
            rng: ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Reproducible seeding.
    pub fn with_seed(seed: u64) -> KMeans {
        KMeans {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// First center uniformly, the rest with probability proportional to the
    /// squared distance to the closest center chosen so far.
    fn seed_centers(&mut self, points: &[glam::Vec3], k: usize) -> Vec<glam::Vec3> {
        let mut centers = Vec::with_capacity(k);
        centers.push(points[self.rng.random_range(0..points.len())]);
        let mut dist2: Vec<f32> = points.iter().map(|p| p.distance_squared(centers[0])).collect();

        while centers.len() < k {
            let total: f32 = dist2.iter().sum();
            let idx = if total > 0.0 {
                let mut target = self.rng.random::<f32>() * total;
                let mut chosen = points.len() - 1;
                for (i, d) in dist2.iter().enumerate() {
                    if target < *d {
                        chosen = i;
                        break;
                    }
                    target -= d;
                }
                chosen
            } else {
                // every point already sits on a center
                self.rng.random_range(0..points.len())
            };
            let center = points[idx];
            centers.push(center);
            for (d, p) in dist2.iter_mut().zip(points) {
                *d = d.min(p.distance_squared(center));
            }
        }
        centers
    }

    fn lloyd(
        &self,
        points: &[glam::Vec3],
        mut centers: Vec<glam::Vec3>,
        criteria: &TermCriteria,
    ) -> ClusterAssignment {
        let k = centers.len();
        let mut labels = vec![0; points.len()];
        for iter in 0..criteria.max_iter.max(1) {
            let assigned: Vec<(usize, f32)> =
                points.par_iter().map(|p| nearest_center(p, &centers)).collect();
            for (label, (idx, _)) in labels.iter_mut().zip(&assigned) {
                *label = *idx;
            }

            let mut sums = vec![glam::Vec3::ZERO; k];
            let mut counts = vec![0usize; k];
            for (p, label) in points.iter().zip(&labels) {
                sums[*label] += *p;
                counts[*label] += 1;
            }
            let mut max_shift: f32 = 0.0;
            for ((center, sum), count) in centers.iter_mut().zip(&sums).zip(&counts) {
                // an emptied cluster keeps its old center
                if *count > 0 {
                    let updated = *sum / *count as f32;
                    max_shift = max_shift.max(updated.distance(*center));
                    *center = updated;
                }
            }
            if max_shift < criteria.epsilon {
                trace!("k-means converged after {} iterations", iter + 1);
                break;
            }
        }

        let assigned: Vec<(usize, f32)> =
            points.par_iter().map(|p| nearest_center(p, &centers)).collect();
        let compactness = assigned.iter().map(|(_, d)| d).sum();
        ClusterAssignment {
            labels: assigned.into_iter().map(|(idx, _)| idx).collect(),
            centers,
            compactness,
        }
    }
}

impl Default for KMeans {
    fn default() -> Self {
        KMeans::new()
    }
}

impl Clusterer for KMeans {
    fn cluster(
        &mut self,
        points: &[glam::Vec3],
        k: usize,
        criteria: &TermCriteria,
    ) -> ClusterAssignment {
        let mut best: Option<ClusterAssignment> = None;
        for attempt in 0..criteria.restarts.max(1) {
            let seeds = self.seed_centers(points, k);
            let run = self.lloyd(points, seeds, criteria);
            trace!("k-means attempt {} compactness {:.6}", attempt, run.compactness);
            if best.as_ref().is_none_or(|b| run.compactness < b.compactness) {
                best = Some(run);
            }
        }
        best.unwrap_or_default()
    }
}
