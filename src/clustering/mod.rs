pub mod kmeans;

pub use kmeans::*;

/// Stopping rules for one clustering call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermCriteria {
    /// Independent starts; the most compact result is kept.
    pub restarts: usize,
    pub max_iter: usize,
    /// Stop once no center moves further than this between iterations.
    pub epsilon: f32,
}

impl TermCriteria {
    pub fn new(restarts: usize, max_iter: usize, epsilon: f32) -> TermCriteria {
        TermCriteria {
            restarts,
            max_iter,
            epsilon,
        }
    }
}

/// Result of partitioning a point cloud into k groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterAssignment {
    /// Cluster index for every point of the clustered cloud.
    pub labels: Vec<usize>,
    pub centers: Vec<glam::Vec3>,
    /// Sum of squared distances from each point to its center.
    pub compactness: f32,
}

impl ClusterAssignment {
    pub fn k(&self) -> usize {
        self.centers.len()
    }

    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, label)| **label == cluster)
            .map(|(i, _)| i)
    }
}

/// A k-means style solver the tracker can be built with.
///
/// Callers guarantee `points.len() > k` and `k >= 1`.
pub trait Clusterer {
    fn cluster(&mut self, points: &[glam::Vec3], k: usize, criteria: &TermCriteria)
    -> ClusterAssignment;
}

/// Index of the nearest center and the squared distance to it.
pub fn nearest_center(p: &glam::Vec3, centers: &[glam::Vec3]) -> (usize, f32) {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, p.distance_squared(*c)))
        .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}
