//! Clusters the subject's point cloud and connects the cluster means into a
//! coarse mesh that [`crate::arm::Arm`] walks to recover the kinematic chain.

use log::{debug, warn};
use nalgebra as na;

use crate::clustering::{ClusterAssignment, Clusterer, KMeans, TermCriteria};
use crate::error::{Error, Result};
use crate::types::PointCloud;

/// Symmetric proximity graph over cluster centers.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyGraph {
    edges: na::DMatrix<bool>,
}

impl AdjacencyGraph {
    pub fn empty(k: usize) -> AdjacencyGraph {
        AdjacencyGraph {
            edges: na::DMatrix::from_element(k, k, false),
        }
    }

    /// Connects every pair of centers closer than `threshold`. Never adds self-edges.
    pub fn from_centers(centers: &[glam::Vec3], threshold: f32) -> AdjacencyGraph {
        let k = centers.len();
        let mut graph = AdjacencyGraph::empty(k);
        for i in 0..k {
            for j in (i + 1)..k {
                if centers[i].distance(centers[j]) < threshold {
                    graph.edges[(i, j)] = true;
                    graph.edges[(j, i)] = true;
                }
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.edges.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_connected(&self, i: usize, j: usize) -> bool {
        i < self.len() && j < self.len() && self.edges[(i, j)]
    }

    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |j| self.is_connected(i, *j))
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| **e).count() / 2
    }

    pub fn matrix(&self) -> &na::DMatrix<bool> {
        &self.edges
    }
}

/// Holds the per-frame clustering of the subject.
///
/// `k` is fixed for the lifetime of the tracker.
pub struct SkeletalTracker<C: Clusterer = KMeans> {
    k: usize,
    clusterer: C,
    source_cloud: PointCloud,
    assignment: ClusterAssignment,
    adjacency: AdjacencyGraph,
}

impl SkeletalTracker<KMeans> {
    pub fn new(k: usize) -> Result<SkeletalTracker<KMeans>> {
        SkeletalTracker::with_clusterer(k, KMeans::new())
    }
}

impl<C: Clusterer> SkeletalTracker<C> {
    pub fn with_clusterer(k: usize, clusterer: C) -> Result<SkeletalTracker<C>> {
        if k == 0 {
            return Err(Error::InvalidClusterCount);
        }
        Ok(SkeletalTracker {
            k,
            clusterer,
            source_cloud: Vec::new(),
            assignment: ClusterAssignment::default(),
            adjacency: AdjacencyGraph::empty(0),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Replaces the cloud the next [`SkeletalTracker::cluster`] call works on.
    pub fn update_point_cloud(&mut self, cloud: PointCloud) {
        self.source_cloud = cloud;
    }

    /// Clusters the current cloud into `k` groups.
    ///
    /// Fails with [`Error::NotEnoughPoints`] when the cloud holds `k` points or
    /// fewer, and with [`Error::MalformedAssignment`] when the clusterer does not
    /// return exactly `k` centers and one valid label per point. On failure the
    /// previous labels and centers are left as they were.
    pub fn cluster(&mut self, restarts: usize, max_iter: usize, epsilon: f32) -> Result<()> {
        if self.source_cloud.len() <= self.k {
            warn!(
                "skip clustering: {} points for k = {}",
                self.source_cloud.len(),
                self.k
            );
            return Err(Error::NotEnoughPoints {
                points: self.source_cloud.len(),
                k: self.k,
            });
        }
        let criteria = TermCriteria::new(restarts, max_iter, epsilon);
        let assignment = self
            .clusterer
            .cluster(&self.source_cloud, self.k, &criteria);
        if assignment.centers.len() != self.k
            || assignment.labels.len() != self.source_cloud.len()
            || assignment.labels.iter().any(|l| *l >= self.k)
        {
            return Err(Error::MalformedAssignment {
                k: self.k,
                points: self.source_cloud.len(),
                centers: assignment.centers.len(),
                labels: assignment.labels.len(),
            });
        }
        self.assignment = assignment;
        debug!(
            "clustered {} points, compactness {:.5}",
            self.source_cloud.len(),
            self.assignment.compactness
        );
        Ok(())
    }

    /// Rebuilds the adjacency graph from the current centers.
    pub fn connect_means(&mut self, threshold: f32) {
        self.adjacency = AdjacencyGraph::from_centers(&self.assignment.centers, threshold);
        debug!("connected means: {} edges", self.adjacency.edge_count());
    }

    pub fn source_cloud(&self) -> &PointCloud {
        &self.source_cloud
    }

    pub fn centers(&self) -> &[glam::Vec3] {
        &self.assignment.centers
    }

    pub fn cluster_indices(&self) -> &[usize] {
        &self.assignment.labels
    }

    pub fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    pub fn adjacency(&self) -> &AdjacencyGraph {
        &self.adjacency
    }

    /// Mean of all cluster centers.
    pub fn global_mean(&self) -> Option<glam::Vec3> {
        let centers = self.centers();
        if centers.is_empty() {
            None
        } else {
            Some(centers.iter().copied().sum::<glam::Vec3>() / centers.len() as f32)
        }
    }
}
