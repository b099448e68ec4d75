use depth_arm_tracker::clustering::{ClusterAssignment, Clusterer, KMeans, TermCriteria};
use depth_arm_tracker::error::Error;
use depth_arm_tracker::tracker::{AdjacencyGraph, SkeletalTracker};
use glam::Vec3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn two_groups() -> (Vec<Vec3>, Vec<Vec3>) {
    let offsets = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.01, 0.0, 0.0),
        Vec3::new(0.0, 0.01, 0.0),
        Vec3::new(0.0, 0.0, 0.01),
        Vec3::new(-0.01, 0.0, 0.0),
    ];
    let a = offsets.iter().map(|o| Vec3::new(0.0, 0.0, 1.0) + *o).collect();
    let b = offsets.iter().map(|o| Vec3::new(0.6, 0.4, 1.5) + *o).collect();
    (a, b)
}

#[test]
fn test_cluster_refuses_small_cloud() {
    let mut tracker = SkeletalTracker::with_clusterer(3, KMeans::with_seed(1)).unwrap();
    tracker.update_point_cloud(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    let result = tracker.cluster(3, 10, 1e-4);
    assert!(matches!(result, Err(Error::NotEnoughPoints { points: 3, k: 3 })));
    assert!(tracker.centers().is_empty());
    assert!(tracker.cluster_indices().is_empty());
}

#[test]
fn test_failed_cluster_keeps_previous_state() {
    let (a, b) = two_groups();
    let cloud: Vec<Vec3> = a.into_iter().chain(b).collect();
    let mut tracker = SkeletalTracker::with_clusterer(3, KMeans::with_seed(2)).unwrap();
    tracker.update_point_cloud(cloud);
    tracker.cluster(3, 20, 1e-5).unwrap();
    assert_eq!(tracker.centers().len(), 3);
    let centers = tracker.centers().to_vec();
    let labels = tracker.cluster_indices().to_vec();

    tracker.update_point_cloud(vec![Vec3::ONE; 2]);
    assert!(tracker.cluster(3, 20, 1e-5).is_err());
    assert_eq!(tracker.centers(), centers.as_slice());
    assert_eq!(tracker.cluster_indices(), labels.as_slice());
}

#[test]
fn test_cluster_returns_k_centers() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let cloud: Vec<Vec3> = (0..200)
        .map(|_| {
            Vec3::new(
                rng.random_range(-0.3..0.3),
                rng.random_range(-0.3..0.3),
                rng.random_range(0.5..1.2),
            )
        })
        .collect();
    for k in [1, 2, 5, 12] {
        let mut tracker = SkeletalTracker::with_clusterer(k, KMeans::with_seed(k as u64)).unwrap();
        tracker.update_point_cloud(cloud.clone());
        tracker.cluster(2, 15, 1e-4).unwrap();
        assert_eq!(tracker.centers().len(), k);
        assert_eq!(tracker.cluster_indices().len(), cloud.len());
        assert!(tracker.cluster_indices().iter().all(|l| *l < k));
    }
}

#[test]
fn test_two_separated_groups() {
    let (a, b) = two_groups();
    let cloud: Vec<Vec3> = a.iter().chain(b.iter()).copied().collect();
    for seed in 0..5 {
        let mut tracker = SkeletalTracker::with_clusterer(2, KMeans::with_seed(seed)).unwrap();
        tracker.update_point_cloud(cloud.clone());
        tracker.cluster(3, 20, 1e-6).unwrap();
        let labels = tracker.cluster_indices();
        let first = labels[0];
        assert!(labels[..5].iter().all(|l| *l == first));
        assert!(labels[5..].iter().all(|l| *l != first));
        assert!(tracker.centers()[first].distance(Vec3::new(0.0, 0.0, 1.0)) < 0.02);
    }
}

#[test]
fn test_kmeans_is_swappable() {
    struct Halves;
    impl Clusterer for Halves {
        fn cluster(
            &mut self,
            points: &[Vec3],
            k: usize,
            _criteria: &TermCriteria,
        ) -> ClusterAssignment {
            let labels = (0..points.len()).map(|i| i * k / points.len()).collect();
            ClusterAssignment {
                labels,
                centers: vec![Vec3::ZERO; k],
                compactness: 0.0,
            }
        }
    }
    let mut tracker = SkeletalTracker::with_clusterer(2, Halves).unwrap();
    tracker.update_point_cloud(vec![Vec3::ONE; 4]);
    tracker.cluster(1, 1, 0.0).unwrap();
    assert_eq!(tracker.cluster_indices(), &[0, 0, 1, 1]);
}

#[test]
fn test_malformed_assignment_rejected() {
    /// Drops the last center but still labels points with it.
    struct ShortCenters(KMeans);
    impl Clusterer for ShortCenters {
        fn cluster(
            &mut self,
            points: &[Vec3],
            k: usize,
            criteria: &TermCriteria,
        ) -> ClusterAssignment {
            let mut assignment = self.0.cluster(points, k, criteria);
            assignment.centers.pop();
            assignment
        }
    }

    let (a, b) = two_groups();
    let cloud: Vec<Vec3> = a.into_iter().chain(b).collect();
    let mut tracker =
        SkeletalTracker::with_clusterer(2, ShortCenters(KMeans::with_seed(0))).unwrap();
    tracker.update_point_cloud(cloud);
    let result = tracker.cluster(2, 10, 1e-5);
    assert!(matches!(
        result,
        Err(Error::MalformedAssignment { k: 2, points: 10, centers: 1, labels: 10 })
    ));
    assert!(tracker.centers().is_empty());
    assert!(tracker.cluster_indices().is_empty());
}

#[test]
fn test_adjacency_is_symmetric_and_monotone() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let centers: Vec<Vec3> = (0..15)
        .map(|_| {
            Vec3::new(
                rng.random_range(-0.3..0.3),
                rng.random_range(-0.3..0.3),
                rng.random_range(0.5..1.0),
            )
        })
        .collect();
    let thresholds = [0.05, 0.1, 0.15, 0.2, 0.3, 0.5];
    let graphs: Vec<AdjacencyGraph> = thresholds
        .iter()
        .map(|t| AdjacencyGraph::from_centers(&centers, *t))
        .collect();

    for g in &graphs {
        for i in 0..centers.len() {
            assert!(!g.is_connected(i, i));
            for j in 0..centers.len() {
                assert_eq!(g.is_connected(i, j), g.is_connected(j, i));
            }
        }
    }
    for pair in graphs.windows(2) {
        for i in 0..centers.len() {
            for j in 0..centers.len() {
                if pair[0].is_connected(i, j) {
                    assert!(pair[1].is_connected(i, j));
                }
            }
        }
        assert!(pair[0].edge_count() <= pair[1].edge_count());
    }
}

#[test]
fn test_connect_means_rebuilds_from_scratch() {
    let (a, b) = two_groups();
    let cloud: Vec<Vec3> = a.into_iter().chain(b).collect();
    let mut tracker = SkeletalTracker::with_clusterer(2, KMeans::with_seed(0)).unwrap();
    tracker.update_point_cloud(cloud);
    tracker.cluster(2, 20, 1e-6).unwrap();

    tracker.connect_means(10.0);
    assert_eq!(tracker.adjacency().edge_count(), 1);
    tracker.connect_means(0.1);
    assert_eq!(tracker.adjacency().edge_count(), 0);
    assert_eq!(tracker.adjacency().len(), 2);
}
