//! Background removal by depth-gated region growing.
//!
//! Every connected depth region is labelled with its own cluster id. Two pixels
//! are connected when they lie within a Manhattan radius of each other and their
//! depths differ by less than a physical threshold. Only the largest region, the
//! subject, survives into the output grid.

use std::collections::VecDeque;

use log::debug;
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::types::{ClusterMap, DepthGrid};

pub const UNASSIGNED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationCluster {
    pub id: i32,
    pub area: usize,
}

/// Everything a segmentation pass produced.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub filtered: DepthGrid,
    pub cluster_map: ClusterMap,
    /// All regions in discovery (row-major) order.
    pub clusters: Vec<SegmentationCluster>,
    pub winner: Option<SegmentationCluster>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSegmenter {
    /// Largest depth step, in metres, between two connected pixels.
    pub max_depth_delta: f32,
    /// L1 neighbourhood radius. Values above 1 bridge small sensor dropouts.
    pub manhattan_radius: usize,
}

impl Default for BackgroundSegmenter {
    fn default() -> Self {
        BackgroundSegmenter {
            max_depth_delta: 0.05,
            manhattan_radius: 2,
        }
    }
}

impl BackgroundSegmenter {
    pub fn new(max_depth_delta: f32, manhattan_radius: usize) -> BackgroundSegmenter {
        BackgroundSegmenter {
            max_depth_delta,
            manhattan_radius,
        }
    }

    pub fn segment(&self, grid: &DepthGrid) -> DepthGrid {
        self.segment_with_clusters(grid).filtered
    }

    pub fn segment_with_clusters(&self, grid: &DepthGrid) -> Segmentation {
        let rows = grid.height();
        let cols = grid.width();
        let depth = grid.depth();
        let offsets = diamond_offsets(self.manhattan_radius.max(1));

        let mut visited = na::DMatrix::<bool>::from_element(rows, cols, false);
        let mut cluster_map = ClusterMap::from_element(rows, cols, UNASSIGNED);
        let mut clusters = Vec::new();
        let mut frontier = VecDeque::new();

        for r in 0..rows {
            for c in 0..cols {
                if visited[(r, c)] || depth[(r, c)] == 0 {
                    continue;
                }
                let id = clusters.len() as i32;
                visited[(r, c)] = true;
                cluster_map[(r, c)] = id;
                frontier.push_back((r, c));
                let mut area = 1;

                while let Some((pr, pc)) = frontier.pop_front() {
                    let popped = depth[(pr, pc)];
                    for &(dr, dc) in &offsets {
                        let nr = pr as isize + dr;
                        let nc = pc as isize + dc;
                        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        let sample = depth[(nr, nc)];
                        if sample == 0 || visited[(nr, nc)] {
                            continue;
                        }
                        let delta = popped.abs_diff(sample) as f32 * grid.scale();
                        if delta < self.max_depth_delta {
                            visited[(nr, nc)] = true;
                            cluster_map[(nr, nc)] = id;
                            frontier.push_back((nr, nc));
                            area += 1;
                        }
                    }
                }
                clusters.push(SegmentationCluster { id, area });
            }
        }

        // a later region must be strictly larger to win
        let winner = clusters.iter().fold(None, |best: Option<SegmentationCluster>, cluster| {
            match best {
                Some(b) if b.area >= cluster.area => Some(b),
                _ => Some(*cluster),
            }
        });

        let filtered = match winner {
            Some(w) => depth.zip_map(&cluster_map, |d, id| if id == w.id { d } else { 0 }),
            None => na::DMatrix::zeros(rows, cols),
        };
        debug!(
            "segmentation: {} regions, kept {:?}",
            clusters.len(),
            winner.map(|w| w.area)
        );

        Segmentation {
            filtered: grid.with_depth(filtered),
            cluster_map,
            clusters,
            winner,
        }
    }
}

/// Keeps only the largest connected depth region of `grid`.
pub fn segment(grid: &DepthGrid, max_depth_delta: f32, manhattan_radius: usize) -> DepthGrid {
    BackgroundSegmenter::new(max_depth_delta, manhattan_radius).segment(grid)
}

/// Offsets with `0 < |dr| + |dc| <= radius`.
fn diamond_offsets(radius: usize) -> Vec<(isize, isize)> {
    let radius = radius as isize;
    let mut offsets = Vec::new();
    for dr in -radius..=radius {
        let span = radius - dr.abs();
        for dc in -span..=span {
            if dr != 0 || dc != 0 {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}
