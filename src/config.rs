use serde::{Deserialize, Serialize};

use crate::arm::DEFAULT_MAX_MISSED_STEPS;
use crate::segmentation::BackgroundSegmenter;
use crate::types::Intrinsics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub k: usize,
    pub restarts: usize,
    pub max_iter: usize,
    pub epsilon: f32,
    /// Centers closer than this (metres) are connected in the adjacency graph.
    pub connect_threshold: f32,
    /// Fixed k-means seed; random when absent.
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: 12,
            restarts: 3,
            max_iter: 30,
            epsilon: 1e-3,
            connect_threshold: 0.12,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub name: String,
    /// Approximate hand position in camera coordinates (metres).
    pub start_pos: [f32; 3],
    pub max_dist_to_start: f32,
    pub dxdz_threshold: f32,
    pub max_missed_steps: u32,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            name: "right".to_string(),
            start_pos: [0.0, 0.0, 0.4],
            max_dist_to_start: 0.25,
            dxdz_threshold: 1.5,
            max_missed_steps: DEFAULT_MAX_MISSED_STEPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: BackgroundSegmenter,
    pub clustering: ClusteringConfig,
    pub smoothing: f32,
    /// Raw depth unit to metres, used when frames carry no scale of their own.
    pub depth_scale: f32,
    pub intrinsics: Intrinsics,
    pub arms: Vec<ArmConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmentation: BackgroundSegmenter::default(),
            clustering: ClusteringConfig::default(),
            smoothing: 0.5,
            depth_scale: 0.001,
            intrinsics: Intrinsics::default(),
            arms: vec![ArmConfig::default()],
        }
    }
}
