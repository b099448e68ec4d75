use log::{debug, trace, warn};
use serde::Serialize;

use crate::arm::{Arm, ChainOutcome, TrackingState};
use crate::clustering::{Clusterer, KMeans};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::frame_source::FrameSource;
use crate::projector::deproject;
use crate::segmentation::BackgroundSegmenter;
use crate::tracker::SkeletalTracker;
use crate::types::DepthFrame;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmEstimate {
    pub name: String,
    pub state: TrackingState,
    pub outcome: Option<ChainOutcome>,
    pub hand: Option<[f32; 3]>,
    pub elbow: Option<[f32; 3]>,
    pub shoulder: Option<[f32; 3]>,
    pub bend_angle_deg: Option<f32>,
    pub missed_steps: u64,
}

impl ArmEstimate {
    fn from_arm(name: &str, arm: &Arm) -> ArmEstimate {
        let joints = arm.joints();
        let bend_angle_deg = match arm.get_bend_angle() {
            Ok(angle) => Some(angle),
            Err(Error::NotTracked) => None,
            Err(e) => {
                debug!("{}: {}", name, e);
                None
            }
        };
        ArmEstimate {
            name: name.to_string(),
            state: arm.state(),
            outcome: arm.last_outcome(),
            hand: joints.map(|j| j.hand.to_array()),
            elbow: joints.map(|j| j.elbow.to_array()),
            shoulder: joints.map(|j| j.shoulder.to_array()),
            bend_angle_deg,
            missed_steps: arm.missed_steps(),
        }
    }
}

/// What the pipeline produced for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameEstimate {
    pub frame: usize,
    pub time_ns: i64,
    /// Pixels kept by background segmentation.
    pub subject_pixels: usize,
    pub points: usize,
    /// False when the cloud was too small to cluster and every arm coasted.
    pub clustered: bool,
    pub arms: Vec<ArmEstimate>,
}

/// Segment, project, cluster, connect and track, one frame at a time.
pub struct Pipeline<C: Clusterer = KMeans> {
    config: PipelineConfig,
    segmenter: BackgroundSegmenter,
    tracker: SkeletalTracker<C>,
    arms: Vec<(String, Arm)>,
    frames_processed: usize,
}

impl Pipeline<KMeans> {
    pub fn new(config: PipelineConfig) -> Result<Pipeline<KMeans>> {
        let kmeans = match config.clustering.seed {
            Some(seed) => KMeans::with_seed(seed),
            None => KMeans::new(),
        };
        Pipeline::with_clusterer(config, kmeans)
    }
}

impl<C: Clusterer> Pipeline<C> {
    pub fn with_clusterer(config: PipelineConfig, clusterer: C) -> Result<Pipeline<C>> {
        if !(0.0..=1.0).contains(&config.smoothing) {
            return Err(Error::InvalidSmoothing(config.smoothing));
        }
        let tracker = SkeletalTracker::with_clusterer(config.clustering.k, clusterer)?;
        let arms = config
            .arms
            .iter()
            .map(|a| {
                let arm = Arm::new(
                    &tracker,
                    glam::Vec3::from_array(a.start_pos),
                    a.max_dist_to_start,
                    a.dxdz_threshold,
                )
                .with_max_missed_steps(a.max_missed_steps);
                (a.name.clone(), arm)
            })
            .collect();
        Ok(Pipeline {
            segmenter: config.segmentation,
            config,
            tracker,
            arms,
            frames_processed: 0,
        })
    }

    pub fn process_frame(&mut self, frame: &DepthFrame) -> Result<FrameEstimate> {
        let segmentation = self.segmenter.segment_with_clusters(&frame.grid);
        let subject_pixels = segmentation.winner.map_or(0, |w| w.area);
        trace!(
            "frame {}: {} regions, subject {} px",
            self.frames_processed,
            segmentation.clusters.len(),
            subject_pixels
        );

        let cloud = deproject(&segmentation.filtered);
        let points = cloud.len();
        self.tracker.update_point_cloud(cloud);

        let clustering = &self.config.clustering;
        let clustered = match self.tracker.cluster(
            clustering.restarts,
            clustering.max_iter,
            clustering.epsilon,
        ) {
            Ok(()) => true,
            Err(Error::NotEnoughPoints { .. }) => false,
            Err(e) => return Err(e),
        };

        if clustered {
            self.tracker.connect_means(clustering.connect_threshold);
            for (name, arm) in self.arms.iter_mut() {
                let before = arm.state();
                let after = arm.update_joints(&self.tracker, self.config.smoothing)?;
                if before != after {
                    debug!("{}: {:?} -> {:?}", name, before, after);
                }
            }
        } else {
            warn!(
                "frame {}: {} points, too few to cluster",
                self.frames_processed, points
            );
            for (_, arm) in self.arms.iter_mut() {
                arm.record_miss();
            }
        }

        let estimate = FrameEstimate {
            frame: self.frames_processed,
            time_ns: frame.time_ns,
            subject_pixels,
            points,
            clustered,
            arms: self
                .arms
                .iter()
                .map(|(name, arm)| ArmEstimate::from_arm(name, arm))
                .collect(),
        };
        self.frames_processed += 1;
        Ok(estimate)
    }

    /// Drains `source`, calling `on_frame` after every processed frame.
    pub fn run<S, F>(&mut self, source: &mut S, mut on_frame: F) -> Result<Vec<FrameEstimate>>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameEstimate),
    {
        let mut estimates = Vec::new();
        while let Some(frame) = source.next_frame()? {
            let estimate = self.process_frame(&frame)?;
            on_frame(&estimate);
            estimates.push(estimate);
        }
        Ok(estimates)
    }

    /// Re-arms a lost limb at a new hand position. Returns false for unknown names.
    pub fn reset_arm(&mut self, name: &str, start_pos: glam::Vec3) -> bool {
        match self.arms.iter_mut().find(|(n, _)| n == name) {
            Some((_, arm)) => {
                arm.reset(start_pos);
                true
            }
            None => false,
        }
    }

    pub fn arm(&self, name: &str) -> Option<&Arm> {
        self.arms.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn tracker(&self) -> &SkeletalTracker<C> {
        &self.tracker
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }
}
