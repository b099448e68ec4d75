//! Per-limb tracking over the tracker's cluster graph.
//!
//! The hand is assumed to be the part of the arm closest to the camera. Starting
//! from the cluster nearest an approximate hand position, the arm walks the
//! cluster graph away from the camera until the lateral-over-depth change of a
//! step signals the elbow bend. Joint positions are smoothed across frames and
//! coast through short gaps in detection.

use log::{debug, trace, warn};
use serde::Serialize;

use crate::clustering::Clusterer;
use crate::error::{Error, Result};
use crate::tracker::SkeletalTracker;

pub const DEFAULT_MAX_MISSED_STEPS: u32 = 5;

const MIN_SEGMENT_LENGTH: f32 = 1e-6;

/// How a traversal of the cluster graph ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChainOutcome {
    /// A step exceeded the dx/dz threshold: the walk reached the elbow bend.
    ThresholdReached,
    /// No unvisited neighbour further from the camera was left.
    DeadEnd,
    /// No center qualified as the hand.
    NoHandCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackingState {
    /// No joint estimate yet.
    #[default]
    Acquiring,
    Tracking,
    /// Holding the last estimate through missed frames.
    Coasting,
    /// Too many consecutive misses. Only [`Arm::reset`] leaves this state.
    Lost,
}

impl TrackingState {
    pub fn has_joints(&self) -> bool {
        matches!(self, TrackingState::Tracking | TrackingState::Coasting)
    }

    pub fn is_lost(&self) -> bool {
        *self == TrackingState::Lost
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmJoints {
    pub hand: glam::Vec3,
    pub elbow: glam::Vec3,
    pub shoulder: glam::Vec3,
}

impl ArmJoints {
    /// Angle at the elbow in degrees.
    pub fn bend_angle(&self) -> Result<f32> {
        let forearm = self.hand - self.elbow;
        let upper_arm = self.shoulder - self.elbow;
        if forearm.length() < MIN_SEGMENT_LENGTH || upper_arm.length() < MIN_SEGMENT_LENGTH {
            return Err(Error::DegenerateJoint);
        }
        let cos = forearm.normalize().dot(upper_arm.normalize()).clamp(-1.0, 1.0);
        Ok(cos.acos().to_degrees())
    }

    fn lerp_towards(&mut self, target: &ArmJoints, t: f32) {
        self.hand = lerp(target.hand, self.hand, t);
        self.elbow = lerp(target.elbow, self.elbow, t);
        self.shoulder = lerp(target.shoulder, self.shoulder, t);
    }
}

/// Moves `current` towards `target` by `t`. Exact at both `t = 0` and `t = 1`.
pub fn lerp(target: glam::Vec3, current: glam::Vec3, t: f32) -> glam::Vec3 {
    current.lerp(target, t)
}

pub struct Arm {
    k: usize,
    start_pos: glam::Vec3,
    max_dist_to_start: f32,
    dxdz_threshold: f32,
    max_missed_steps: u32,

    /// Cluster indices from hand (front) to shoulder (back).
    chain: Vec<usize>,
    elbow_cluster: Option<usize>,
    /// Point of the source cloud closest to the elbow cluster center.
    elbow_point: Option<usize>,
    joints: Option<ArmJoints>,

    state: TrackingState,
    last_outcome: Option<ChainOutcome>,
    step: u64,
    last_tracked_step: u64,
}

impl Arm {
    /// # Arguments
    /// * `tracker` - The tracker whose clusters this arm follows.
    /// * `start_pos` - Approximate hand location.
    /// * `max_dist_to_start` - Furthest a center may be from `start_pos` to count as the hand.
    /// * `dxdz_threshold` - The walk stops once a step's dx/dz exceeds this.
    pub fn new<C: Clusterer>(
        tracker: &SkeletalTracker<C>,
        start_pos: glam::Vec3,
        max_dist_to_start: f32,
        dxdz_threshold: f32,
    ) -> Arm {
        Arm {
            k: tracker.k(),
            start_pos,
            max_dist_to_start,
            dxdz_threshold,
            max_missed_steps: DEFAULT_MAX_MISSED_STEPS,
            chain: Vec::new(),
            elbow_cluster: None,
            elbow_point: None,
            joints: None,
            state: TrackingState::Acquiring,
            last_outcome: None,
            step: 0,
            last_tracked_step: 0,
        }
    }

    /// Misses tolerated while coasting before the arm is lost. Clamped to at
    /// least 1, so a single miss always coasts first.
    pub fn with_max_missed_steps(mut self, max_missed_steps: u32) -> Arm {
        self.max_missed_steps = max_missed_steps.max(1);
        self
    }

    /// Index of the center nearest the start position among those further from
    /// the camera than it and within `max_dist_to_start`.
    pub fn find_closest_center_to_hand<C: Clusterer>(
        &self,
        tracker: &SkeletalTracker<C>,
    ) -> Option<usize> {
        tracker
            .centers()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.z > self.start_pos.z)
            .map(|(i, c)| (i, c.distance(self.start_pos)))
            .filter(|(_, d)| *d <= self.max_dist_to_start)
            .fold(None, |best: Option<(usize, f32)>, cur| match best {
                Some(b) if b.1 <= cur.1 => Some(b),
                _ => Some(cur),
            })
            .map(|(i, _)| i)
    }

    /// Rebuilds the hand-to-shoulder chain by walking the adjacency graph.
    ///
    /// Each step moves to the adjacent, unvisited center that lies further from
    /// the camera than the current one and is furthest from the mean of all
    /// centers.
    pub fn update_arm_list<C: Clusterer>(&mut self, tracker: &SkeletalTracker<C>) -> ChainOutcome {
        self.chain.clear();
        let Some(hand) = self.find_closest_center_to_hand(tracker) else {
            return ChainOutcome::NoHandCandidate;
        };
        let centers = tracker.centers();
        let graph = tracker.adjacency();
        let mean = tracker.global_mean().unwrap_or(self.start_pos);
        let mut visited = vec![false; centers.len()];
        visited[hand] = true;
        self.chain.push(hand);

        loop {
            let current = self.chain[self.chain.len() - 1];
            let here = centers[current];
            let next = graph
                .neighbors(current)
                .filter(|n| !visited[*n] && centers[*n].z > here.z)
                .map(|n| (n, centers[n].distance(mean)))
                .fold(None, |best: Option<(usize, f32)>, cur| match best {
                    Some(b) if b.1 >= cur.1 => Some(b),
                    _ => Some(cur),
                });
            let Some((next, _)) = next else {
                trace!("arm walk dead end after {} nodes", self.chain.len());
                return ChainOutcome::DeadEnd;
            };
            visited[next] = true;
            self.chain.push(next);

            let delta = centers[next] - here;
            let dxdz = delta.x.abs() / delta.z.abs();
            if dxdz > self.dxdz_threshold {
                trace!("arm walk reached bend, dx/dz = {:.3}", dxdz);
                return ChainOutcome::ThresholdReached;
            }
        }
    }

    /// Picks the interior chain node furthest from both the hand and the
    /// shoulder as the elbow. `None` when the chain has no interior node.
    pub fn update_elbow_approx<C: Clusterer>(
        &mut self,
        tracker: &SkeletalTracker<C>,
    ) -> Option<usize> {
        self.elbow_cluster = None;
        self.elbow_point = None;
        if self.chain.len() < 3 {
            return None;
        }
        let centers = tracker.centers();
        let hand = centers[self.chain[0]];
        let shoulder = centers[self.chain[self.chain.len() - 1]];
        let elbow = self.chain[1..self.chain.len() - 1]
            .iter()
            .map(|i| (*i, centers[*i].distance(hand) * centers[*i].distance(shoulder)))
            .fold(None, |best: Option<(usize, f32)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })
            .map(|(i, _)| i)?;

        let elbow_center = centers[elbow];
        self.elbow_point = tracker
            .source_cloud()
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.distance_squared(elbow_center)))
            .fold(None, |best: Option<(usize, f32)>, cur| match best {
                Some(b) if b.1 <= cur.1 => Some(b),
                _ => Some(cur),
            })
            .map(|(i, _)| i);
        self.elbow_cluster = Some(elbow);
        Some(elbow)
    }

    /// Advances one step: walks the graph, locates the elbow and smooths the
    /// joints towards the new estimate with factor `smoothing_factor` in `[0, 1]`.
    ///
    /// The first estimate after acquisition is taken as is. A failed walk keeps
    /// the previous joints and counts as a missed step.
    pub fn update_joints<C: Clusterer>(
        &mut self,
        tracker: &SkeletalTracker<C>,
        smoothing_factor: f32,
    ) -> Result<TrackingState> {
        if !(0.0..=1.0).contains(&smoothing_factor) {
            return Err(Error::InvalidSmoothing(smoothing_factor));
        }
        if tracker.k() != self.k {
            return Err(Error::TrackerMismatch {
                expected: self.k,
                actual: tracker.k(),
            });
        }
        if self.state.is_lost() {
            self.step += 1;
            return Ok(self.state);
        }

        let outcome = self.update_arm_list(tracker);
        self.last_outcome = Some(outcome);
        let elbow = match outcome {
            ChainOutcome::ThresholdReached => self.update_elbow_approx(tracker),
            _ => None,
        };
        let Some(elbow) = elbow else {
            debug!("arm update missed: {:?}", outcome);
            return Ok(self.record_miss());
        };

        self.step += 1;
        let centers = tracker.centers();
        let target = ArmJoints {
            hand: centers[self.chain[0]],
            elbow: centers[elbow],
            shoulder: centers[self.chain[self.chain.len() - 1]],
        };
        match self.joints.as_mut() {
            Some(joints) => joints.lerp_towards(&target, smoothing_factor),
            None => self.joints = Some(target),
        }
        self.last_tracked_step = self.step;
        self.state = TrackingState::Tracking;
        Ok(self.state)
    }

    /// Counts a step in which the arm could not be located.
    pub fn record_miss(&mut self) -> TrackingState {
        self.step += 1;
        self.state = match self.state {
            TrackingState::Acquiring => TrackingState::Acquiring,
            TrackingState::Lost => TrackingState::Lost,
            TrackingState::Tracking | TrackingState::Coasting => {
                if self.missed_steps() > self.max_missed_steps as u64 {
                    warn!("arm lost after {} missed steps", self.missed_steps());
                    TrackingState::Lost
                } else {
                    TrackingState::Coasting
                }
            }
        };
        self.state
    }

    /// Forgets the current estimate and starts acquiring again from `start_pos`.
    pub fn reset(&mut self, start_pos: glam::Vec3) {
        self.start_pos = start_pos;
        self.chain.clear();
        self.elbow_cluster = None;
        self.elbow_point = None;
        self.joints = None;
        self.last_outcome = None;
        self.state = TrackingState::Acquiring;
        self.last_tracked_step = self.step;
    }

    /// Elbow angle in degrees from the smoothed joints.
    pub fn get_bend_angle(&self) -> Result<f32> {
        self.joints.as_ref().ok_or(Error::NotTracked)?.bend_angle()
    }

    /// Consecutive steps since the last successful update.
    pub fn missed_steps(&self) -> u64 {
        self.step - self.last_tracked_step
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<ChainOutcome> {
        self.last_outcome
    }

    pub fn chain(&self) -> &[usize] {
        &self.chain
    }

    pub fn elbow_cluster(&self) -> Option<usize> {
        self.elbow_cluster
    }

    pub fn elbow_point(&self) -> Option<usize> {
        self.elbow_point
    }

    pub fn joints(&self) -> Option<&ArmJoints> {
        self.joints.as_ref()
    }

    pub fn start_pos(&self) -> glam::Vec3 {
        self.start_pos
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn last_tracked_step(&self) -> u64 {
        self.last_tracked_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_angle() {
        let joints = ArmJoints {
            hand: glam::Vec3::new(0.0, 0.0, 0.5),
            elbow: glam::Vec3::new(0.0, 0.0, 0.8),
            shoulder: glam::Vec3::new(0.3, 0.0, 0.8),
        };
        assert!((joints.bend_angle().unwrap() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn straight_arm() {
        let joints = ArmJoints {
            hand: glam::Vec3::new(0.0, 0.0, 0.5),
            elbow: glam::Vec3::new(0.0, 0.0, 0.8),
            shoulder: glam::Vec3::new(0.0, 0.0, 1.1),
        };
        assert!((joints.bend_angle().unwrap() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn collapsed_segment_is_an_error() {
        let joints = ArmJoints {
            hand: glam::Vec3::ONE,
            elbow: glam::Vec3::ONE,
            shoulder: glam::Vec3::ZERO,
        };
        assert!(matches!(joints.bend_angle(), Err(Error::DegenerateJoint)));
    }

    #[test]
    fn lerp_endpoints() {
        let a = glam::Vec3::new(1.0, 2.0, 3.0);
        let b = glam::Vec3::new(-1.0, 0.0, 5.0);
        assert_eq!(lerp(b, a, 0.0), a);
        assert_eq!(lerp(b, a, 1.0), b);
        assert_eq!(lerp(b, a, 0.5), glam::Vec3::new(0.0, 1.0, 4.0));
    }

    #[test]
    fn lerp_snaps_exactly_at_one() {
        for i in 0..1000 {
            let current = glam::Vec3::splat(0.1 + i as f32 * 0.0137);
            let target = glam::Vec3::splat(0.3 - i as f32 * 0.0071);
            assert_eq!(lerp(target, current, 1.0), target);
            assert_eq!(lerp(target, current, 0.0), current);
        }
    }
}
