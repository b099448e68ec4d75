//! Synthetic depth frames of a single arm, for replay, tests and benchmarks.
//!
//! The arm is two capsules (forearm, upper arm) plus a sphere at the shoulder.
//! Surface samples are projected through the pinhole and z-buffered, then a few
//! isolated speckles are scattered over the frame the way real sensors do.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::projector::project_point;
use crate::types::{DepthGrid, Intrinsics};

/// Spacing between surface samples in metres.
const SAMPLE_STEP: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmPose {
    pub hand: [f32; 3],
    pub elbow: [f32; 3],
    pub shoulder: [f32; 3],
}

impl Default for ArmPose {
    fn default() -> Self {
        ArmPose {
            hand: [-0.08, 0.06, 0.45],
            elbow: [-0.06, 0.04, 0.75],
            shoulder: [0.2, 0.0, 0.8],
        }
    }
}

impl ArmPose {
    pub fn joints(&self) -> (glam::Vec3, glam::Vec3, glam::Vec3) {
        (
            glam::Vec3::from_array(self.hand),
            glam::Vec3::from_array(self.elbow),
            glam::Vec3::from_array(self.shoulder),
        )
    }

    /// Moves the hand along a small circle, `phase` in radians.
    pub fn swayed(&self, phase: f32, amplitude: f32) -> ArmPose {
        let mut pose = *self;
        pose.hand[0] += amplitude * phase.cos();
        pose.hand[1] += amplitude * phase.sin();
        pose
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub intrinsics: Intrinsics,
    pub depth_scale: f32,
    pub arm_radius: f32,
    pub shoulder_radius: f32,
    /// Number of isolated noise pixels.
    pub speckles: usize,
    /// Uniform depth noise amplitude in metres.
    pub noise: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            intrinsics: Intrinsics::default(),
            depth_scale: 0.001,
            arm_radius: 0.035,
            shoulder_radius: 0.06,
            speckles: 40,
            noise: 0.002,
        }
    }
}

pub struct SceneGenerator {
    config: SceneConfig,
    rng: ChaCha8Rng,
}

impl SceneGenerator {
    pub fn new(config: SceneConfig, seed: u64) -> SceneGenerator {
        SceneGenerator {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn render(&mut self, pose: &ArmPose) -> Result<DepthGrid> {
        let intrinsics = self.config.intrinsics;
        let width = intrinsics.width as usize;
        let height = intrinsics.height as usize;
        let mut zbuf = vec![f32::INFINITY; width * height];

        let (hand, elbow, shoulder) = pose.joints();
        let mut surface = capsule_samples(hand, elbow, self.config.arm_radius);
        surface.extend(capsule_samples(elbow, shoulder, self.config.arm_radius));
        surface.extend(sphere_samples(shoulder, self.config.shoulder_radius));

        for p in &surface {
            let Some((u, v)) = project_point(&intrinsics, p) else {
                continue;
            };
            let (u, v) = (u.round(), v.round());
            if u < 0.0 || v < 0.0 || u >= width as f32 || v >= height as f32 {
                continue;
            }
            let idx = v as usize * width + u as usize;
            zbuf[idx] = zbuf[idx].min(p.z);
        }

        let scale = self.config.depth_scale;
        let noise = self.config.noise;
        let mut samples: Vec<u16> = zbuf
            .iter()
            .map(|z| {
                if z.is_finite() {
                    let jitter = if noise > 0.0 {
                        self.rng.random_range(-noise..noise)
                    } else {
                        0.0
                    };
                    ((z + jitter) / scale).round().clamp(1.0, u16::MAX as f32) as u16
                } else {
                    0
                }
            })
            .collect();

        for _ in 0..self.config.speckles {
            let idx = self.rng.random_range(0..samples.len());
            if samples[idx] == 0 {
                let z: f32 = self.rng.random_range(1.5..4.0);
                samples[idx] = (z / scale).round().min(u16::MAX as f32) as u16;
            }
        }

        DepthGrid::from_row_major(width, height, &samples, scale, intrinsics)
    }
}

fn capsule_samples(a: glam::Vec3, b: glam::Vec3, radius: f32) -> Vec<glam::Vec3> {
    let axis = b - a;
    let length = axis.length();
    if length < f32::EPSILON {
        return sphere_samples(a, radius);
    }
    let dir = axis / length;
    let (u, v) = dir.any_orthonormal_pair();
    let rings = (length / SAMPLE_STEP).ceil() as usize;
    let around = ((std::f32::consts::TAU * radius) / SAMPLE_STEP).ceil().max(8.0) as usize;

    let mut points = Vec::with_capacity((rings + 1) * around);
    for i in 0..=rings {
        let c = a + dir * (length * i as f32 / rings as f32);
        for j in 0..around {
            let theta = std::f32::consts::TAU * j as f32 / around as f32;
            points.push(c + (u * theta.cos() + v * theta.sin()) * radius);
        }
    }
    // rounded ends
    points.extend(sphere_samples(a, radius));
    points.extend(sphere_samples(b, radius));
    points
}

/// Fibonacci sphere sampling.
fn sphere_samples(center: glam::Vec3, radius: f32) -> Vec<glam::Vec3> {
    let area = 4.0 * std::f32::consts::PI * radius * radius;
    let n = ((area / (SAMPLE_STEP * SAMPLE_STEP)).ceil() as usize).max(16);
    let golden = std::f32::consts::PI * (3.0 - 5f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            center + glam::Vec3::new(r * theta.cos(), y, r * theta.sin()) * radius
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_frame() {
        let pose = ArmPose::default();
        let a = SceneGenerator::new(SceneConfig::default(), 9).render(&pose).unwrap();
        let b = SceneGenerator::new(SceneConfig::default(), 9).render(&pose).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hand_is_nearest_surface() {
        let config = SceneConfig {
            speckles: 0,
            noise: 0.0,
            ..Default::default()
        };
        let grid = SceneGenerator::new(config, 0).render(&ArmPose::default()).unwrap();
        assert!(grid.non_zero_count() > 500);
        let nearest = grid.depth().iter().filter(|d| **d > 0).min().copied().unwrap();
        // hand cap is the closest surface
        assert!((nearest as f32 * 0.001 - (0.45 - 0.035)).abs() < 0.01);
    }
}
