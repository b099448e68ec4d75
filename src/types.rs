use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered 3D points in camera coordinates (metres, z pointing forward).
pub type PointCloud = Vec<glam::Vec3>;

/// Per-pixel cluster ids produced by background segmentation. `-1` is unassigned.
pub type ClusterMap = na::DMatrix<i32>;

/// Pinhole intrinsics of the depth stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub ppx: f32,
    pub ppy: f32,
    pub fx: f32,
    pub fy: f32,
}

impl Intrinsics {
    pub fn new(width: u32, height: u32, ppx: f32, ppy: f32, fx: f32, fy: f32) -> Intrinsics {
        Intrinsics {
            width,
            height,
            ppx,
            ppy,
            fx,
            fy,
        }
    }

    /// Principal point at the image center with equal focal lengths.
    pub fn centered(width: u32, height: u32, focal: f32) -> Intrinsics {
        Intrinsics::new(
            width,
            height,
            width as f32 / 2.0,
            height as f32 / 2.0,
            focal,
            focal,
        )
    }
}

impl Default for Intrinsics {
    fn default() -> Self {
        Intrinsics::new(320, 240, 160.0, 120.0, 290.0, 290.0)
    }
}

/// One depth capture: raw samples plus what is needed to turn them into metres.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    depth: na::DMatrix<u16>,
    scale: f32,
    intrinsics: Intrinsics,
}

impl DepthGrid {
    /// The intrinsics' `width` and `height` are taken from the shape of `depth`.
    pub fn new(
        depth: na::DMatrix<u16>,
        scale: f32,
        mut intrinsics: Intrinsics,
    ) -> Result<DepthGrid> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::InvalidDepthScale(scale));
        }
        intrinsics.width = depth.ncols() as u32;
        intrinsics.height = depth.nrows() as u32;
        Ok(DepthGrid {
            depth,
            scale,
            intrinsics,
        })
    }

    /// Builds a grid from a row-major sample buffer, the layout sensors deliver.
    pub fn from_row_major(
        width: usize,
        height: usize,
        samples: &[u16],
        scale: f32,
        intrinsics: Intrinsics,
    ) -> Result<DepthGrid> {
        if samples.len() != width * height {
            return Err(Error::DepthSizeMismatch {
                expected: width * height,
                actual: samples.len(),
            });
        }
        DepthGrid::new(
            na::DMatrix::from_row_slice(height, width, samples),
            scale,
            intrinsics,
        )
    }

    pub fn zeros(
        width: usize,
        height: usize,
        scale: f32,
        intrinsics: Intrinsics,
    ) -> Result<DepthGrid> {
        DepthGrid::new(na::DMatrix::zeros(height, width), scale, intrinsics)
    }

    /// Same metadata, different samples.
    pub(crate) fn with_depth(&self, depth: na::DMatrix<u16>) -> DepthGrid {
        DepthGrid {
            depth,
            scale: self.scale,
            intrinsics: self.intrinsics,
        }
    }

    pub fn width(&self) -> usize {
        self.depth.ncols()
    }

    pub fn height(&self) -> usize {
        self.depth.nrows()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn depth(&self) -> &na::DMatrix<u16> {
        &self.depth
    }

    pub fn get(&self, row: usize, col: usize) -> u16 {
        self.depth[(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u16) {
        self.depth[(row, col)] = value;
    }

    pub fn non_zero_count(&self) -> usize {
        self.depth.iter().filter(|d| **d != 0).count()
    }

    /// Samples in row-major order.
    pub fn to_row_major(&self) -> Vec<u16> {
        self.depth.transpose().as_slice().to_vec()
    }
}

/// A depth grid stamped with its capture time.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub time_ns: i64,
    pub grid: DepthGrid,
}

impl DepthFrame {
    pub fn new(time_ns: i64, grid: DepthGrid) -> DepthFrame {
        DepthFrame { time_ns, grid }
    }
}
