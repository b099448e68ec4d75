use thiserror::Error;

/// Errors raised by the tracking pipeline and its I/O surfaces.
///
/// Search failures (no hand candidate, dead-end traversal) are not errors: they
/// are reported as [`crate::arm::ChainOutcome`] values and absorbed by the
/// arm's missed-step budget.
#[derive(Debug, Error)]
pub enum Error {
    #[error("depth scale must be positive and finite, got {0}")]
    InvalidDepthScale(f32),

    #[error("depth buffer holds {actual} samples, expected {expected}")]
    DepthSizeMismatch { expected: usize, actual: usize },

    #[error("cluster count k must be at least 1")]
    InvalidClusterCount,

    #[error("point cloud has {points} points, clustering needs more than k = {k}")]
    NotEnoughPoints { points: usize, k: usize },

    #[error(
        "clusterer returned {centers} centers and {labels} labels, expected {k} and {points}"
    )]
    MalformedAssignment {
        k: usize,
        points: usize,
        centers: usize,
        labels: usize,
    },

    #[error("smoothing factor {0} is outside [0, 1]")]
    InvalidSmoothing(f32),

    #[error("arm was built for a tracker with k = {expected}, got k = {actual}")]
    TrackerMismatch { expected: usize, actual: usize },

    #[error("bend angle is undefined: a joint segment has near-zero length")]
    DegenerateJoint,

    #[error("arm has no joint estimate yet")]
    NotTracked,

    #[error("no depth frames found under {0}")]
    NoFrames(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
