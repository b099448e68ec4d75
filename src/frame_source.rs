use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use glob::glob;
use image::ImageReader;

use crate::error::{Error, Result};
use crate::types::{DepthFrame, DepthGrid, Intrinsics};

/// Anything that hands out depth frames one at a time.
///
/// `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DepthFrame>>;

    /// Frames left, when known up front.
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// Frames already in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<DepthFrame>,
}

impl MemorySource {
    pub fn new(frames: Vec<DepthFrame>) -> MemorySource {
        MemorySource {
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<DepthFrame>> {
        Ok(self.frames.pop_front())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.frames.len())
    }
}

/// Parses the timestamp from a file path.
///
/// Assumes the filename (without extension) is a timestamp in nanoseconds.
fn path_to_timestamp(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn depth_image_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    let p = rp.ok()?;
    if p.extension()?.eq_ignore_ascii_case("png") {
        Some(p)
    } else {
        None
    }
}

/// Replays a folder of 16-bit PNG depth images in file name order.
///
/// File stems that parse as integers are used as nanosecond timestamps;
/// otherwise frames are stamped 100 ms apart by index. Every frame shares the
/// scale and intrinsics the source was opened with.
pub struct DirectorySource {
    paths: VecDeque<(i64, PathBuf)>,
    scale: f32,
    intrinsics: Intrinsics,
}

impl DirectorySource {
    pub fn open<P: AsRef<Path>>(
        root: P,
        scale: f32,
        intrinsics: Intrinsics,
    ) -> Result<DirectorySource> {
        let root = root.as_ref();
        let pattern = format!("{}/*", root.display());
        let mut sorted_path: Vec<PathBuf> = glob(&pattern)
            .map_err(|_| Error::NoFrames(root.display().to_string()))?
            .filter_map(depth_image_filter)
            .collect();
        if sorted_path.is_empty() {
            return Err(Error::NoFrames(root.display().to_string()));
        }
        sorted_path.sort();
        log::trace!("{} depth frames under {}", sorted_path.len(), root.display());

        let paths = sorted_path
            .into_iter()
            .enumerate()
            .map(|(idx, p)| {
                let time_ns = path_to_timestamp(&p).unwrap_or(idx as i64 * 100_000_000);
                (time_ns, p)
            })
            .collect();
        Ok(DirectorySource {
            paths,
            scale,
            intrinsics,
        })
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<DepthFrame>> {
        let Some((time_ns, path)) = self.paths.pop_front() else {
            return Ok(None);
        };
        let img = ImageReader::open(&path)?.decode()?.to_luma16();
        let (width, height) = img.dimensions();
        let grid = DepthGrid::from_row_major(
            width as usize,
            height as usize,
            img.as_raw(),
            self.scale,
            self.intrinsics,
        )?;
        Ok(Some(DepthFrame::new(time_ns, grid)))
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.paths.len())
    }
}

/// Writes `grid` as a 16-bit grayscale PNG.
pub fn save_depth_png<P: AsRef<Path>>(grid: &DepthGrid, path: P) -> Result<()> {
    let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
        grid.width() as u32,
        grid.height() as u32,
        grid.to_row_major(),
    )
    .ok_or(Error::DepthSizeMismatch {
        expected: grid.width() * grid.height(),
        actual: grid.depth().len(),
    })?;
    img.save(path)?;
    Ok(())
}
