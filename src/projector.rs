use rayon::prelude::*;

use crate::types::{DepthGrid, Intrinsics, PointCloud};

/// Deprojects a pixel with raw depth `z` (already in metres) through a
/// distortion-free pinhole.
pub fn deproject_pixel(intrinsics: &Intrinsics, col: f32, row: f32, z: f32) -> glam::Vec3 {
    let x = (col - intrinsics.ppx) / intrinsics.fx;
    let y = (row - intrinsics.ppy) / intrinsics.fy;
    glam::Vec3::new(x * z, y * z, z)
}

/// Projects a camera-frame point back to pixel coordinates. `None` behind the camera.
pub fn project_point(intrinsics: &Intrinsics, p: &glam::Vec3) -> Option<(f32, f32)> {
    if p.z <= 0.0 {
        return None;
    }
    Some((
        p.x / p.z * intrinsics.fx + intrinsics.ppx,
        p.y / p.z * intrinsics.fy + intrinsics.ppy,
    ))
}

/// Turns every non-zero pixel of `grid` into a 3D point, in row-major order.
pub fn deproject(grid: &DepthGrid) -> PointCloud {
    let depth = grid.depth();
    let scale = grid.scale();
    let intrinsics = grid.intrinsics();
    (0..grid.height())
        .into_par_iter()
        .flat_map_iter(|r| {
            (0..grid.width()).filter_map(move |c| {
                let d = depth[(r, c)];
                if d == 0 {
                    None
                } else {
                    Some(deproject_pixel(intrinsics, c as f32, r as f32, d as f32 * scale))
                }
            })
        })
        .collect()
}

/// Rebuilds `cloud` in place, reusing its allocation across frames.
pub fn deproject_into(grid: &DepthGrid, cloud: &mut PointCloud) {
    cloud.clear();
    cloud.par_extend(deproject(grid));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_point_maps_to_optical_axis() {
        let intrinsics = Intrinsics::new(4, 4, 2.0, 2.0, 100.0, 100.0);
        let p = deproject_pixel(&intrinsics, 2.0, 2.0, 1.5);
        assert_eq!(p, glam::Vec3::new(0.0, 0.0, 1.5));
        let p = deproject_pixel(&intrinsics, 3.0, 1.0, 2.0);
        let back = project_point(&intrinsics, &p).unwrap();
        assert!((back.0 - 3.0).abs() < 1e-5);
        assert!((back.1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_pixels_are_skipped() {
        let intrinsics = Intrinsics::new(3, 2, 1.0, 1.0, 10.0, 10.0);
        let grid =
            DepthGrid::from_row_major(3, 2, &[0, 500, 0, 1000, 0, 0], 0.001, intrinsics).unwrap();
        let cloud = deproject(&grid);
        assert_eq!(cloud.len(), 2);
        assert!((cloud[0].z - 0.5).abs() < 1e-6);
        assert!((cloud[1].z - 1.0).abs() < 1e-6);
        assert!((cloud[1].x - -0.1).abs() < 1e-6);
    }
}
