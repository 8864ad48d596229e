//! Force platform coordinate frames from corner geometry.
//!
//! Corners follow the vendor winding: c1 - c2 runs along the platform's
//! local Y and c3 - c2 along its local X, with Z = X x Y. The frame origin is
//! the corner centroid.

use crate::error::{GallopError, Result};
use crate::types::{AnalogMeta, Corners, PlatformFrame, Rotation3, Vec3};

/// Shortest corner edge accepted before the direction is considered undefined.
pub const MIN_EDGE_LENGTH: f64 = 1e-9;

/// Default largest |cos| between the X and Y edges; beyond this the rows of
/// the rotation stop being orthonormal. Surveyed plates that sit a few
/// millimetres off square need a looser value, see
/// [`platform_frame_with_tolerance`].
pub const MAX_EDGE_SKEW: f64 = 1e-3;

fn unit_edge(plate: usize, edge: Vec3, name: &str) -> Result<Vec3> {
    let length = edge.norm();
    if length < MIN_EDGE_LENGTH {
        return Err(GallopError::degenerate(
            plate,
            format!("{name} edge has length {length:e}"),
        ));
    }
    Ok(edge / length)
}

/// Origin and global-to-platform rotation for one platform, with the
/// default edge skew tolerance.
pub fn platform_frame(plate: usize, corners: &Corners) -> Result<PlatformFrame> {
    platform_frame_with_tolerance(plate, corners, MAX_EDGE_SKEW)
}

/// Like [`platform_frame`], accepting corner edges up to `max_skew` |cos| apart
/// from perpendicular.
pub fn platform_frame_with_tolerance(
    plate: usize,
    corners: &Corners,
    max_skew: f64,
) -> Result<PlatformFrame> {
    if !(max_skew.is_finite() && (0.0..1.0).contains(&max_skew)) {
        return Err(GallopError::argument(format!(
            "edge skew tolerance must lie in [0, 1), got {max_skew}"
        )));
    }
    if corners.iter().any(|c| c.iter().any(|v| !v.is_finite())) {
        return Err(GallopError::degenerate(plate, "corner coordinates are not finite"));
    }

    let origin = corners.iter().sum::<Vec3>() / corners.len() as f64;
    let y = unit_edge(plate, corners[0] - corners[1], "Y")?;
    let x = unit_edge(plate, corners[2] - corners[1], "X")?;

    let skew = x.dot(&y);
    if skew.abs() > max_skew {
        return Err(GallopError::degenerate(
            plate,
            format!(
                "X and Y edges are not perpendicular: |cos| = {:.2e} exceeds tolerance {max_skew:.2e}",
                skew.abs()
            ),
        ));
    }
    let z = x.cross(&y);

    let rotation = Rotation3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]);
    log::debug!(
        "FP{}: origin [{:.4}, {:.4}, {:.4}]",
        plate + 1,
        origin.x,
        origin.y,
        origin.z
    );
    Ok(PlatformFrame { origin, rotation })
}

/// One frame per used platform, in plate order. The first degenerate platform
/// fails the whole set.
pub fn platform_frames(meta: &AnalogMeta) -> Result<Vec<PlatformFrame>> {
    platform_frames_with_tolerance(meta, MAX_EDGE_SKEW)
}

pub fn platform_frames_with_tolerance(meta: &AnalogMeta, max_skew: f64) -> Result<Vec<PlatformFrame>> {
    if meta.corners.len() < meta.plate_count {
        return Err(GallopError::data_shape(format!(
            "{} corner sets for {} force platforms",
            meta.corners.len(),
            meta.plate_count
        )));
    }
    meta.corners
        .iter()
        .take(meta.plate_count)
        .enumerate()
        .map(|(plate, corners)| platform_frame_with_tolerance(plate, corners, max_skew))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c3d::ParameterMap;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn rectangle(width: f64, depth: f64) -> Corners {
        [
            Vec3::new(0.0, depth, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(width, 0.0, 0.0),
            Vec3::new(width, depth, 0.0),
        ]
    }

    fn assert_orthonormal(rotation: &Rotation3) {
        let product = rotation * rotation.transpose();
        for r in 0..3 {
            for c in 0..3 {
                let want = if r == c { 1.0 } else { 0.0 };
                assert_relative_eq!(product[(r, c)], want, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_axis_aligned_plate_is_identity() {
        let frame = platform_frame(0, &rectangle(0.6, 0.4)).unwrap();
        assert_relative_eq!(frame.rotation, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(frame.origin, Vec3::new(0.3, 0.2, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotated_plate_recovers_rotation() {
        let angle = 30f64.to_radians();
        let (s, c) = angle.sin_cos();
        // Rotation about global Z applied to an offset rectangle.
        let about_z = Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);
        let offset = Vec3::new(1.0, 2.0, 0.05);
        let corners = rectangle(0.5, 0.4).map(|p| about_z * p + offset);

        let frame = platform_frame(2, &corners).unwrap();
        assert_orthonormal(&frame.rotation);
        assert_relative_eq!(frame.rotation, about_z.transpose(), epsilon = 1e-9);

        let mean = corners.iter().sum::<Vec3>() / 4.0;
        assert_relative_eq!(frame.origin, mean, epsilon = 1e-12);
    }

    #[test]
    fn test_corners_map_to_local_plane() {
        let angle = 0.7f64;
        let (s, c) = angle.sin_cos();
        let about_x = Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c);
        let corners = rectangle(0.5, 0.4).map(|p| about_x * p);
        let frame = platform_frame(0, &corners).unwrap();
        for corner in &corners {
            assert_relative_eq!(frame.to_local(corner).z, 0.0, epsilon = 1e-12);
        }
        let local = frame.to_local(&corners[2]);
        assert_relative_eq!(local.x, 0.25, epsilon = 1e-12);
        assert_relative_eq!(local.y, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_corners_are_degenerate() {
        let mut corners = rectangle(0.5, 0.4);
        corners[0] = corners[1];
        match platform_frame(3, &corners).unwrap_err() {
            GallopError::DegenerateGeometry { plate, .. } => assert_eq!(plate, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_skewed_corners_are_degenerate() {
        let mut corners = rectangle(0.5, 0.4);
        corners[0] = Vec3::new(0.2, 0.4, 0.0);
        assert!(matches!(
            platform_frame(0, &corners),
            Err(GallopError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_slightly_off_square_plate_needs_looser_tolerance() {
        // 600 x 400 mm plate with c1 surveyed 1 mm off: |cos| is about 2.5e-3.
        let corners = [
            Vec3::new(1.0, 400.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(600.0, 0.0, 0.0),
            Vec3::new(600.0, 400.0, 0.0),
        ];
        let err = platform_frame(0, &corners).unwrap_err();
        assert!(matches!(err, GallopError::DegenerateGeometry { .. }));
        assert!(err.to_string().contains("tolerance 1.00e-3"));

        let frame = platform_frame_with_tolerance(0, &corners, 5e-3).unwrap();
        assert_relative_eq!(frame.rotation.row(0).norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.rotation.row(2).norm(), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_rejects_invalid_tolerance() {
        let corners = rectangle(0.5, 0.4);
        assert!(matches!(
            platform_frame_with_tolerance(0, &corners, f64::NAN),
            Err(GallopError::Argument(_))
        ));
        assert!(platform_frame_with_tolerance(0, &corners, 1.5).is_err());
    }

    #[test]
    fn test_non_finite_corner_is_degenerate() {
        let mut corners = rectangle(0.5, 0.4);
        corners[3].z = f64::NAN;
        assert!(platform_frame(1, &corners).is_err());
    }

    #[test]
    fn test_platform_frames_in_plate_order() {
        let second = rectangle(0.5, 0.4).map(|p| p + Vec3::new(0.5, 0.0, 0.0));
        let meta = AnalogMeta {
            rate: 1000.0,
            first_frame: 0,
            last_frame: 9,
            used_channels: (0..12).collect(),
            unused_channels: Vec::new(),
            plate_count: 2,
            corners: vec![rectangle(0.5, 0.4), second],
            parameters: ParameterMap::new(),
        };
        let frames = platform_frames(&meta).unwrap();
        assert_eq!(frames.len(), 2);
        assert_relative_eq!(frames[1].origin.x, 0.75, epsilon = 1e-12);

        let short = AnalogMeta {
            corners: vec![rectangle(0.5, 0.4)],
            ..meta
        };
        assert!(matches!(platform_frames(&short), Err(GallopError::DataShape(_))));
    }
}
