use nalgebra::{Isometry3, Matrix2, Point2, Point3, Vector2};

use crate::{CameraIntrinsics, CoreError};

/// Whether projection applies the lens distortion model.
///
/// `Distorted` matches what the physical camera produces; `Undistorted`
/// projects through an ideal pinhole, useful for comparing against
/// pre-undistorted detections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LensMode {
    Distorted,
    Undistorted,
}

/// Apply the radial-tangential distortion model to normalized image
/// coordinates.
#[inline]
pub fn distort_normalized(cam: &CameraIntrinsics, p: Vector2<f64>) -> Vector2<f64> {
    let [k1, k2, p1, p2, k3] = cam.distortion;
    let (x, y) = (p.x, p.y);
    let r2 = x * x + y * y;
    let r4 = r2 * r2;
    let r6 = r4 * r2;
    let radial = 1.0 + k1 * r2 + k2 * r4 + k3 * r6;
    Vector2::new(
        x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x),
        y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y,
    )
}

/// Project a 3D point given in the transform's source frame into pixel
/// coordinates.
///
/// The point is mapped through the rigid `transform` into camera
/// coordinates first. A point at (or behind) the camera center is an error.
pub fn project_point(
    cam: &CameraIntrinsics,
    transform: &Isometry3<f64>,
    mode: LensMode,
    point: &Point3<f64>,
) -> Result<Point2<f64>, CoreError> {
    let pc = transform * point;
    if pc.z < f64::EPSILON.sqrt() {
        return Err(CoreError::PointAtCameraCenter);
    }
    let normalized = Vector2::new(pc.x / pc.z, pc.y / pc.z);
    let n = match mode {
        LensMode::Distorted => distort_normalized(cam, normalized),
        LensMode::Undistorted => normalized,
    };
    Ok(Point2::new(
        cam.fx * n.x + cam.skew * n.y + cam.cx,
        cam.fy * n.y + cam.cy,
    ))
}

/// Project a whole point set, keeping the input order.
pub fn project_points(
    cam: &CameraIntrinsics,
    transform: &Isometry3<f64>,
    mode: LensMode,
    points: &[Point3<f64>],
) -> Result<Vec<Point2<f64>>, CoreError> {
    points
        .iter()
        .map(|p| project_point(cam, transform, mode, p))
        .collect()
}

const UNDISTORT_MAX_ITERATIONS: u32 = 100;
const UNDISTORT_EPS: f64 = 1e-6;

/// Map a distorted pixel back to undistorted normalized image coordinates.
///
/// Newton iteration on the distortion model with an analytic 2×2 Jacobian,
/// starting from the distorted normalized point. Converges when either the
/// residual or the update step drops below `1e-6`.
pub fn undistort_pixel(cam: &CameraIntrinsics, pixel: &Point2<f64>) -> Result<Point2<f64>, CoreError> {
    let [k1, k2, p1, p2, k3] = cam.distortion;
    let target = Vector2::new((pixel.x - cam.cx) / cam.fx, (pixel.y - cam.cy) / cam.fy);
    let mut point = target;

    for _ in 0..UNDISTORT_MAX_ITERATIONS {
        let (x, y) = (point.x, point.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let radial = 1.0 + k1 * r2 + k2 * r4 + k3 * r4 * r2;

        let estimate = distort_normalized(cam, point);
        let error = estimate - target;
        if error.norm() < UNDISTORT_EPS {
            return Ok(Point2::from(point));
        }

        let d_radial = k1 + 2.0 * k2 * r2 + 3.0 * k3 * r4;
        let (dr_dx, dr_dy) = (2.0 * x, 2.0 * y);
        let j00 = radial + x * d_radial * dr_dx + 2.0 * p1 * y + p2 * (dr_dx + 4.0 * x);
        let j01 = x * d_radial * dr_dy + 2.0 * p1 * x + p2 * dr_dy;
        let j10 = y * d_radial * dr_dx + p1 * dr_dx + 2.0 * p2 * y;
        let j11 = radial + y * d_radial * dr_dy + p1 * (dr_dy + 4.0 * y) + 2.0 * p2 * x;
        let jacobian = Matrix2::new(j00, j01, j10, j11);

        let inv = jacobian
            .try_inverse()
            .ok_or(CoreError::SingularJacobian)?;
        let delta = inv * error;
        point -= delta;
        if delta.norm() < UNDISTORT_EPS {
            return Ok(Point2::from(point));
        }
    }

    Err(CoreError::DidNotConverge {
        iterations: UNDISTORT_MAX_ITERATIONS,
    })
}

/// Root-mean-square Euclidean distance between two equally long point sets.
pub fn rms_error(observed: &[Point2<f64>], reference: &[Point2<f64>]) -> Result<f64, CoreError> {
    if observed.len() != reference.len() {
        return Err(CoreError::LengthMismatch {
            left: observed.len(),
            right: reference.len(),
        });
    }
    if observed.is_empty() {
        return Err(CoreError::LengthMismatch { left: 0, right: 0 });
    }
    let sum: f64 = observed
        .iter()
        .zip(reference.iter())
        .map(|(a, b)| (a - b).norm_squared())
        .sum();
    Ok((sum / observed.len() as f64).sqrt())
}
