//! Stereo extrinsic solving with fixed intrinsics.
//!
//! Inputs are the paired observation sequences of two cameras looking at the
//! same board, plus both cameras' (already calibrated) intrinsics. Only the
//! rigid transform between the cameras is estimated:
//!
//! 1. observations are undistorted to normalized image coordinates;
//! 2. a planar pose per sample and camera comes from the board homography
//!    (Zhang-style decomposition, SVD-orthonormalized);
//! 3. the per-sample relative poses are averaged (translation mean, rotation
//!    chordal mean);
//! 4. Gauss-Newton refines the 6-dof relative pose against the target
//!    camera's raw pixel observations, holding the reference poses fixed.

use log::{debug, info};
use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix3, Matrix4, Point2, Point3, Rotation3, Translation3,
    UnitQuaternion, Vector3, Vector6,
};
use serde::{Deserialize, Serialize};

use calib_rig_core::{
    dlt_homography, project_point, undistort_pixel, CameraIntrinsics, ChessboardModel,
    ChessboardObservation, CoreError, LensMode,
};

use crate::error::SolveError;

/// Observation geometry with a normalized collinearity figure below this is
/// rejected as degenerate.
const CONDITIONING_THRESHOLD: f64 = 1e-3;

/// Result of one extrinsic solve: the rigid transform mapping reference
/// camera coordinates to the target camera, plus the overall calibration
/// RMS error in pixels over both cameras.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtrinsicSolve {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub rms: f64,
}

impl ExtrinsicSolve {
    /// The homogeneous `[R|t; 0 0 0 1]` form.
    pub fn matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation)),
        )
    }
}

#[derive(Clone, Debug)]
pub struct StereoExtrinsicSolver {
    /// Refinement iteration cap.
    pub max_iterations: usize,
    /// Refinement stops once the parameter update norm drops below this.
    pub eps: f64,
}

impl Default for StereoExtrinsicSolver {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            eps: 1e-5,
        }
    }
}

impl StereoExtrinsicSolver {
    /// Solve for the transform mapping `reference` camera coordinates into
    /// the `target` camera.
    ///
    /// `reference_obs[i]` and `target_obs[i]` must come from the same board
    /// pose. Error diagnostics index the two cameras as 0 (reference) and
    /// 1 (target).
    pub fn solve(
        &self,
        reference: &CameraIntrinsics,
        target: &CameraIntrinsics,
        model: &ChessboardModel,
        reference_obs: &[ChessboardObservation],
        target_obs: &[ChessboardObservation],
    ) -> Result<ExtrinsicSolve, SolveError> {
        if reference_obs.len() != target_obs.len() {
            return Err(SolveError::SampleCountMismatch {
                reference: reference_obs.len(),
                target: target_obs.len(),
            });
        }
        if reference_obs.is_empty() {
            return Err(SolveError::NoSamples);
        }
        if !reference.calibrated {
            return Err(SolveError::UncalibratedCamera { index: 0 });
        }
        if !target.calibrated {
            return Err(SolveError::UncalibratedCamera { index: 1 });
        }
        for (camera, list) in [(0, reference_obs), (1, target_obs)] {
            for (sample, obs) in list.iter().enumerate() {
                if obs.len() != model.len() {
                    return Err(SolveError::ObservationLengthMismatch {
                        sample,
                        expected: model.len(),
                        actual: obs.len(),
                    });
                }
            }
            check_configuration(camera, list)?;
        }

        let board_xy: Vec<Point2<f64>> = model
            .points()
            .iter()
            .map(|p| Point2::new(p.x, p.y))
            .collect();

        let mut reference_poses = Vec::with_capacity(reference_obs.len());
        let mut relative = Vec::with_capacity(reference_obs.len());
        for (sample, (obs0, obsk)) in reference_obs.iter().zip(target_obs.iter()).enumerate() {
            let pose0 = planar_pose(reference, &board_xy, obs0)?;
            let posek = planar_pose(target, &board_xy, obsk)?;
            let rel = posek * pose0.inverse();
            debug!(
                "sample {sample}: relative translation {:?}",
                rel.translation.vector
            );
            reference_poses.push(pose0);
            relative.push(rel);
        }

        let initial = average_pose(&relative)?;
        let refined = self.refine(
            target,
            model.points(),
            &reference_poses,
            target_obs,
            initial,
        )?;

        let rms = stereo_rms(
            reference,
            target,
            model.points(),
            &reference_poses,
            &refined,
            reference_obs,
            target_obs,
        )?;
        info!(
            "extrinsic solved over {} samples, rms {:.4} px",
            reference_obs.len(),
            rms
        );

        Ok(ExtrinsicSolve {
            rotation: refined.rotation.to_rotation_matrix().into_inner(),
            translation: refined.translation.vector,
            rms,
        })
    }

    fn refine(
        &self,
        target: &CameraIntrinsics,
        model: &[Point3<f64>],
        reference_poses: &[Isometry3<f64>],
        target_obs: &[ChessboardObservation],
        initial: Isometry3<f64>,
    ) -> Result<Isometry3<f64>, SolveError> {
        let mut params = pose_params(&initial);
        let rows = 2 * model.len() * target_obs.len();
        let delta = 1e-6;

        for iteration in 0..self.max_iterations {
            let residuals = stacked_residuals(target, model, reference_poses, target_obs, &params)?;

            let mut jacobian = DMatrix::<f64>::zeros(rows, 6);
            for c in 0..6 {
                let mut plus = params;
                plus[c] += delta;
                let mut minus = params;
                minus[c] -= delta;
                let rp = stacked_residuals(target, model, reference_poses, target_obs, &plus)?;
                let rm = stacked_residuals(target, model, reference_poses, target_obs, &minus)?;
                jacobian.set_column(c, &((rp - rm) / (2.0 * delta)));
            }

            let jtj = jacobian.transpose() * &jacobian;
            let jtr = jacobian.transpose() * &residuals;
            let Some(step) = jtj.lu().solve(&jtr) else {
                debug!("refinement stopped at iteration {iteration}: singular normal equations");
                break;
            };
            for c in 0..6 {
                params[c] -= step[c];
            }
            if step.norm() < self.eps {
                debug!("refinement converged after {} iterations", iteration + 1);
                break;
            }
        }

        Ok(pose_from_params(&params))
    }
}

/// Reject samples whose corners are (near-)collinear in the image: no
/// homography, and therefore no pose, can be recovered from them.
fn check_configuration(camera: usize, list: &[ChessboardObservation]) -> Result<(), SolveError> {
    let mut images = Vec::new();
    for (sample, obs) in list.iter().enumerate() {
        if collinearity_sigma(obs.points()) < CONDITIONING_THRESHOLD {
            images.push(sample);
        }
    }
    if images.is_empty() {
        Ok(())
    } else {
        Err(SolveError::DegenerateConfiguration { camera, images })
    }
}

/// Smallest singular value of the stacked `[x y 1]` rows after isotropic
/// normalization; zero for collinear or coincident point sets, order one for
/// a spread-out grid.
fn collinearity_sigma(points: &[Point2<f64>]) -> f64 {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let spread = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if spread < 1e-12 {
        return 0.0;
    }
    let s = (2.0_f64).sqrt() / spread;

    let mut a = DMatrix::<f64>::zeros(points.len(), 3);
    for (row, p) in points.iter().enumerate() {
        a[(row, 0)] = s * (p.x - cx);
        a[(row, 1)] = s * (p.y - cy);
        a[(row, 2)] = 1.0;
    }
    let svd = a.svd(false, false);
    svd.singular_values
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// Board pose in one camera's frame from a single observation.
///
/// Used internally per sample, and by the verification path to place the
/// board in the reference camera before reprojecting into the target.
pub fn board_pose(
    cam: &CameraIntrinsics,
    model: &ChessboardModel,
    obs: &ChessboardObservation,
) -> Result<Isometry3<f64>, CoreError> {
    let board_xy: Vec<Point2<f64>> = model
        .points()
        .iter()
        .map(|p| Point2::new(p.x, p.y))
        .collect();
    planar_pose(cam, &board_xy, obs)
}

/// Board pose from one camera's observation: undistort to normalized
/// coordinates, estimate the board-to-image homography and decompose it into
/// a rigid transform (the board lies in its own Z = 0 plane).
fn planar_pose(
    cam: &CameraIntrinsics,
    board_xy: &[Point2<f64>],
    obs: &ChessboardObservation,
) -> Result<Isometry3<f64>, CoreError> {
    let normalized: Vec<Point2<f64>> = obs
        .points()
        .iter()
        .map(|p| undistort_pixel(cam, p))
        .collect::<Result<_, CoreError>>()?;

    let h = dlt_homography(board_xy, &normalized)?.h;
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let mut lambda = 2.0 / (h1.norm() + h2.norm());
    // the board must sit in front of the camera
    if lambda * h3[2] < 0.0 {
        lambda = -lambda;
    }

    let r1 = lambda * h1;
    let r2 = lambda * h2;
    let r3 = r1.cross(&r2);
    let rotation = nearest_rotation(&Matrix3::from_columns(&[r1, r2, r3]))?;
    let translation = lambda * h3;

    Ok(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation)),
    ))
}

/// Orthogonal projection onto SO(3).
fn nearest_rotation(m: &Matrix3<f64>) -> Result<Matrix3<f64>, CoreError> {
    let svd = m.svd(true, true);
    let u = svd.u.ok_or(CoreError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(CoreError::SvdFailed)?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut flipped = u;
        flipped.set_column(2, &(-u.column(2)));
        r = flipped * v_t;
    }
    Ok(r)
}

/// Translation mean and rotation chordal mean over per-sample poses.
fn average_pose(poses: &[Isometry3<f64>]) -> Result<Isometry3<f64>, SolveError> {
    let n = poses.len() as f64;
    let translation = poses
        .iter()
        .map(|p| p.translation.vector)
        .sum::<Vector3<f64>>()
        / n;
    let rotation_sum = poses
        .iter()
        .map(|p| p.rotation.to_rotation_matrix().into_inner())
        .sum::<Matrix3<f64>>();
    let rotation = nearest_rotation(&rotation_sum)?;

    Ok(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation)),
    ))
}

fn pose_params(pose: &Isometry3<f64>) -> Vector6<f64> {
    let axis = pose.rotation.scaled_axis();
    let t = pose.translation.vector;
    Vector6::new(axis.x, axis.y, axis.z, t.x, t.y, t.z)
}

fn pose_from_params(p: &Vector6<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(p[3], p[4], p[5]),
        UnitQuaternion::from_scaled_axis(Vector3::new(p[0], p[1], p[2])),
    )
}

/// Pixel residuals of the target camera over every sample and corner, for
/// the relative pose encoded in `params`.
fn stacked_residuals(
    target: &CameraIntrinsics,
    model: &[Point3<f64>],
    reference_poses: &[Isometry3<f64>],
    target_obs: &[ChessboardObservation],
    params: &Vector6<f64>,
) -> Result<DVector<f64>, SolveError> {
    let rel = pose_from_params(params);
    let mut residuals = DVector::<f64>::zeros(2 * model.len() * target_obs.len());
    let mut row = 0;
    for (pose0, obs) in reference_poses.iter().zip(target_obs.iter()) {
        let board_to_target = rel * pose0;
        for (world, observed) in model.iter().zip(obs.points().iter()) {
            let projected = project_point(target, &board_to_target, LensMode::Distorted, world)?;
            residuals[row] = projected.x - observed.x;
            residuals[row + 1] = projected.y - observed.y;
            row += 2;
        }
    }
    Ok(residuals)
}

/// RMS over both cameras' residuals, the overall calibration error figure.
#[allow(clippy::too_many_arguments)]
fn stereo_rms(
    reference: &CameraIntrinsics,
    target: &CameraIntrinsics,
    model: &[Point3<f64>],
    reference_poses: &[Isometry3<f64>],
    relative: &Isometry3<f64>,
    reference_obs: &[ChessboardObservation],
    target_obs: &[ChessboardObservation],
) -> Result<f64, SolveError> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for ((pose0, obs0), obsk) in reference_poses
        .iter()
        .zip(reference_obs.iter())
        .zip(target_obs.iter())
    {
        let board_to_target = relative * pose0;
        for ((world, seen0), seenk) in model
            .iter()
            .zip(obs0.points().iter())
            .zip(obsk.points().iter())
        {
            let p0 = project_point(reference, pose0, LensMode::Distorted, world)?;
            let pk = project_point(target, &board_to_target, LensMode::Distorted, world)?;
            sum += (p0 - seen0).norm_squared() + (pk - seenk).norm_squared();
            count += 2;
        }
    }
    Ok((sum / count as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calib_rig_core::{project_points, ChessboardGeometry};

    fn reference_camera() -> CameraIntrinsics {
        let mut cam = CameraIntrinsics::pinhole(800.0, 820.0, 320.0, 240.0, 640, 480);
        cam.distortion = [-0.12, 0.05, 0.001, -0.0005, 0.0];
        cam
    }

    fn target_camera() -> CameraIntrinsics {
        let mut cam = CameraIntrinsics::pinhole(790.0, 795.0, 310.0, 250.0, 640, 480);
        cam.distortion = [0.08, -0.03, -0.0008, 0.0012, 0.0];
        cam
    }

    fn board_poses() -> Vec<Isometry3<f64>> {
        [
            (Vector3::new(0.2, 0.0, 0.0), Vector3::new(-60.0, -45.0, 550.0)),
            (Vector3::new(0.0, 0.25, 0.0), Vector3::new(-40.0, -50.0, 600.0)),
            (Vector3::new(-0.15, 0.1, 0.05), Vector3::new(-70.0, -30.0, 580.0)),
            (Vector3::new(0.1, -0.2, 0.1), Vector3::new(-55.0, -60.0, 640.0)),
            (Vector3::new(0.05, 0.05, -0.2), Vector3::new(-65.0, -40.0, 520.0)),
        ]
        .into_iter()
        .map(|(axis, t)| {
            Isometry3::from_parts(
                Translation3::from(t),
                UnitQuaternion::from_scaled_axis(axis),
            )
        })
        .collect()
    }

    fn true_relative() -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(-100.0, 5.0, 10.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.02, -0.3, 0.05)),
        )
    }

    fn observations(
        cam: &CameraIntrinsics,
        model: &ChessboardModel,
        poses: &[Isometry3<f64>],
    ) -> Vec<ChessboardObservation> {
        poses
            .iter()
            .map(|pose| {
                let pts =
                    project_points(cam, pose, LensMode::Distorted, model.points()).unwrap();
                ChessboardObservation::new(pts)
            })
            .collect()
    }

    fn paired_observations() -> (
        ChessboardModel,
        Vec<ChessboardObservation>,
        Vec<ChessboardObservation>,
    ) {
        let model = ChessboardGeometry::new(6, 5, 30.0).unwrap().model();
        let poses = board_poses();
        let rel = true_relative();
        let target_poses: Vec<Isometry3<f64>> = poses.iter().map(|p| rel * p).collect();

        let obs0 = observations(&reference_camera(), &model, &poses);
        let obsk = observations(&target_camera(), &model, &target_poses);
        (model, obs0, obsk)
    }

    #[test]
    fn recovers_known_relative_pose() {
        let (model, obs0, obsk) = paired_observations();
        let solve = StereoExtrinsicSolver::default()
            .solve(&reference_camera(), &target_camera(), &model, &obs0, &obsk)
            .unwrap();

        let truth = true_relative();
        assert_relative_eq!(
            solve.rotation,
            truth.rotation.to_rotation_matrix().into_inner(),
            epsilon = 1e-3
        );
        assert_relative_eq!(solve.translation, truth.translation.vector, epsilon = 1e-3);
        assert!(solve.rms < 0.01, "rms = {}", solve.rms);

        let m = solve.matrix();
        assert_eq!(m.row(3).into_owned(), Matrix4::identity().row(3).into_owned());
    }

    #[test]
    fn mismatched_sample_counts_are_rejected() {
        let (model, obs0, mut obsk) = paired_observations();
        obsk.pop();
        let err = StereoExtrinsicSolver::default()
            .solve(&reference_camera(), &target_camera(), &model, &obs0, &obsk)
            .unwrap_err();
        assert!(matches!(err, SolveError::SampleCountMismatch { .. }));
    }

    #[test]
    fn empty_accumulation_is_rejected() {
        let model = ChessboardGeometry::new(6, 5, 30.0).unwrap().model();
        let err = StereoExtrinsicSolver::default()
            .solve(&reference_camera(), &target_camera(), &model, &[], &[])
            .unwrap_err();
        assert!(matches!(err, SolveError::NoSamples));
    }

    #[test]
    fn uncalibrated_camera_blocks_the_solve() {
        let (model, obs0, obsk) = paired_observations();
        let mut target = target_camera();
        target.calibrated = false;
        let err = StereoExtrinsicSolver::default()
            .solve(&reference_camera(), &target, &model, &obs0, &obsk)
            .unwrap_err();
        assert!(matches!(err, SolveError::UncalibratedCamera { index: 1 }));
    }

    #[test]
    fn wrong_observation_length_is_rejected() {
        let (model, mut obs0, obsk) = paired_observations();
        let mut pts = obs0[1].points().to_vec();
        pts.pop();
        obs0[1] = ChessboardObservation::new(pts);
        let err = StereoExtrinsicSolver::default()
            .solve(&reference_camera(), &target_camera(), &model, &obs0, &obsk)
            .unwrap_err();
        assert!(matches!(
            err,
            SolveError::ObservationLengthMismatch { sample: 1, .. }
        ));
    }

    #[test]
    fn collinear_observations_are_flagged_with_indices() {
        let (model, obs0, mut obsk) = paired_observations();
        let line: Vec<Point2<f64>> = (0..model.len())
            .map(|i| Point2::new(100.0 + 3.0 * i as f64, 200.0))
            .collect();
        obsk[2] = ChessboardObservation::new(line);

        let err = StereoExtrinsicSolver::default()
            .solve(&reference_camera(), &target_camera(), &model, &obs0, &obsk)
            .unwrap_err();
        match err {
            SolveError::DegenerateConfiguration { camera, images } => {
                assert_eq!(camera, 1);
                assert_eq!(images, vec![2]);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
