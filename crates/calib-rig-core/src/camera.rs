use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Radial-tangential distortion coefficients `[k1, k2, p1, p2, k3]`.
pub type Distortion = [f64; 5];

/// Intrinsic parameters of one camera in the rig.
///
/// Read-only input to the pipeline; the owning rig decides when a camera is
/// considered calibrated. An uncalibrated camera carries whatever default
/// values it was constructed with and is rejected by the extrinsic solver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
    pub distortion: Distortion,
    pub width: u32,
    pub height: u32,
    pub calibrated: bool,
}

impl CameraIntrinsics {
    /// A pinhole camera without distortion, flagged as calibrated.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
            distortion: [0.0; 5],
            width,
            height,
            calibrated: true,
        }
    }

    /// The 3×3 camera matrix K.
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Check focal lengths and principal point.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CoreError::FocalLengthMustBePositive);
        }
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(CoreError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_matrix_layout() {
        let cam = CameraIntrinsics::pinhole(800.0, 780.0, 320.0, 240.0, 640, 480);
        let k = cam.camera_matrix();
        assert_eq!(k[(0, 0)], 800.0);
        assert_eq!(k[(1, 1)], 780.0);
        assert_eq!(k[(0, 2)], 320.0);
        assert_eq!(k[(1, 2)], 240.0);
        assert_eq!(k[(2, 2)], 1.0);
    }

    #[test]
    fn validate_rejects_nonpositive_focal() {
        let mut cam = CameraIntrinsics::pinhole(800.0, 780.0, 320.0, 240.0, 640, 480);
        cam.fy = 0.0;
        assert!(matches!(
            cam.validate(),
            Err(CoreError::FocalLengthMustBePositive)
        ));
    }

    #[test]
    fn validate_rejects_nan_principal_point() {
        let mut cam = CameraIntrinsics::pinhole(800.0, 780.0, 320.0, 240.0, 640, 480);
        cam.cx = f64::NAN;
        assert!(matches!(
            cam.validate(),
            Err(CoreError::PrincipalPointMustBeFinite)
        ));
    }
}
