//! The camera rig: ordered intrinsics plus solved extrinsic slots.

use calib_rig_core::CameraIntrinsics;
use nalgebra::{Isometry3, Matrix4, Rotation3, Translation3, UnitQuaternion};

/// A fixed set of cameras. Camera 0 is the reference frame; its extrinsic is
/// the identity. Every other camera starts unsolved and receives its 4x4
/// transform from the extrinsic solver.
#[derive(Clone, Debug)]
pub struct CameraRig {
    cameras: Vec<CameraIntrinsics>,
    extrinsics: Vec<Option<Matrix4<f64>>>,
}

impl CameraRig {
    pub fn new(cameras: Vec<CameraIntrinsics>) -> Self {
        let mut extrinsics = vec![None; cameras.len()];
        if let Some(first) = extrinsics.first_mut() {
            *first = Some(Matrix4::identity());
        }
        Self {
            cameras,
            extrinsics,
        }
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn camera(&self, index: usize) -> &CameraIntrinsics {
        &self.cameras[index]
    }

    pub fn cameras(&self) -> &[CameraIntrinsics] {
        &self.cameras
    }

    /// The solved transform mapping camera 0 coordinates to camera `index`,
    /// `None` until a solve succeeds.
    pub fn extrinsic(&self, index: usize) -> Option<&Matrix4<f64>> {
        self.extrinsics[index].as_ref()
    }

    /// Install (or overwrite) a solved extrinsic.
    pub fn set_extrinsic(&mut self, index: usize, transform: Matrix4<f64>) {
        self.extrinsics[index] = Some(transform);
    }
}

/// Interpret a `[R|t; 0 0 0 1]` matrix as a rigid transform. The rotation
/// block is re-orthonormalized, so mild numeric drift in a stored matrix is
/// absorbed.
pub fn isometry_from_matrix(m: &Matrix4<f64>) -> Isometry3<f64> {
    let r = m.fixed_view::<3, 3>(0, 0).into_owned();
    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&r));
    let translation = Translation3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    Isometry3::from_parts(translation, rotation)
}
