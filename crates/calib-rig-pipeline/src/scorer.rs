//! Continuous reprojection-error verification.

use log::debug;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use calib_rig_core::{
    project_points, rms_error, CameraIntrinsics, ChessboardModel, ChessboardObservation, LensMode,
};

use crate::error::ScoreError;
use crate::rig::isometry_from_matrix;

/// Outcome of scoring one live observation against the solved extrinsic.
///
/// `rms` stays `None` when the camera's intrinsics are not calibrated: the
/// reprojected points are still produced so a caller can draw them, but the
/// numeric figure would be meaningless.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReprojectionResult {
    pub rms: Option<f64>,
    pub reprojected: Vec<nalgebra::Point2<f64>>,
}

/// Projects the board model through a solved transform and compares it with
/// a freshly detected observation. The lens mode may be toggled live to
/// match whether the incoming detections are on distorted or pre-undistorted
/// frames.
#[derive(Clone, Debug)]
pub struct ReprojectionScorer {
    mode: LensMode,
}

impl ReprojectionScorer {
    pub fn new(mode: LensMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LensMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LensMode) {
        self.mode = mode;
    }

    /// Score one observation. An empty observation is a routine "nothing to
    /// verify" case and yields `Ok(None)`; a length mismatch between model
    /// and observation is an error.
    pub fn score(
        &self,
        model: &ChessboardModel,
        observation: &ChessboardObservation,
        transform: &Matrix4<f64>,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Option<ReprojectionResult>, ScoreError> {
        if observation.is_empty() {
            return Ok(None);
        }
        if observation.len() != model.len() {
            return Err(ScoreError::LengthMismatch {
                model: model.len(),
                observation: observation.len(),
            });
        }

        let pose = isometry_from_matrix(transform);
        let reprojected = project_points(intrinsics, &pose, self.mode, model.points())?;

        let rms = if intrinsics.calibrated {
            let value = rms_error(observation.points(), &reprojected)?;
            debug!("reprojection rms {value:.4} px over {} points", model.len());
            Some(value)
        } else {
            debug!("intrinsics not calibrated, skipping rms");
            None
        };

        Ok(Some(ReprojectionResult { rms, reprojected }))
    }
}

impl Default for ReprojectionScorer {
    fn default() -> Self {
        Self::new(LensMode::Distorted)
    }
}
