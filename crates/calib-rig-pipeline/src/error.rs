use calib_rig_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("frame timestamp {pushed} does not advance past newest {newest}")]
    TimestampRegression { pushed: f64, newest: f64 },
    #[error("camera index {index} out of range for a rig of {cameras}")]
    CameraIndexOutOfRange { index: usize, cameras: usize },
}

/// Failures of the operator-triggered extrinsic solve. Prior rig state is
/// left untouched on any of these.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("camera index {index} out of range for a rig of {cameras}")]
    CameraIndexOutOfRange { index: usize, cameras: usize },
    #[error("camera 0 is the reference and cannot be solved against itself")]
    ReferenceCamera,
    #[error("paired sample counts differ ({reference} reference vs {target} target)")]
    SampleCountMismatch { reference: usize, target: usize },
    #[error("no calibration samples recorded")]
    NoSamples,
    #[error("sample {sample} has {actual} points, the board model has {expected}")]
    ObservationLengthMismatch {
        sample: usize,
        expected: usize,
        actual: usize,
    },
    #[error("camera {index} intrinsics are not calibrated")]
    UncalibratedCamera { index: usize },
    #[error("degenerate corner configuration, check image(s) {images:?} of camera {camera}")]
    DegenerateConfiguration { camera: usize, images: Vec<usize> },
    #[error(transparent)]
    Geometry(#[from] CoreError),
}

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("camera index {index} out of range for a rig of {cameras}")]
    CameraIndexOutOfRange { index: usize, cameras: usize },
    #[error("observation has {observation} points, the model has {model}")]
    LengthMismatch { model: usize, observation: usize },
    #[error("no extrinsic has been solved for camera {camera}")]
    MissingExtrinsic { camera: usize },
    #[error(transparent)]
    Geometry(#[from] CoreError),
}
