//! Core primitives for the multi-camera chessboard-calibration pipeline.
//!
//! This crate is intentionally small and purely geometric: timestamped
//! intensity frames, camera intrinsics with radial-tangential distortion,
//! the chessboard model, projection/undistortion math and the normalized
//! DLT homography. It knows nothing about timelines, detection or solving.

mod board;
mod camera;
mod error;
mod homography;
mod image;
mod logger;
mod projection;

pub use board::{ChessboardGeometry, ChessboardModel, ChessboardObservation};
pub use camera::{CameraIntrinsics, Distortion};
pub use error::CoreError;
pub use homography::{dlt_homography, Homography};
pub use image::{Frame, FrameView};
pub use projection::{
    distort_normalized, project_point, project_points, rms_error, undistort_pixel, LensMode,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
