//! Chessboard detection for camera calibration.
//!
//! The pipeline runs in four stages over an 8-bit frame:
//!
//! 1. [`corner_response`] scores every pixel with a ring-difference response
//!    that peaks on chessboard X-corners;
//! 2. [`find_candidates`] thresholds the map, prunes noise clusters and
//!    applies non-maximum suppression;
//! 3. [`refine_subpixel`] iterates a center-of-mass update for sub-pixel
//!    accuracy;
//! 4. [`order_grid`] assigns candidates to the internal corner lattice via a
//!    homography and emits them in canonical raster order.
//!
//! [`ChessboardDetector`] wires the stages together and is what callers
//! normally use; the stages stay public for tuning and inspection.

mod detect;
mod detector;
mod grid;
mod overlay;
mod params;
mod refine;
mod response;

pub use detect::{find_candidates, Corner};
pub use detector::ChessboardDetector;
pub use grid::order_grid;
pub use overlay::Overlay;
pub use params::DetectorParams;
pub use refine::refine_subpixel;
pub use response::{corner_response, ResponseMap, RING_RADIUS};
