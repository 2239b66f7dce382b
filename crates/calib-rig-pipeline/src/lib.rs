//! Multi-camera chessboard-calibration pipeline.
//!
//! Frames flow from per-camera [`FrameTimeline`]s through the
//! [`FrameSynchronizer`], which picks one common instant per cycle. Each
//! synchronized frame goes through chessboard detection; when every camera
//! sees the board the paired sample lands in the
//! [`CalibrationPointAccumulator`]. An operator-triggered
//! [`StereoExtrinsicSolver`] run turns the accumulated pairs into the rigid
//! transform between two cameras, installed into the [`CameraRig`], and the
//! [`ReprojectionScorer`] verifies it continuously against live frames.
//! [`CalibrationSession`] drives the whole cycle; progress is reported
//! through [`RigObserver`] notifications.
//!
//! Everything runs single-threaded on the caller's loop. Detection misses
//! and stalled streams are routine (`Option`), operator mistakes are errors.

mod accumulator;
mod error;
mod events;
mod rig;
mod scorer;
mod session;
mod solver;
mod sync;
mod timeline;

pub use accumulator::{CalibrationPointAccumulator, CalibrationRecord};
pub use error::{ScoreError, SolveError, TimelineError};
pub use events::{Notifier, RigEvent, RigObserver};
pub use rig::{isometry_from_matrix, CameraRig};
pub use scorer::{ReprojectionResult, ReprojectionScorer};
pub use session::{CalibrationSession, TickOutcome};
pub use solver::{board_pose, ExtrinsicSolve, StereoExtrinsicSolver};
pub use sync::{FrameSynchronizer, SyncCohort};
pub use timeline::{Direction, FrameTimeline};
