//! The calibration session: the tick-driven driver tying the pipeline
//! together.
//!
//! One `tick` runs synchronize, then detection per stream, then records a
//! paired sample when every camera saw the board. The operator actions
//! (`solve_extrinsic`, `clear`, `update_board`) are explicit calls; nothing
//! here spawns threads, the host drives the session from its own loop.
//!
//! Informally the session moves through Idle, Accumulating, Solved and
//! Verifying. Recording more samples after a solve is allowed and simply
//! leaves the installed extrinsic stale until the next solve.

use log::{debug, info};

use calib_rig_chessboard::{ChessboardDetector, DetectorParams};
use calib_rig_core::{ChessboardGeometry, ChessboardModel, ChessboardObservation, Frame, LensMode};

use crate::accumulator::CalibrationPointAccumulator;
use crate::error::{ScoreError, SolveError, TimelineError};
use crate::events::{Notifier, RigEvent, RigObserver};
use crate::rig::{isometry_from_matrix, CameraRig};
use crate::scorer::{ReprojectionResult, ReprojectionScorer};
use crate::solver::{board_pose, ExtrinsicSolve, StereoExtrinsicSolver};
use crate::sync::FrameSynchronizer;
use crate::timeline::FrameTimeline;

const DEFAULT_TIMELINE_CAPACITY: usize = 32;

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutcome {
    pub timestamp: f64,
    /// Per-camera detection success for this cycle.
    pub detected: Vec<bool>,
    /// Whether a paired sample was recorded (all cameras detected).
    pub recorded: bool,
}

pub struct CalibrationSession {
    rig: CameraRig,
    board: ChessboardGeometry,
    model: ChessboardModel,
    detector: ChessboardDetector,
    timelines: Vec<FrameTimeline>,
    synchronizer: FrameSynchronizer,
    accumulator: CalibrationPointAccumulator,
    solver: StereoExtrinsicSolver,
    scorer: ReprojectionScorer,
    notifier: Notifier,
}

impl CalibrationSession {
    pub fn new(rig: CameraRig, board: ChessboardGeometry) -> Self {
        let cameras = rig.len();
        Self {
            model: board.model(),
            board,
            detector: ChessboardDetector::default(),
            timelines: (0..cameras)
                .map(|_| FrameTimeline::new(DEFAULT_TIMELINE_CAPACITY))
                .collect(),
            synchronizer: FrameSynchronizer::new(),
            accumulator: CalibrationPointAccumulator::new(cameras),
            solver: StereoExtrinsicSolver::default(),
            scorer: ReprojectionScorer::default(),
            notifier: Notifier::new(),
            rig,
        }
    }

    pub fn with_detector_params(mut self, params: DetectorParams) -> Self {
        self.detector = ChessboardDetector::new(params);
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn RigObserver>) {
        self.notifier.subscribe(observer);
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn board(&self) -> &ChessboardGeometry {
        &self.board
    }

    /// The current board model, e.g. for downstream visualization.
    pub fn model(&self) -> &ChessboardModel {
        &self.model
    }

    pub fn samples(&self, camera: usize) -> usize {
        self.accumulator.len(camera)
    }

    pub fn accumulator(&self) -> &CalibrationPointAccumulator {
        &self.accumulator
    }

    /// Switch the verification path between distorted and pinhole
    /// reprojection, effective from the next score.
    pub fn set_score_mode(&mut self, mode: LensMode) {
        self.scorer.set_mode(mode);
    }

    /// Feed a decoded frame into one camera's timeline.
    pub fn push_frame(&mut self, camera: usize, frame: Frame) -> Result<(), TimelineError> {
        let cameras = self.timelines.len();
        let Some(timeline) = self.timelines.get_mut(camera) else {
            return Err(TimelineError::CameraIndexOutOfRange {
                index: camera,
                cameras,
            });
        };
        timeline.push(frame)
    }

    /// Run one synchronization + detection cycle.
    ///
    /// `None` when no common timestamp progress was possible. A paired
    /// sample is recorded only when every camera detected the board in its
    /// synchronized frame; per-camera detection outcomes are always
    /// notified.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let timelines: Vec<&FrameTimeline> = self.timelines.iter().collect();
        let cohort = self.synchronizer.synchronize(&timelines)?;

        let mut detections = Vec::with_capacity(cohort.frames.len());
        for (camera, frame) in cohort.frames.iter().enumerate() {
            let observation = self.detector.detect(frame, &self.board);
            match &observation {
                Some(_) => self.notifier.notify(RigEvent::ChessboardDetected { camera }),
                None => self
                    .notifier
                    .notify(RigEvent::ChessboardNotDetected { camera }),
            }
            detections.push(observation);
        }

        let detected: Vec<bool> = detections.iter().map(Option::is_some).collect();
        let recorded = detected.iter().all(|d| *d);
        if recorded {
            for (camera, (frame, observation)) in cohort
                .frames
                .into_iter()
                .zip(detections.into_iter())
                .enumerate()
            {
                if let Some(observation) = observation {
                    self.accumulator.record(camera, frame, observation);
                }
            }
        } else {
            debug!("tick at {}: incomplete detection, nothing recorded", cohort.timestamp);
        }

        Some(TickOutcome {
            timestamp: cohort.timestamp,
            detected,
            recorded,
        })
    }

    /// Record an externally detected sample, for hosts that run their own
    /// detector instead of [`tick`](Self::tick). The camera index must be
    /// within the rig the session was built with.
    pub fn record_sample(
        &mut self,
        camera: usize,
        frame: Frame,
        observation: ChessboardObservation,
    ) {
        self.accumulator.record(camera, frame, observation);
    }

    /// Operator action: solve camera `camera` against the reference camera
    /// and install the result into the rig. Nothing is installed and no
    /// notification goes out on failure.
    pub fn solve_extrinsic(&mut self, camera: usize) -> Result<ExtrinsicSolve, SolveError> {
        if camera >= self.rig.len() {
            return Err(SolveError::CameraIndexOutOfRange {
                index: camera,
                cameras: self.rig.len(),
            });
        }
        if camera == 0 {
            return Err(SolveError::ReferenceCamera);
        }

        let reference_obs = self.accumulator.point_lists(0);
        let target_obs = self.accumulator.point_lists(camera);
        let solve = self.solver.solve(
            self.rig.camera(0),
            self.rig.camera(camera),
            &self.model,
            &reference_obs,
            &target_obs,
        )?;

        self.rig.set_extrinsic(camera, solve.matrix());
        self.notifier.notify(RigEvent::ExtrinsicCalibrated { camera });
        Ok(solve)
    }

    /// Verifying path: detect the board in a live frame pair and score the
    /// target camera against the solved extrinsic. `Ok(None)` when either
    /// camera does not see the board.
    pub fn verify(
        &mut self,
        camera: usize,
        reference_frame: &Frame,
        target_frame: &Frame,
    ) -> Result<Option<ReprojectionResult>, ScoreError> {
        let reference = self.detector.detect(reference_frame, &self.board);
        let target = self.detector.detect(target_frame, &self.board);
        match (reference, target) {
            (Some(reference), Some(target)) => self.score_pair(camera, &reference, &target),
            _ => {
                debug!("verify: board not visible in both cameras");
                Ok(None)
            }
        }
    }

    /// Score an externally detected observation pair against the solved
    /// extrinsic, notifying the RMS when one was computed.
    ///
    /// The reference observation places the board in camera 0; the board is
    /// then reprojected into the target camera through the extrinsic.
    pub fn score_pair(
        &mut self,
        camera: usize,
        reference_obs: &ChessboardObservation,
        target_obs: &ChessboardObservation,
    ) -> Result<Option<ReprojectionResult>, ScoreError> {
        if camera >= self.rig.len() {
            return Err(ScoreError::CameraIndexOutOfRange {
                index: camera,
                cameras: self.rig.len(),
            });
        }
        let Some(extrinsic) = self.rig.extrinsic(camera) else {
            return Err(ScoreError::MissingExtrinsic { camera });
        };
        let pose = board_pose(self.rig.camera(0), &self.model, reference_obs)?;
        let board_to_target = isometry_from_matrix(extrinsic) * pose;

        let result = self.scorer.score(
            &self.model,
            target_obs,
            &board_to_target.to_homogeneous(),
            self.rig.camera(camera),
        )?;
        if let Some(rms) = result.as_ref().and_then(|r| r.rms) {
            self.notifier.notify(RigEvent::ErrorComputed(rms));
        }
        Ok(result)
    }

    /// Full session reset: accumulated samples, timelines and the
    /// synchronization guard. Solved extrinsics stay installed.
    pub fn clear(&mut self) {
        self.accumulator.clear();
        self.synchronizer.reset();
        for timeline in &mut self.timelines {
            timeline.clear();
        }
        info!("session cleared");
    }

    /// Explicit board-parameter update. Regenerates the model and drops the
    /// accumulated samples, which described the old geometry.
    pub fn update_board(&mut self, board: ChessboardGeometry) {
        info!(
            "board updated to {}x{} squares, square size {}",
            board.cols, board.rows, board.square_size
        );
        self.board = board;
        self.model = board.model();
        self.accumulator.clear();
    }
}
