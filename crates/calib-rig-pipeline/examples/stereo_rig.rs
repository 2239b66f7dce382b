//! Synthetic two-camera calibration run.
//!
//! Builds a stereo rig with a known relative pose, records projected board
//! observations, solves the extrinsic and verifies it against one live pair.
//!
//! Run with `cargo run --example stereo_rig`.

use log::LevelFilter;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use calib_rig_core::{
    init_with_level, project_points, CameraIntrinsics, ChessboardGeometry, ChessboardModel,
    ChessboardObservation, Frame, LensMode,
};
use calib_rig_pipeline::{CalibrationSession, CameraRig, RigEvent, RigObserver};

struct Printer;

impl RigObserver for Printer {
    fn on_event(&mut self, event: &RigEvent) {
        println!("event: {event:?}");
    }
}

fn observe(
    cam: &CameraIntrinsics,
    model: &ChessboardModel,
    pose: &Isometry3<f64>,
) -> ChessboardObservation {
    let pts = project_points(cam, pose, LensMode::Distorted, model.points())
        .expect("board pose in front of the camera");
    ChessboardObservation::new(pts)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Debug)?;

    let mut left = CameraIntrinsics::pinhole(800.0, 820.0, 320.0, 240.0, 640, 480);
    left.distortion = [-0.1, 0.04, 0.0006, -0.0004, 0.0];
    let mut right = CameraIntrinsics::pinhole(810.0, 790.0, 330.0, 235.0, 640, 480);
    right.distortion = [0.07, -0.02, -0.0005, 0.001, 0.0];

    let board = ChessboardGeometry::new(11, 8, 20.0)?;
    let model = board.model();

    let truth = Isometry3::from_parts(
        Translation3::new(-120.0, 8.0, 15.0),
        UnitQuaternion::from_scaled_axis(Vector3::new(0.03, -0.25, 0.04)),
    );

    let mut session = CalibrationSession::new(CameraRig::new(vec![left.clone(), right.clone()]), board);
    session.subscribe(Box::new(Printer));

    for i in 0..8 {
        let k = i as f64;
        let pose = Isometry3::from_parts(
            Translation3::new(-90.0 + 6.0 * k, -60.0 + 4.0 * k, 600.0 + 25.0 * k),
            UnitQuaternion::from_scaled_axis(Vector3::new(
                0.15 - 0.04 * k,
                -0.2 + 0.05 * k,
                0.02 * k,
            )),
        );
        let frame = Frame::from_gray(2, 2, k, vec![0; 4])?;
        session.record_sample(0, frame.clone(), observe(&left, &model, &pose));
        session.record_sample(1, frame, observe(&right, &model, &(truth * pose)));
    }

    let solve = session.solve_extrinsic(1)?;
    println!("{}", serde_json::to_string_pretty(&solve)?);
    println!(
        "truth translation {:?}, solved {:?}",
        truth.translation.vector, solve.translation
    );

    let live = Isometry3::from_parts(
        Translation3::new(-70.0, -50.0, 640.0),
        UnitQuaternion::from_scaled_axis(Vector3::new(0.05, 0.1, -0.08)),
    );
    let verified = session.score_pair(
        1,
        &observe(&left, &model, &live),
        &observe(&right, &model, &(truth * live)),
    )?;
    if let Some(result) = verified {
        println!("live verification rms: {:?} px", result.rms);
    }

    Ok(())
}
