//! End-to-end stereo calibration on synthetic projected observations.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Isometry3, Matrix4, Point2, Translation3, UnitQuaternion, Vector3};

use calib_rig_core::{
    project_points, CameraIntrinsics, ChessboardGeometry, ChessboardModel, ChessboardObservation,
    Frame, LensMode,
};
use calib_rig_pipeline::{CalibrationSession, CameraRig, RigEvent, RigObserver};

struct Recorder {
    events: Rc<RefCell<Vec<RigEvent>>>,
}

impl RigObserver for Recorder {
    fn on_event(&mut self, event: &RigEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

fn reference_camera() -> CameraIntrinsics {
    let mut cam = CameraIntrinsics::pinhole(800.0, 820.0, 320.0, 240.0, 640, 480);
    cam.distortion = [-0.1, 0.04, 0.0006, -0.0004, 0.0];
    cam
}

fn target_camera() -> CameraIntrinsics {
    let mut cam = CameraIntrinsics::pinhole(810.0, 790.0, 330.0, 235.0, 640, 480);
    cam.distortion = [0.07, -0.02, -0.0005, 0.001, 0.0];
    cam
}

fn known_relative() -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(-120.0, 8.0, 15.0),
        UnitQuaternion::from_scaled_axis(Vector3::new(0.03, -0.25, 0.04)),
    )
}

fn board_poses() -> Vec<Isometry3<f64>> {
    (0..8)
        .map(|i| {
            let k = i as f64;
            Isometry3::from_parts(
                Translation3::new(-90.0 + 6.0 * k, -60.0 + 4.0 * k, 600.0 + 25.0 * k),
                UnitQuaternion::from_scaled_axis(Vector3::new(
                    0.15 - 0.04 * k,
                    -0.2 + 0.05 * k,
                    0.02 * k,
                )),
            )
        })
        .collect()
}

fn observe(
    cam: &CameraIntrinsics,
    model: &ChessboardModel,
    pose: &Isometry3<f64>,
) -> ChessboardObservation {
    let pts = project_points(cam, pose, LensMode::Distorted, model.points()).unwrap();
    ChessboardObservation::new(pts)
}

fn dummy_frame(ts: f64) -> Frame {
    Frame::from_gray(2, 2, ts, vec![0; 4]).unwrap()
}

#[test]
fn accumulate_solve_and_verify() {
    let _ = env_logger::builder().is_test(true).try_init();
    let board = ChessboardGeometry::new(11, 8, 20.0).unwrap();
    let model = board.model();
    assert_eq!(model.len(), 70);

    let rig = CameraRig::new(vec![reference_camera(), target_camera()]);
    let mut session = CalibrationSession::new(rig, board);

    let events: Rc<RefCell<Vec<RigEvent>>> = Rc::default();
    session.subscribe(Box::new(Recorder {
        events: Rc::clone(&events),
    }));

    let relative = known_relative();
    for (i, pose) in board_poses().iter().enumerate() {
        let obs0 = observe(&reference_camera(), &model, pose);
        let obsk = observe(&target_camera(), &model, &(relative * pose));
        assert_eq!(obs0.len(), 70);
        session.record_sample(0, dummy_frame(i as f64), obs0);
        session.record_sample(1, dummy_frame(i as f64), obsk);
    }
    assert_eq!(session.samples(0), 8);
    assert_eq!(session.samples(1), 8);

    let solve = session.solve_extrinsic(1).unwrap();

    let m = solve.matrix();
    assert_eq!(
        m.row(3).into_owned(),
        Matrix4::<f64>::identity().row(3).into_owned()
    );
    assert!(solve.rms.is_finite());
    assert!(solve.rms < 0.1, "rms = {}", solve.rms);
    assert_relative_eq!(
        solve.rotation,
        relative.rotation.to_rotation_matrix().into_inner(),
        epsilon = 1e-3
    );
    assert_relative_eq!(
        solve.translation,
        relative.translation.vector,
        epsilon = 1e-3
    );
    assert_eq!(session.rig().extrinsic(1), Some(&m));

    let calibrated_events = events
        .borrow()
        .iter()
        .filter(|e| matches!(e, RigEvent::ExtrinsicCalibrated { camera: 1 }))
        .count();
    assert_eq!(calibrated_events, 1);

    // live verification with a fresh board pose
    let live = Isometry3::from_parts(
        Translation3::new(-70.0, -50.0, 640.0),
        UnitQuaternion::from_scaled_axis(Vector3::new(0.05, 0.1, -0.08)),
    );
    let obs0_live = observe(&reference_camera(), &model, &live);
    let obsk_live = observe(&target_camera(), &model, &(relative * live));

    let good = session
        .score_pair(1, &obs0_live, &obsk_live)
        .unwrap()
        .unwrap();
    assert!(good.rms.unwrap() < 0.5, "live rms = {:?}", good.rms);
    assert_eq!(good.reprojected.len(), 70);
    assert!(events
        .borrow()
        .iter()
        .any(|e| matches!(e, RigEvent::ErrorComputed(_))));

    // a board that moved between the two exposures scores badly
    let moved: Vec<Point2<f64>> = obsk_live
        .points()
        .iter()
        .map(|p| Point2::new(p.x + 8.0, p.y + 6.0))
        .collect();
    let bad = session
        .score_pair(1, &obs0_live, &ChessboardObservation::new(moved))
        .unwrap()
        .unwrap();
    assert!(bad.rms.unwrap() > 5.0, "moved rms = {:?}", bad.rms);
}

#[test]
fn resolving_after_more_samples_overwrites_the_extrinsic() {
    let board = ChessboardGeometry::new(6, 5, 30.0).unwrap();
    let model = board.model();
    let rig = CameraRig::new(vec![reference_camera(), target_camera()]);
    let mut session = CalibrationSession::new(rig, board);

    let relative = known_relative();
    for (i, pose) in board_poses().iter().take(4).enumerate() {
        session.record_sample(
            0,
            dummy_frame(i as f64),
            observe(&reference_camera(), &model, pose),
        );
        session.record_sample(
            1,
            dummy_frame(i as f64),
            observe(&target_camera(), &model, &(relative * pose)),
        );
    }
    let first = session.solve_extrinsic(1).unwrap();

    // keep accumulating, then re-solve
    for (i, pose) in board_poses().iter().skip(4).enumerate() {
        session.record_sample(
            0,
            dummy_frame(10.0 + i as f64),
            observe(&reference_camera(), &model, pose),
        );
        session.record_sample(
            1,
            dummy_frame(10.0 + i as f64),
            observe(&target_camera(), &model, &(relative * pose)),
        );
    }
    let second = session.solve_extrinsic(1).unwrap();

    assert_relative_eq!(first.translation, second.translation, epsilon = 1e-6);
    assert_eq!(session.rig().extrinsic(1), Some(&second.matrix()));
}
