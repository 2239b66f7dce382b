//! Session tick flow with rendered chessboard frames: synchronization,
//! detection notifications, recording and reset.

use std::cell::RefCell;
use std::rc::Rc;

use calib_rig_core::{CameraIntrinsics, ChessboardGeometry, Frame};
use calib_rig_pipeline::{CalibrationSession, CameraRig, RigEvent, RigObserver};

struct Recorder {
    events: Rc<RefCell<Vec<RigEvent>>>,
}

impl RigObserver for Recorder {
    fn on_event(&mut self, event: &RigEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

const COLS: usize = 5;
const ROWS: usize = 4;
const SQUARE: usize = 24;
const MARGIN: usize = 20;

fn board_frame(ts: f64) -> Frame {
    let w = 2 * MARGIN + COLS * SQUARE;
    let h = 2 * MARGIN + ROWS * SQUARE;
    let mut data = vec![230u8; w * h];
    for y in 0..ROWS * SQUARE {
        for x in 0..COLS * SQUARE {
            if (x / SQUARE + y / SQUARE) % 2 == 0 {
                data[(y + MARGIN) * w + x + MARGIN] = 20;
            }
        }
    }
    Frame::from_gray(w, h, ts, data).unwrap()
}

fn blank_frame(ts: f64) -> Frame {
    Frame::from_gray(160, 136, ts, vec![128; 160 * 136]).unwrap()
}

fn session() -> (CalibrationSession, Rc<RefCell<Vec<RigEvent>>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let cam = CameraIntrinsics::pinhole(700.0, 700.0, 80.0, 68.0, 160, 136);
    let rig = CameraRig::new(vec![cam.clone(), cam]);
    let board = ChessboardGeometry::new(COLS as u32, ROWS as u32, 10.0).unwrap();

    let mut session = CalibrationSession::new(rig, board);
    let events: Rc<RefCell<Vec<RigEvent>>> = Rc::default();
    session.subscribe(Box::new(Recorder {
        events: Rc::clone(&events),
    }));
    (session, events)
}

#[test]
fn tick_synchronizes_detects_and_records() {
    let (mut session, events) = session();

    session.push_frame(0, board_frame(100.0)).unwrap();
    session.push_frame(1, board_frame(100.5)).unwrap();

    let outcome = session.tick().unwrap();
    assert_eq!(outcome.timestamp, 100.0);
    assert_eq!(outcome.detected, vec![true, true]);
    assert!(outcome.recorded);
    assert_eq!(session.samples(0), 1);
    assert_eq!(session.samples(1), 1);

    let detected = events
        .borrow()
        .iter()
        .filter(|e| matches!(e, RigEvent::ChessboardDetected { .. }))
        .count();
    assert_eq!(detected, 2);

    // recorded observations carry the full corner grid
    let expected = session.board().corner_count();
    assert_eq!(session.accumulator().records(0)[0].observation.len(), expected);
}

#[test]
fn tick_without_progress_yields_nothing() {
    let (mut session, _) = session();
    session.push_frame(0, board_frame(10.0)).unwrap();
    session.push_frame(1, board_frame(10.0)).unwrap();

    assert!(session.tick().is_some());
    // no new frames arrived: the same instant is not processed twice
    assert!(session.tick().is_none());
    assert_eq!(session.samples(0), 1);
}

#[test]
fn incomplete_detection_records_nothing() {
    let (mut session, events) = session();
    session.push_frame(0, board_frame(5.0)).unwrap();
    session.push_frame(1, blank_frame(5.0)).unwrap();

    let outcome = session.tick().unwrap();
    assert_eq!(outcome.detected, vec![true, false]);
    assert!(!outcome.recorded);
    assert_eq!(session.samples(0), 0);
    assert_eq!(session.samples(1), 0);

    assert!(events
        .borrow()
        .iter()
        .any(|e| matches!(e, RigEvent::ChessboardNotDetected { camera: 1 })));
}

#[test]
fn clear_resets_samples_and_lets_time_restart() {
    let (mut session, _) = session();
    session.push_frame(0, board_frame(50.0)).unwrap();
    session.push_frame(1, board_frame(50.0)).unwrap();
    assert!(session.tick().is_some());
    assert_eq!(session.samples(0), 1);

    session.clear();
    assert_eq!(session.samples(0), 0);

    // timelines and the progress guard restarted
    session.push_frame(0, board_frame(1.0)).unwrap();
    session.push_frame(1, board_frame(1.0)).unwrap();
    let outcome = session.tick().unwrap();
    assert_eq!(outcome.timestamp, 1.0);
    assert!(outcome.recorded);
}
