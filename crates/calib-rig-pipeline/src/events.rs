//! Observer notifications.
//!
//! The pipeline reports progress through an explicit observer list rather
//! than any UI toolkit's signal mechanism. Observers run synchronously on
//! the calling thread, in subscription order.

use log::debug;

#[derive(Clone, Debug, PartialEq)]
pub enum RigEvent {
    /// A chessboard was found in this camera's frame of the current cycle.
    ChessboardDetected { camera: usize },
    /// No chessboard in this camera's frame of the current cycle.
    ChessboardNotDetected { camera: usize },
    /// A reprojection RMS error (pixels) was computed against a live frame.
    ErrorComputed(f64),
    /// The extrinsic for this camera was solved and installed. Emitted
    /// exactly once per successful solve, never on failure.
    ExtrinsicCalibrated { camera: usize },
}

pub trait RigObserver {
    fn on_event(&mut self, event: &RigEvent);
}

#[derive(Default)]
pub struct Notifier {
    observers: Vec<Box<dyn RigObserver>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn RigObserver>) {
        self.observers.push(observer);
    }

    pub fn notify(&mut self, event: RigEvent) {
        debug!("event: {event:?}");
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}
