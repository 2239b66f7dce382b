//! Per-camera storage of calibration samples.

use calib_rig_core::{ChessboardObservation, Frame};
use log::debug;

/// One successfully detected sample: the frame snapshot it came from and the
/// ordered corner observation. Never mutated after creation.
#[derive(Clone, Debug)]
pub struct CalibrationRecord {
    pub frame: Frame,
    pub observation: ChessboardObservation,
}

/// Ordered per-camera lists of calibration records.
///
/// Append-only apart from [`clear`](Self::clear). Cross-camera consistency
/// (equal list lengths) is deliberately not checked here; that is the
/// solver's precondition.
#[derive(Clone, Debug)]
pub struct CalibrationPointAccumulator {
    records: Vec<Vec<CalibrationRecord>>,
}

impl CalibrationPointAccumulator {
    pub fn new(cameras: usize) -> Self {
        Self {
            records: vec![Vec::new(); cameras],
        }
    }

    pub fn cameras(&self) -> usize {
        self.records.len()
    }

    /// Append one record for `camera`. The index must be within the camera
    /// count the accumulator was built with.
    pub fn record(&mut self, camera: usize, frame: Frame, observation: ChessboardObservation) {
        debug!(
            "recording sample {} for camera {camera} ({} points)",
            self.records[camera].len(),
            observation.len()
        );
        self.records[camera].push(CalibrationRecord { frame, observation });
    }

    pub fn len(&self, camera: usize) -> usize {
        self.records[camera].len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(Vec::is_empty)
    }

    pub fn records(&self, camera: usize) -> &[CalibrationRecord] {
        &self.records[camera]
    }

    /// The per-camera observation sequence, in recording order.
    pub fn point_lists(&self, camera: usize) -> Vec<ChessboardObservation> {
        self.records[camera]
            .iter()
            .map(|r| r.observation.clone())
            .collect()
    }

    /// The per-camera frame snapshots, in recording order.
    pub fn images(&self, camera: usize) -> Vec<&Frame> {
        self.records[camera].iter().map(|r| &r.frame).collect()
    }

    /// Full session reset: every camera's list is emptied.
    pub fn clear(&mut self) {
        for list in &mut self.records {
            list.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn sample(n: usize) -> (Frame, ChessboardObservation) {
        let frame = Frame::from_gray(2, 2, n as f64, vec![0; 4]).unwrap();
        let obs = ChessboardObservation::new(vec![Point2::new(n as f64, 0.0)]);
        (frame, obs)
    }

    #[test]
    fn appends_in_call_order_and_clears() {
        let mut acc = CalibrationPointAccumulator::new(2);
        for n in 0..3 {
            let (f, o) = sample(n);
            acc.record(0, f, o);
        }
        let (f, o) = sample(9);
        acc.record(1, f, o);

        assert_eq!(acc.len(0), 3);
        assert_eq!(acc.len(1), 1);
        let lists = acc.point_lists(0);
        assert_eq!(lists[1].points()[0].x, 1.0);
        assert_eq!(acc.images(1)[0].timestamp(), 9.0);

        acc.clear();
        assert!(acc.is_empty());
        assert_eq!(acc.len(0), 0);
        assert_eq!(acc.len(1), 0);
    }
}
