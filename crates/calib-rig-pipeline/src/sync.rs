//! Temporal synchronization across camera streams.

use calib_rig_core::Frame;
use log::debug;

use crate::timeline::{Direction, FrameTimeline};

/// One frame per stream, all taken at the common timestamp.
#[derive(Clone, Debug)]
pub struct SyncCohort {
    pub timestamp: f64,
    pub frames: Vec<Frame>,
}

/// Picks a common instant across N timelines: the minimum of the per-stream
/// newest timestamps. A cohort is only produced when that instant advances
/// past the last successful one, so a stream that stalls pauses the whole
/// pipeline instead of producing duplicate cycles.
#[derive(Clone, Debug, Default)]
pub struct FrameSynchronizer {
    last_timestamp: Option<f64>,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to assemble a cohort. All-or-nothing: any empty timeline, or no
    /// forward progress since the last success, yields `None` and leaves the
    /// progress guard unchanged.
    pub fn synchronize(&mut self, timelines: &[&FrameTimeline]) -> Option<SyncCohort> {
        if timelines.is_empty() {
            return None;
        }

        let mut common = f64::INFINITY;
        for tl in timelines {
            common = common.min(tl.newest_timestamp()?);
        }

        if let Some(last) = self.last_timestamp {
            if common <= last {
                return None;
            }
        }

        let mut frames = Vec::with_capacity(timelines.len());
        for tl in timelines {
            frames.push(tl.closest_frame(common, Direction::Both)?.clone());
        }

        debug!("synchronized {} streams at {}", frames.len(), common);
        self.last_timestamp = Some(common);
        Some(SyncCohort {
            timestamp: common,
            frames,
        })
    }

    /// Timestamp of the last successful cohort.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Forget the progress guard, e.g. after the timelines were cleared.
    pub fn reset(&mut self) {
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_at(ts: f64) -> Frame {
        Frame::from_gray(2, 2, ts, vec![0; 4]).unwrap()
    }

    fn timeline_with(stamps: &[f64]) -> FrameTimeline {
        let mut tl = FrameTimeline::new(16);
        for &ts in stamps {
            tl.push(frame_at(ts)).unwrap();
        }
        tl
    }

    #[test]
    fn picks_min_of_newest_and_nearest_frames() {
        let a = timeline_with(&[1.0, 2.0, 3.0]);
        let b = timeline_with(&[1.1, 1.9]);
        let mut sync = FrameSynchronizer::new();

        let cohort = sync.synchronize(&[&a, &b]).unwrap();
        assert_eq!(cohort.timestamp, 1.9);
        assert_eq!(cohort.frames[0].timestamp(), 2.0);
        assert_eq!(cohort.frames[1].timestamp(), 1.9);
    }

    #[test]
    fn timestamps_strictly_increase_across_successes() {
        let mut a = timeline_with(&[1.0]);
        let mut b = timeline_with(&[1.0]);
        let mut sync = FrameSynchronizer::new();

        assert_eq!(sync.synchronize(&[&a, &b]).unwrap().timestamp, 1.0);
        // no new frames: same instant is not reprocessed
        assert!(sync.synchronize(&[&a, &b]).is_none());

        a.push(frame_at(2.0)).unwrap();
        // only one stream advanced: common timestamp is still 1.0
        assert!(sync.synchronize(&[&a, &b]).is_none());

        b.push(frame_at(2.2)).unwrap();
        assert_eq!(sync.synchronize(&[&a, &b]).unwrap().timestamp, 2.0);
    }

    #[test]
    fn empty_timeline_blocks_the_cohort() {
        let a = timeline_with(&[1.0]);
        let b = FrameTimeline::new(16);
        let mut sync = FrameSynchronizer::new();
        assert!(sync.synchronize(&[&a, &b]).is_none());
        assert_eq!(sync.last_timestamp(), None);
    }

    #[test]
    fn reset_allows_time_to_restart() {
        let a = timeline_with(&[5.0]);
        let mut sync = FrameSynchronizer::new();
        sync.synchronize(&[&a]).unwrap();

        let earlier = timeline_with(&[1.0]);
        assert!(sync.synchronize(&[&earlier]).is_none());
        sync.reset();
        assert_eq!(sync.synchronize(&[&earlier]).unwrap().timestamp, 1.0);
    }
}
