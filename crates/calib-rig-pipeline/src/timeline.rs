//! Per-camera frame timeline.
//!
//! An append-only, timestamp-indexed buffer of decoded frames. Pushes must
//! advance time; the buffer holds at most `capacity` frames and evicts the
//! oldest on overflow, so queries always see the most recent window of the
//! stream.

use std::collections::VecDeque;

use calib_rig_core::Frame;
use log::trace;

use crate::error::TimelineError;

/// Search direction for [`FrameTimeline::closest_frame`].
///
/// On an exact distance tie `Both` resolves toward the past.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames at or before the query timestamp.
    Past,
    /// Frames at or after the query timestamp.
    Future,
    /// Nearest frame on either side.
    Both,
}

#[derive(Clone, Debug)]
pub struct FrameTimeline {
    capacity: usize,
    frames: VecDeque<Frame>,
}

impl FrameTimeline {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            frames: VecDeque::new(),
        }
    }

    /// Append a frame. Its timestamp must be strictly greater than the
    /// newest one already stored; the oldest frame is evicted when the
    /// buffer is full.
    pub fn push(&mut self, frame: Frame) -> Result<(), TimelineError> {
        if let Some(newest) = self.newest_timestamp() {
            if frame.timestamp() <= newest {
                return Err(TimelineError::TimestampRegression {
                    pushed: frame.timestamp(),
                    newest,
                });
            }
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        trace!("timeline push at {}", frame.timestamp());
        self.frames.push_back(frame);
        Ok(())
    }

    pub fn newest_timestamp(&self) -> Option<f64> {
        self.frames.back().map(Frame::timestamp)
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.frames.front().map(Frame::timestamp)
    }

    /// The frame closest to `timestamp` in the given direction, by absolute
    /// time difference. An exactly matching frame wins in every direction.
    pub fn closest_frame(&self, timestamp: f64, direction: Direction) -> Option<&Frame> {
        // first index with a timestamp beyond the query
        let split = self.frames.partition_point(|f| f.timestamp() <= timestamp);
        let past = split.checked_sub(1).and_then(|i| self.frames.get(i));
        let future = self.frames.get(split);

        if let Some(frame) = past {
            if frame.timestamp() == timestamp {
                return Some(frame);
            }
        }

        match direction {
            Direction::Past => past,
            Direction::Future => future,
            Direction::Both => match (past, future) {
                (Some(p), Some(f)) => {
                    let dp = timestamp - p.timestamp();
                    let df = f.timestamp() - timestamp;
                    // tie resolves toward the past
                    if dp <= df {
                        Some(p)
                    } else {
                        Some(f)
                    }
                }
                (p, f) => p.or(f),
            },
        }
    }

    /// Exact-timestamp lookup.
    pub fn frame(&self, timestamp: f64) -> Option<&Frame> {
        self.closest_frame(timestamp, Direction::Past)
            .filter(|f| f.timestamp() == timestamp)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
