//! Debug overlay rendering.
//!
//! Optional side channel for inspecting detections: the source frame expanded
//! to RGB with crosses on the detected corners and a polyline tracing the
//! raster order.

use calib_rig_core::Frame;
use nalgebra::Point2;

pub const CORNER_COLOR: [u8; 3] = [0, 220, 40];
pub const TRACE_COLOR: [u8; 3] = [230, 60, 60];

/// An RGB image the caller may hand to whatever display layer it uses.
#[derive(Clone, Debug)]
pub struct Overlay {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Overlay {
    /// Gray frame replicated into the three channels.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut data = Vec::with_capacity(frame.width() * frame.height() * 3);
        for &v in frame.data() {
            data.extend_from_slice(&[v, v, v]);
        }
        Self {
            width: frame.width(),
            height: frame.height(),
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Interleaved RGB, row-major.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn put(&mut self, x: i64, y: i64, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&color);
    }

    pub fn draw_cross(&mut self, p: Point2<f64>, arm: i64, color: [u8; 3]) {
        let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
        for d in -arm..=arm {
            self.put(cx + d, cy, color);
            self.put(cx, cy + d, color);
        }
    }

    pub fn draw_segment(&mut self, a: Point2<f64>, b: Point2<f64>, color: [u8; 3]) {
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil() as usize;
        for s in 0..=steps.max(1) {
            let t = s as f64 / steps.max(1) as f64;
            let x = a.x + t * (b.x - a.x);
            let y = a.y + t * (b.y - a.y);
            self.put(x.round() as i64, y.round() as i64, color);
        }
    }

    /// Crosses on every corner plus a polyline through the raster order.
    pub fn draw_detection(&mut self, corners: &[Point2<f64>]) {
        for pair in corners.windows(2) {
            self.draw_segment(pair[0], pair[1], TRACE_COLOR);
        }
        for p in corners {
            self.draw_cross(*p, 3, CORNER_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_is_clipped_at_borders() {
        let frame = Frame::from_gray(8, 8, 0.0, vec![0; 64]).unwrap();
        let mut overlay = Overlay::from_frame(&frame);
        overlay.draw_cross(Point2::new(0.0, 0.0), 3, CORNER_COLOR);

        assert_eq!(&overlay.data()[0..3], &CORNER_COLOR);
        assert_eq!(overlay.data().len(), 8 * 8 * 3);
    }
}
