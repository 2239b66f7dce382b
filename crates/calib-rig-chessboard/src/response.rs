//! Ring-difference corner response.
//!
//! For every interior pixel, 16 intensity samples are taken on a radius-5
//! ring. At a chessboard X-corner diametrically opposed samples agree while
//! samples a quarter turn apart disagree, which the response rewards; straight
//! edges and flat regions score at or below zero.

use calib_rig_core::FrameView;

/// Ring radius, which also fixes the unusable image border.
pub const RING_RADIUS: usize = 5;

/// 16 sample offsets on the radius-5 ring, in circular order.
const RING: [(i32, i32); 16] = [
    (5, 0),
    (5, 2),
    (4, 4),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-4, 4),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-4, -4),
    (-2, -5),
    (0, -5),
    (2, -5),
    (4, -4),
    (5, -2),
];

const CENTER: [(i32, i32); 5] = [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)];

/// Dense per-pixel corner response for one frame.
#[derive(Clone, Debug)]
pub struct ResponseMap {
    pub width: usize,
    pub height: usize,
    data: Vec<f32>,
}

impl ResponseMap {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Bilinear sample, zero outside the map.
    pub fn sample(&self, x: f64, y: f64) -> f32 {
        if x < 0.0 || y < 0.0 {
            return 0.0;
        }
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        if x0 + 1 >= self.width || y0 + 1 >= self.height {
            return 0.0;
        }
        let fx = (x - x0 as f64) as f32;
        let fy = (y - y0 as f64) as f32;

        let p00 = self.at(x0, y0);
        let p10 = self.at(x0 + 1, y0);
        let p01 = self.at(x0, y0 + 1);
        let p11 = self.at(x0 + 1, y0 + 1);

        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        a + fy * (b - a)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::MIN, f32::max)
    }
}

#[inline]
fn pixel(src: &FrameView<'_>, x: usize, y: usize, dx: i32, dy: i32) -> f32 {
    let px = (x as i32 + dx) as usize;
    let py = (y as i32 + dy) as usize;
    f32::from(src.data[py * src.width + px])
}

/// Compute the corner response over the whole frame. Pixels closer than
/// [`RING_RADIUS`] to the border stay at zero.
pub fn corner_response(src: &FrameView<'_>) -> ResponseMap {
    let (w, h) = (src.width, src.height);
    let mut data = vec![0.0f32; w * h];

    if w > 2 * RING_RADIUS && h > 2 * RING_RADIUS {
        for y in RING_RADIUS..h - RING_RADIUS {
            for x in RING_RADIUS..w - RING_RADIUS {
                let mut s = [0.0f32; 16];
                for (i, (dx, dy)) in RING.iter().enumerate() {
                    s[i] = pixel(src, x, y, *dx, *dy);
                }

                let mut sum_resp = 0.0f32;
                let mut diff_resp = 0.0f32;
                let mut ring_sum = 0.0f32;
                for n in 0..8 {
                    sum_resp += (s[n] + s[n + 8] - s[n + 4] - s[(n + 12) % 16]).abs();
                    diff_resp += (s[n] - s[n + 8]).abs();
                }
                for v in &s {
                    ring_sum += v;
                }

                let mut local = 0.0f32;
                for (dx, dy) in &CENTER {
                    local += pixel(src, x, y, *dx, *dy);
                }
                let mean_resp = (ring_sum - 16.0 * local / 5.0).abs();

                data[y * w + x] = sum_resp - diff_resp - mean_resp;
            }
        }
    }

    ResponseMap {
        width: w,
        height: h,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_rig_core::Frame;

    /// Quadrant pattern with an X-corner in the middle of a 32x32 tile.
    fn corner_frame() -> Frame {
        let (w, h) = (32, 32);
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let dark = (x < 16) ^ (y < 16);
                data[y * w + x] = if dark { 20 } else { 230 };
            }
        }
        Frame::from_gray(w, h, 0.0, data).unwrap()
    }

    #[test]
    fn corner_outscores_edge_and_flat() {
        let frame = corner_frame();
        let map = corner_response(&frame.view());

        let at_corner = map.at(16, 16);
        let on_edge = map.at(16, 8);
        let flat = map.at(8, 8);

        assert!(at_corner > 0.0);
        assert!(at_corner > 10.0 * on_edge.max(1.0));
        assert!(flat.abs() < 1e-3);
    }

    #[test]
    fn border_stays_zero() {
        let frame = corner_frame();
        let map = corner_response(&frame.view());
        for x in 0..map.width {
            assert_eq!(map.at(x, 0), 0.0);
            assert_eq!(map.at(x, RING_RADIUS - 1), 0.0);
        }
    }
}
