//! Sub-pixel corner refinement.
//!
//! Iterated center of mass of the positive response inside a fixed 5x5
//! window. The window follows the estimate between iterations, so the
//! result settles on the response ridge rather than the integer peak.

use crate::response::ResponseMap;

const WINDOW_HALF: i32 = 2;

/// Refine a corner position on the response map.
///
/// Runs at most `max_iterations` passes and stops early once the update is
/// below `eps` pixels. Positions whose window holds no positive response are
/// returned unchanged.
pub fn refine_subpixel(
    map: &ResponseMap,
    x: f64,
    y: f64,
    max_iterations: usize,
    eps: f64,
) -> (f64, f64) {
    let mut cx = x;
    let mut cy = y;

    for _ in 0..max_iterations {
        let mut wsum = 0.0f64;
        let mut sx = 0.0f64;
        let mut sy = 0.0f64;
        for dy in -WINDOW_HALF..=WINDOW_HALF {
            for dx in -WINDOW_HALF..=WINDOW_HALF {
                let px = cx + f64::from(dx);
                let py = cy + f64::from(dy);
                let w = f64::from(map.sample(px, py).max(0.0));
                wsum += w;
                sx += w * px;
                sy += w * py;
            }
        }
        if wsum <= f64::EPSILON {
            break;
        }

        let nx = sx / wsum;
        let ny = sy / wsum;
        let shift = ((nx - cx).powi(2) + (ny - cy).powi(2)).sqrt();
        cx = nx;
        cy = ny;
        if shift < eps {
            break;
        }
    }

    (cx, cy)
}
