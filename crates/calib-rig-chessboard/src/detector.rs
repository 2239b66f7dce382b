use log::debug;

use calib_rig_core::{ChessboardGeometry, ChessboardObservation, Frame};

use crate::detect::{find_candidates, Corner};
use crate::grid::order_grid;
use crate::overlay::Overlay;
use crate::params::DetectorParams;
use crate::refine::refine_subpixel;
use crate::response::corner_response;

/// Chessboard corner detector.
///
/// `detect` either yields every internal corner of the requested board in
/// raster order (top-left corner first, matching the board model) or nothing
/// at all. Partial boards are treated as not found. Detection is a pure
/// function of the frame and parameters, so repeated calls agree bit for bit.
pub struct ChessboardDetector {
    params: DetectorParams,
}

impl ChessboardDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn detect(
        &self,
        frame: &Frame,
        board: &ChessboardGeometry,
    ) -> Option<ChessboardObservation> {
        let map = corner_response(&frame.view());
        let candidates = find_candidates(&map, &self.params);
        debug!(
            "chessboard detect: {} candidates for a {}x{} corner grid",
            candidates.len(),
            board.inner_cols(),
            board.inner_rows()
        );

        let refined: Vec<Corner> = candidates
            .iter()
            .map(|c| {
                let (x, y) = refine_subpixel(
                    &map,
                    c.x,
                    c.y,
                    self.params.refine_iterations,
                    self.params.refine_eps,
                );
                Corner {
                    x,
                    y,
                    strength: c.strength,
                }
            })
            .collect();

        let ordered = order_grid(
            &refined,
            board.inner_cols(),
            board.inner_rows(),
            self.params.lattice_tolerance,
        )?;
        Some(ChessboardObservation::new(ordered))
    }

    /// Same as [`detect`](Self::detect), additionally returning an RGB
    /// overlay with the detection painted on top of the frame.
    pub fn detect_with_overlay(
        &self,
        frame: &Frame,
        board: &ChessboardGeometry,
    ) -> (Option<ChessboardObservation>, Overlay) {
        let detection = self.detect(frame, board);
        let mut overlay = Overlay::from_frame(frame);
        if let Some(obs) = &detection {
            overlay.draw_detection(obs.points());
        }
        (detection, overlay)
    }
}

impl Default for ChessboardDetector {
    fn default() -> Self {
        Self::new(DetectorParams::default())
    }
}
