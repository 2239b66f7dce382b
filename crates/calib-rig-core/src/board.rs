use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Physical description of the calibration target.
///
/// `cols` and `rows` count board squares, following the original preference
/// keys; the detectable internal corner grid is `(cols-1) × (rows-1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardGeometry {
    pub cols: u32,
    pub rows: u32,
    /// Side of one square, in physical units (typically millimetres).
    pub square_size: f64,
}

impl ChessboardGeometry {
    pub fn new(cols: u32, rows: u32, square_size: f64) -> Result<Self, CoreError> {
        if cols < 2 || rows < 2 || square_size <= 0.0 {
            return Err(CoreError::InvalidBoard {
                cols,
                rows,
                square_size,
            });
        }
        Ok(Self {
            cols,
            rows,
            square_size,
        })
    }

    /// Number of internal corners along x.
    #[inline]
    pub fn inner_cols(&self) -> usize {
        (self.cols - 1) as usize
    }

    /// Number of internal corners along y.
    #[inline]
    pub fn inner_rows(&self) -> usize {
        (self.rows - 1) as usize
    }

    /// Total internal corner count, `(cols-1) * (rows-1)`.
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.inner_cols() * self.inner_rows()
    }

    /// Generate the 3D board model: one point per internal corner, raster
    /// order (row-major), lying in the board plane Z = 0 and spaced by
    /// `square_size` along X and Y.
    pub fn model(&self) -> ChessboardModel {
        let mut points = Vec::with_capacity(self.corner_count());
        for y in 0..self.inner_rows() {
            for x in 0..self.inner_cols() {
                points.push(Point3::new(
                    x as f64 * self.square_size,
                    y as f64 * self.square_size,
                    0.0,
                ));
            }
        }
        ChessboardModel { points }
    }
}

/// The board's internal corners in board-local coordinates.
///
/// Immutable for the duration of a session; regenerated when the board
/// parameters change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardModel {
    points: Vec<Point3<f64>>,
}

impl ChessboardModel {
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// An all-or-nothing set of detected internal corners, raster order matching
/// the model. Detection failures are represented by absence, never by a
/// partial observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardObservation {
    points: Vec<Point2<f64>>,
}

impl ChessboardObservation {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
