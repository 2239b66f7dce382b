/// Errors raised by the core primitives.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("pixel buffer length {actual} does not match expected {expected}")]
    PixelLayout { expected: usize, actual: usize },
    #[error("invalid board geometry: {cols}x{rows} squares, square size {square_size}")]
    InvalidBoard {
        cols: u32,
        rows: u32,
        square_size: f64,
    },
    #[error("focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("point is at the camera center")]
    PointAtCameraCenter,
    #[error("point set lengths differ ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("singular Jacobian during undistortion")]
    SingularJacobian,
    #[error("iteration did not converge after {iterations} iterations")]
    DidNotConverge { iterations: u32 },
    #[error("svd failed")]
    SvdFailed,
}
