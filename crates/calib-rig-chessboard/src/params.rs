use serde::{Deserialize, Serialize};

/// Tuning knobs for the corner detector.
///
/// The defaults are calibrated for well-lit boards filling a reasonable part
/// of the image; load overrides from JSON for unusual optics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Candidate threshold as a fraction of the strongest corner response.
    pub threshold_rel: f32,
    /// Minimum pixel distance kept between two accepted candidates.
    pub nms_radius: usize,
    /// Connected clusters of above-threshold pixels smaller than this are
    /// treated as noise.
    pub min_cluster_size: usize,
    /// Cap on candidates handed to grid ordering, strongest first.
    pub max_candidates: usize,
    /// Iteration cap for sub-pixel refinement.
    pub refine_iterations: usize,
    /// Refinement stops once the position update falls below this, in pixels.
    pub refine_eps: f64,
    /// How far (in grid units) a candidate may sit from an ideal lattice node
    /// and still be assigned to it.
    pub lattice_tolerance: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 4,
            min_cluster_size: 2,
            max_candidates: 256,
            refine_iterations: 10,
            refine_eps: 1e-3,
            lattice_tolerance: 0.25,
        }
    }
}
