//! Candidate extraction from the response map: thresholding, connected
//! clusters and non-maximum suppression.

use crate::params::DetectorParams;
use crate::response::ResponseMap;

/// A corner candidate in pixel coordinates with its response strength.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    pub x: f64,
    pub y: f64,
    pub strength: f32,
}

/// Extract corner candidates from the response map.
///
/// Above-threshold pixels are grouped into 4-connected clusters; clusters
/// below `min_cluster_size` are dropped as noise, each surviving cluster is
/// represented by its peak pixel, and NMS keeps only the strongest candidate
/// within `nms_radius`. The result is sorted strongest first and is fully
/// deterministic for a given map.
pub fn find_candidates(map: &ResponseMap, params: &DetectorParams) -> Vec<Corner> {
    let max = map.max_value();
    if max <= 0.0 {
        return Vec::new();
    }
    let threshold = params.threshold_rel * max;

    let (w, h) = (map.width, map.height);
    let mut visited = vec![false; w * h];
    let mut candidates = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if visited[idx] || map.at(x, y) < threshold {
                continue;
            }

            // flood-fill one cluster, tracking its peak
            let mut size = 0usize;
            let mut peak = (x, y, map.at(x, y));
            stack.push((x, y));
            visited[idx] = true;
            while let Some((cx, cy)) = stack.pop() {
                size += 1;
                let v = map.at(cx, cy);
                if v > peak.2 {
                    peak = (cx, cy, v);
                }
                let mut visit = |nx: usize, ny: usize| {
                    let nidx = ny * w + nx;
                    if !visited[nidx] && map.at(nx, ny) >= threshold {
                        visited[nidx] = true;
                        stack.push((nx, ny));
                    }
                };
                if cx > 0 {
                    visit(cx - 1, cy);
                }
                if cx + 1 < w {
                    visit(cx + 1, cy);
                }
                if cy > 0 {
                    visit(cx, cy - 1);
                }
                if cy + 1 < h {
                    visit(cx, cy + 1);
                }
            }

            if size >= params.min_cluster_size {
                candidates.push(Corner {
                    x: peak.0 as f64,
                    y: peak.1 as f64,
                    strength: peak.2,
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });

    let r2 = (params.nms_radius * params.nms_radius) as f64;
    let mut kept: Vec<Corner> = Vec::new();
    for c in candidates {
        let suppressed = kept
            .iter()
            .any(|k| (k.x - c.x).powi(2) + (k.y - c.y).powi(2) <= r2);
        if !suppressed {
            kept.push(c);
        }
        if kept.len() >= params.max_candidates {
            break;
        }
    }

    kept
}
