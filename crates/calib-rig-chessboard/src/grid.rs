//! Lattice ordering of corner candidates.
//!
//! Candidates are mapped into board units through a homography spanned by the
//! four outermost corners, snapped to the nearest lattice node and emitted in
//! raster order. The board plane guarantees an exact projective relation, so
//! four well-placed extremes determine the mapping for every interior corner.

use log::debug;
use nalgebra::Point2;

use calib_rig_core::dlt_homography;

use crate::detect::Corner;

/// Assign candidates to a `inner_cols x inner_rows` lattice and return the
/// corner positions in raster order, top-left first.
///
/// Returns `None` when the candidates do not cover every lattice node, when
/// the outer corners are degenerate, or when either axis has fewer than two
/// internal corners (a single corner is passed through as-is).
pub fn order_grid(
    corners: &[Corner],
    inner_cols: usize,
    inner_rows: usize,
    lattice_tolerance: f64,
) -> Option<Vec<Point2<f64>>> {
    let cells = inner_cols * inner_rows;
    if corners.len() < cells || cells == 0 {
        debug!(
            "grid ordering: {} candidates for {} lattice nodes",
            corners.len(),
            cells
        );
        return None;
    }
    if cells == 1 {
        let best = corners
            .iter()
            .max_by(|a, b| a.strength.total_cmp(&b.strength))?;
        return Some(vec![Point2::new(best.x, best.y)]);
    }
    if inner_cols < 2 || inner_rows < 2 {
        debug!("grid ordering: single-line lattices are not supported");
        return None;
    }

    // T-junctions along the board boundary respond weaker than true
    // X-corners, so the extremes are taken over the strongest `cells`
    // candidates only.
    let mut ranked: Vec<Corner> = corners.to_vec();
    ranked.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    let (tl, tr, br, bl) = outer_corners(&ranked[..cells])?;

    let world = [
        Point2::new(0.0, 0.0),
        Point2::new((inner_cols - 1) as f64, 0.0),
        Point2::new((inner_cols - 1) as f64, (inner_rows - 1) as f64),
        Point2::new(0.0, (inner_rows - 1) as f64),
    ];
    let image = [tl, tr, br, bl];
    let homography = dlt_homography(&world, &image).ok()?;
    let to_lattice = homography.inverse()?;

    // strongest candidate wins each lattice node
    let mut nodes: Vec<Option<(f32, Point2<f64>)>> = vec![None; cells];
    for c in corners {
        let g = to_lattice.apply(Point2::new(c.x, c.y));
        let i = g.x.round();
        let j = g.y.round();
        if (g.x - i).abs() > lattice_tolerance || (g.y - j).abs() > lattice_tolerance {
            continue;
        }
        if i < 0.0 || j < 0.0 || i >= inner_cols as f64 || j >= inner_rows as f64 {
            continue;
        }
        let idx = j as usize * inner_cols + i as usize;
        let replace = match nodes[idx] {
            Some((strength, _)) => c.strength > strength,
            None => true,
        };
        if replace {
            nodes[idx] = Some((c.strength, Point2::new(c.x, c.y)));
        }
    }

    let filled = nodes.iter().filter(|n| n.is_some()).count();
    if filled < cells {
        debug!("grid ordering: only {filled}/{cells} lattice nodes filled");
        return None;
    }

    nodes.into_iter().map(|n| n.map(|(_, p)| p)).collect()
}

/// Pick the four outermost candidates (top-left, top-right, bottom-right,
/// bottom-left by image axes). `None` when they are not four distinct points.
fn outer_corners(
    corners: &[Corner],
) -> Option<(Point2<f64>, Point2<f64>, Point2<f64>, Point2<f64>)> {
    let mut tl = 0usize;
    let mut tr = 0usize;
    let mut br = 0usize;
    let mut bl = 0usize;
    for (i, c) in corners.iter().enumerate() {
        if c.x + c.y < corners[tl].x + corners[tl].y {
            tl = i;
        }
        if c.x - c.y > corners[tr].x - corners[tr].y {
            tr = i;
        }
        if c.x + c.y > corners[br].x + corners[br].y {
            br = i;
        }
        if c.x - c.y < corners[bl].x - corners[bl].y {
            bl = i;
        }
    }

    let ids = [tl, tr, br, bl];
    for a in 0..4 {
        for b in a + 1..4 {
            if ids[a] == ids[b] {
                debug!("grid ordering: degenerate outer corners");
                return None;
            }
        }
    }

    let p = |i: usize| Point2::new(corners[i].x, corners[i].y);
    Some((p(tl), p(tr), p(br), p(bl)))
}
