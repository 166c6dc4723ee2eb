//! Approximate transformation of two-dimensional paths.
//!
//! Each line or quadratic segment is mapped by transforming its end point and its point at `t = ½`.
//! The result is a straight line when the transformed mid point lies on the transformed chord,
//! and otherwise the quadratic curve through all three transformed points.

use crate::{MathTransform, Result, TransformError};

/// Mid point distance from the chord, relative to the chord length,
/// below which a segment stays straight.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo([f64; 2]),
    LineTo([f64; 2]),
    /// Control point, then end point.
    QuadTo([f64; 2], [f64; 2]),
    /// Straight line back to the start of the current sub-path.
    Close,
}

fn apply(t: &MathTransform, p: [f64; 2]) -> Result<[f64; 2]> {
    let (x, y) = t.eval_2d(p[0], p[1])?;
    Ok([x, y])
}

/// Segment from `start` to `end` through `mid`, all already transformed.
fn fit(start: [f64; 2], mid: [f64; 2], end: [f64; 2]) -> PathSegment {
    let chord = [end[0] - start[0], end[1] - start[1]];
    let offset = [mid[0] - start[0], mid[1] - start[1]];
    let cross = chord[0] * offset[1] - chord[1] * offset[0];
    let length_sq = chord[0] * chord[0] + chord[1] * chord[1];
    let straight = if length_sq == 0.0 {
        // closed segment: only straight if it never leaves its end point
        offset[0] == 0.0 && offset[1] == 0.0
    } else {
        cross.abs() <= COLLINEAR_TOLERANCE * length_sq
    };
    if straight {
        return PathSegment::LineTo(end);
    }
    let control = [
        2.0 * mid[0] - 0.5 * (start[0] + end[0]),
        2.0 * mid[1] - 0.5 * (start[1] + end[1]),
    ];
    PathSegment::QuadTo(control, end)
}

/// Transform a path with a two-dimensional transform.
///
/// Fails on the first point which cannot be transformed.
pub fn transform_path(t: &MathTransform, path: &[PathSegment]) -> Result<Vec<PathSegment>> {
    TransformError::check_dim(2, t.source_ndim())?;
    TransformError::check_dim(2, t.target_ndim())?;

    let mut out = Vec::with_capacity(path.len());
    // (source, transformed) of the current point and of the sub-path start
    let mut current: Option<([f64; 2], [f64; 2])> = None;
    let mut start = current;

    for segment in path {
        match *segment {
            PathSegment::MoveTo(p) => {
                let tp = apply(t, p)?;
                out.push(PathSegment::MoveTo(tp));
                current = Some((p, tp));
                start = current;
            }
            PathSegment::LineTo(p) => {
                let (from, t_from) = current.ok_or_else(no_move_to)?;
                let mid = [0.5 * (from[0] + p[0]), 0.5 * (from[1] + p[1])];
                let tp = apply(t, p)?;
                out.push(fit(t_from, apply(t, mid)?, tp));
                current = Some((p, tp));
            }
            PathSegment::QuadTo(c, p) => {
                let (from, t_from) = current.ok_or_else(no_move_to)?;
                let mid = [
                    0.25 * from[0] + 0.5 * c[0] + 0.25 * p[0],
                    0.25 * from[1] + 0.5 * c[1] + 0.25 * p[1],
                ];
                let tp = apply(t, p)?;
                out.push(fit(t_from, apply(t, mid)?, tp));
                current = Some((p, tp));
            }
            PathSegment::Close => {
                out.push(PathSegment::Close);
                current = start;
            }
        }
    }
    Ok(out)
}

fn no_move_to() -> TransformError {
    TransformError::InvalidParameter("path segment before the first MoveTo".into())
}
