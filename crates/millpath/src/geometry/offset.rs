//! Miter offsetting of closed contours.
//!
//! Each vertex of the result is the intersection of the two neighbouring
//! edges after both have been shifted along their normals. This is not a
//! general polygon clipper: it reports failure instead of repairing a
//! contour that collapses or turns inside out.

use super::{signed_area2, AREA_EPSILON, COLLINEAR_EPSILON, POINT_EPSILON};
use crate::error::OffsetError;
use kurbo::{Point, Vec2};
use tracing::trace;

const CLEANUP_PASSES: usize = 3;
const PARALLEL_EPSILON: f64 = 1e-9;

/// Offset a closed contour by `distance`: positive moves every edge
/// inward, negative outward, whatever the contour's winding.
///
/// The input may or may not repeat its first point at the end. The result
/// keeps the input's winding and does not repeat its first point. Edges
/// that the offset turns around (a curve tighter than `distance`) are
/// dropped, so the result follows the remaining edges with a sharp corner.
pub fn offset_contour(contour: &[Point], distance: f64) -> Result<Vec<Point>, OffsetError> {
    let points = cleanup_contour(contour)?;

    let area = signed_area2(&points);
    if area.abs() < AREA_EPSILON {
        return Err(OffsetError::Collapsed { area });
    }
    let winding = area.signum();

    let n = points.len();
    let lines: Vec<OffsetLine> = (0..n)
        .map(|i| {
            let edge = points[(i + 1) % n] - points[i];
            let direction = edge / edge.hypot();
            // Left normal points into a counter-clockwise polygon.
            let normal = Vec2::new(-direction.y, direction.x) * winding;
            OffsetLine {
                origin: points[i] + normal * distance,
                direction,
            }
        })
        .collect();

    let mut active: Vec<usize> = (0..n).collect();
    let mut result = miter_vertices(&lines, &active);

    let result_area = signed_area2(&result);
    if result_area.abs() < AREA_EPSILON {
        return Err(OffsetError::Collapsed { area: result_area });
    }
    if result_area.signum() != winding {
        return Err(OffsetError::Inverted);
    }
    // A uniformly over-shrunk polygon is rotated, not mirrored, so its
    // area keeps its sign; its edges run backwards instead.
    let progress: f64 = edge_progress(&result, &lines, &active).iter().sum();
    if progress <= 0.0 {
        return Err(OffsetError::Inverted);
    }

    // Short edges whose offset runs backwards form swallowtails at tight
    // curves. Drop them one at a time and re-miter their neighbours.
    let mut removed = 0;
    loop {
        let worst = edge_progress(&result, &lines, &active)
            .into_iter()
            .enumerate()
            .filter(|(_, p)| *p < -POINT_EPSILON)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((k, _)) = worst else {
            break;
        };
        active.remove(k);
        removed += 1;
        if active.len() < 3 {
            return Err(OffsetError::Inverted);
        }
        result = miter_vertices(&lines, &active);
    }
    if removed > 0 {
        trace!(removed, remaining = active.len(), "offset swallowtails removed");
        let area = signed_area2(&result);
        if area.abs() < AREA_EPSILON {
            return Err(OffsetError::Collapsed { area });
        }
        if area.signum() != winding {
            return Err(OffsetError::Inverted);
        }
    }
    Ok(result)
}

/// An input edge shifted along its normal.
#[derive(Debug, Clone, Copy)]
struct OffsetLine {
    origin: Point,
    direction: Vec2,
}

/// Vertex `k` is where the line of the active edge before it meets the
/// line of active edge `k`.
fn miter_vertices(lines: &[OffsetLine], active: &[usize]) -> Vec<Point> {
    let m = active.len();
    (0..m)
        .map(|k| {
            let a = lines[active[(k + m - 1) % m]];
            let b = lines[active[k]];
            let denom = a.direction.cross(b.direction);
            if denom.abs() < PARALLEL_EPSILON {
                b.origin
            } else {
                let t = (b.origin - a.origin).cross(b.direction) / denom;
                a.origin + a.direction * t
            }
        })
        .collect()
}

/// Signed length of each result edge along its source edge direction.
fn edge_progress(result: &[Point], lines: &[OffsetLine], active: &[usize]) -> Vec<f64> {
    let m = active.len();
    (0..m)
        .map(|k| (result[(k + 1) % m] - result[k]).dot(lines[active[k]].direction))
        .collect()
}

/// Strip the closing point, merge near-duplicate vertices and drop
/// collinear ones (including zero-width spikes).
fn cleanup_contour(contour: &[Point]) -> Result<Vec<Point>, OffsetError> {
    let mut points = super::open_loop(contour);

    for _ in 0..CLEANUP_PASSES {
        let before = points.len();
        points = cleanup_pass(&points);
        if points.len() < 3 {
            return Err(OffsetError::TooFewPoints {
                count: points.len(),
            });
        }
        if points.len() == before && !has_zero_length_edge(&points) {
            break;
        }
    }

    if has_zero_length_edge(&points) {
        return Err(OffsetError::ZeroLengthEdge);
    }
    Ok(points)
}

fn cleanup_pass(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    let mut kept: Vec<Point> = Vec::with_capacity(n);
    for i in 0..n {
        let current = points[i];
        let prev = kept.last().copied().unwrap_or(points[(i + n - 1) % n]);
        let next = points[(i + 1) % n];
        let incoming = current - prev;
        let outgoing = next - current;
        let (len_in, len_out) = (incoming.hypot(), outgoing.hypot());
        if len_in < POINT_EPSILON {
            continue;
        }
        if len_out >= POINT_EPSILON
            && incoming.cross(outgoing).abs() <= COLLINEAR_EPSILON * len_in * len_out
        {
            continue;
        }
        kept.push(current);
    }
    kept
}

fn has_zero_length_edge(points: &[Point]) -> bool {
    let n = points.len();
    (0..n).any(|i| points[i].distance(points[(i + 1) % n]) < POINT_EPSILON)
}
