//! Collapse runs of planar cut moves into circular arcs.

use crate::geometry::{circumcircle, radial_deviation, POINT_EPSILON};
use crate::types::{MoveKind, ToolpathMove};
use kurbo::{Circle, Point};
use tracing::debug;

/// Default deviation limit for fitted arcs (mm).
pub const ARC_FIT_TOLERANCE: f64 = 0.03;

/// Limits for accepting a fitted arc.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcFitConfig {
    /// Largest distance of any original vertex or chord midpoint from the arc (mm).
    pub tolerance: f64,
    /// Larger radii are treated as straight lines (mm).
    pub max_radius: f64,
    /// Largest sweep of a single arc (radians).
    pub max_sweep: f64,
}

impl Default for ArcFitConfig {
    fn default() -> Self {
        Self {
            tolerance: ARC_FIT_TOLERANCE,
            max_radius: 2000.0,
            max_sweep: 270f64.to_radians(),
        }
    }
}

/// Replace circular runs of same-Z cut moves with arc moves. Rapids,
/// plunges and ramps pass through unchanged.
pub fn fit_arcs(moves: &[ToolpathMove], config: &ArcFitConfig) -> Vec<ToolpathMove> {
    let mut out = Vec::with_capacity(moves.len());
    let mut i = 0;
    while i < moves.len() {
        let current = moves[i];
        let planar_start = i > 0
            && current.kind == MoveKind::Cut
            && (moves[i - 1].z - current.z).abs() < 1e-9;
        if !planar_start {
            out.push(current);
            i += 1;
            continue;
        }
        let mut j = i;
        while j < moves.len() && moves[j].kind == MoveKind::Cut && (moves[j].z - current.z).abs() < 1e-9 {
            j += 1;
        }
        let previous = moves[i - 1];
        let mut points = Vec::with_capacity(j - i + 1);
        points.push(Point::new(previous.x, previous.y));
        points.extend(moves[i..j].iter().map(|m| Point::new(m.x, m.y)));
        fit_run(&points, current.z, config, &mut out);
        i = j;
    }
    debug!(before = moves.len(), after = out.len(), "arc fitting");
    out
}

fn fit_run(points: &[Point], z: f64, config: &ArcFitConfig, out: &mut Vec<ToolpathMove>) {
    let mut a = 0;
    while a + 1 < points.len() {
        let mut best: Option<(usize, Circle, bool)> = None;
        let mut b = a + 2;
        while b < points.len() {
            match fit_circle(&points[a..=b], config) {
                Some((circle, clockwise)) => {
                    best = Some((b, circle, clockwise));
                    b += 1;
                }
                None => break,
            }
        }
        match best {
            Some((b, circle, clockwise)) => {
                let (start, end) = (points[a], points[b]);
                out.push(ToolpathMove::arc(
                    end.x,
                    end.y,
                    z,
                    circle.center.x - start.x,
                    circle.center.y - start.y,
                    clockwise,
                ));
                a = b;
            }
            None => {
                let end = points[a + 1];
                out.push(ToolpathMove::cut(end.x, end.y, z));
                a += 1;
            }
        }
    }
}

/// Circle through the first, middle and last point if every vertex and
/// chord midpoint lies within tolerance and the points sweep one way.
fn fit_circle(points: &[Point], config: &ArcFitConfig) -> Option<(Circle, bool)> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let circle = circumcircle(points[0], points[(n - 1) / 2], points[n - 1])?;
    if !(circle.radius <= config.max_radius) {
        return None;
    }

    let mut sweep = 0.0;
    let mut direction = 0.0;
    for pair in points.windows(2) {
        let (p, q) = (pair[0], pair[1]);
        if p.distance(q) < POINT_EPSILON {
            return None;
        }
        if radial_deviation(q, &circle) > config.tolerance
            || radial_deviation(p.midpoint(q), &circle) > config.tolerance
        {
            return None;
        }
        let (u, v) = (p - circle.center, q - circle.center);
        let step = u.cross(v).atan2(u.dot(v));
        if direction == 0.0 {
            direction = step.signum();
        } else if step.signum() != direction {
            return None;
        }
        sweep += step;
    }
    if sweep.abs() > config.max_sweep {
        return None;
    }
    Some((circle, sweep < 0.0))
}
