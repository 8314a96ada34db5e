//! Pocket clearing: continuous spirals for primitive features and
//! concentric offset rings for arbitrary outlines.

use crate::entry::{EntryHint, PlannedPath};
use crate::error::{ToolpathError, ToolpathResult};
use crate::geometry::shape::{rect_ring, Compensated, Feature};
use crate::geometry::{
    circle_ring, close_loop, ellipse_inner_ring, offset_contour, open_loop, segments_for_radius,
    signed_area2, to_polygon, GlyphContours, POINT_EPSILON, SIZE_EPSILON,
};
use geo::{Contains, Intersects, Polygon};
use kurbo::{Point, Vec2};
use tracing::{debug, warn};

/// Upper bound on offset rings per outline.
pub const MAX_POCKET_RINGS: usize = 300;

/// Clear a primitive feature with a single continuous path.
///
/// Circles and ellipses get a spiral, rectangles a rectangular spiral.
/// Features no wider than the tool collapse to a drill point or a slot.
pub fn pocket_feature(feature: &Feature, tool_radius: f64, stepover: f64) -> ToolpathResult<PlannedPath> {
    let center = feature.center();
    let clearance = feature.inscribed_clearance(tool_radius);
    let hint = EntryHint::Helical { center, clearance };
    let path = match feature.inner_geometry(tool_radius)? {
        Compensated::Drill(point) => PlannedPath::open(vec![point], EntryHint::PlungeOnly),
        Compensated::Slot { start, end } => PlannedPath::open(vec![start, end], EntryHint::Linear),
        Compensated::Ring(_) => match *feature {
            Feature::Rect { .. } => {
                let (cx, cy) = feature.clearances(tool_radius);
                PlannedPath::open(rect_spiral(center, cx, cy, stepover), hint)
            }
            Feature::Circle { .. } | Feature::Ellipse { .. } => {
                PlannedPath::open(round_spiral(feature, tool_radius, stepover), hint)
            }
        },
    };
    Ok(path)
}

/// Spiral for a circle or ellipse, ending on a closing ring at the
/// compensated boundary.
///
/// With room for it, the path starts on a ring one tool radius out from
/// the center; otherwise it spirals straight out of the center so there is
/// no radial feed line.
pub fn round_spiral(feature: &Feature, tool_radius: f64, stepover: f64) -> Vec<Point> {
    let center = feature.center();
    let boundary: Vec<Point> = match *feature {
        Feature::Ellipse { rx, ry, .. } => {
            let segments = segments_for_radius(rx.max(ry));
            open_loop(&ellipse_inner_ring(center, rx, ry, tool_radius, segments))
        }
        _ => {
            let (cx, _) = feature.clearances(tool_radius);
            open_loop(&circle_ring(center, cx, segments_for_radius(cx), 0.0))
        }
    };
    let samples = boundary.len();
    let clearance = feature.inscribed_clearance(tool_radius);
    let start_scale = if clearance >= tool_radius {
        tool_radius / clearance
    } else {
        0.0
    };
    let start_ring: Vec<Point> = boundary
        .iter()
        .map(|p| center + (*p - center) * start_scale)
        .collect();

    let span = boundary
        .iter()
        .zip(&start_ring)
        .map(|(b, s)| b.distance(*s))
        .fold(0.0, f64::max);
    let turns = ((span / stepover) - 1e-9).ceil().max(1.0) as usize;
    debug!(turns, span, start_scale, samples, "round spiral");

    let mut path = Vec::with_capacity(samples * (turns + 2) + 1);
    if start_scale > 0.0 {
        path.extend(start_ring.iter().copied());
    }
    let total = turns * samples;
    for step in 0..=total {
        let index = step % samples;
        let lambda = step as f64 / total as f64;
        path.push(start_ring[index].lerp(boundary[index], lambda));
    }
    path.extend(boundary.iter().skip(1).copied());
    path.push(boundary[0]);
    dedup_consecutive(&mut path);
    path
}

/// Rectangular spiral inside a compensated rectangle with half extents
/// `(cx, cy)`. Passes shrink by `stepover` and run innermost first, each
/// joined to the next by a short straight step.
pub fn rect_spiral(center: Point, cx: f64, cy: f64, stepover: f64) -> Vec<Point> {
    let mut rings: Vec<(f64, f64)> = Vec::new();
    let mut k = 0.0;
    loop {
        let hx = (cx - k * stepover).max(0.0);
        let hy = (cy - k * stepover).max(0.0);
        rings.push((hx, hy));
        if hx.min(hy) <= SIZE_EPSILON || rings.len() >= MAX_POCKET_RINGS {
            break;
        }
        k += 1.0;
    }
    debug!(passes = rings.len(), "rectangular spiral");

    let mut path: Vec<Point> = rings
        .iter()
        .rev()
        .flat_map(|&(hx, hy)| rect_ring(center, hx, hy))
        .collect();
    dedup_consecutive(&mut path);
    path
}

/// Facing pass over a `width` by `height` box: the outermost pass is
/// centered on the box edge.
pub fn facing_path(center: Point, width: f64, height: f64, stepover: f64) -> PlannedPath {
    let (hx, hy) = (width / 2.0, height / 2.0);
    let hint = EntryHint::Helical {
        center,
        clearance: hx.min(hy),
    };
    PlannedPath::open(rect_spiral(center, hx, hy, stepover), hint)
}

/// Concentric rings filling the region between an already compensated
/// outer boundary and compensated counters (islands).
///
/// Rings grow inward from the outer boundary and outward from each
/// counter until offsetting fails, a side would cross the other's rings,
/// or [`MAX_POCKET_RINGS`] is reached. Returned rings are closed and
/// ordered from the middle of the material out to the boundaries.
pub fn ring_pocket(outer: &[Point], counters: &[Vec<Point>], stepover: f64) -> ToolpathResult<Vec<Vec<Point>>> {
    let mut outer_rings = vec![Ring::new(open_loop(outer))];
    let mut counter_rings: Vec<Vec<Ring>> = counters.iter().map(|c| vec![Ring::new(open_loop(c))]).collect();

    for (i, rings) in counter_rings.iter().enumerate() {
        let counter = &rings[0];
        if counter.crosses(&outer_rings[0]) || !counter.inside(&outer_rings[0]) {
            return Err(ToolpathError::GeometryDegenerate(
                "counter boundary reaches the outer boundary".to_string(),
            ));
        }
        for other in &counter_rings[i + 1..] {
            if counter.crosses(&other[0]) {
                return Err(ToolpathError::GeometryDegenerate(
                    "counter boundaries overlap".to_string(),
                ));
            }
        }
    }

    let mut outer_done = false;
    let mut counter_done = vec![false; counter_rings.len()];
    let mut total = 1 + counter_rings.len();
    while total < MAX_POCKET_RINGS && !(outer_done && counter_done.iter().all(|d| *d)) {
        if !outer_done {
            let next = outer_rings
                .last()
                .and_then(|last| offset_contour(&last.points, stepover).ok())
                .map(Ring::new);
            match next {
                Some(next)
                    if counter_rings
                        .iter()
                        .all(|rings| rings.iter().all(|r| !next.crosses(r) && !next.inside(r))) =>
                {
                    outer_rings.push(next);
                    total += 1;
                }
                _ => outer_done = true,
            }
        }
        for i in 0..counter_rings.len() {
            if counter_done[i] || total >= MAX_POCKET_RINGS {
                continue;
            }
            let next = counter_rings[i]
                .last()
                .and_then(|last| offset_contour(&last.points, -stepover).ok())
                .map(Ring::new);
            let Some(next) = next else {
                counter_done[i] = true;
                continue;
            };
            let clear_of_outer = outer_rings
                .last()
                .is_some_and(|outer| !next.crosses(outer) && next.inside(outer));
            let clear_of_counters = counter_rings
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .all(|(_, rings)| rings.iter().all(|r| !next.crosses(r) && !r.inside(&next)));
            if clear_of_outer && clear_of_counters {
                counter_rings[i].push(next);
                total += 1;
            } else {
                counter_done[i] = true;
            }
        }
    }
    debug!(
        outer = outer_rings.len(),
        counters = counter_rings.len(),
        total,
        "ring pocket"
    );

    let depth = counter_rings
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(outer_rings.len()))
        .max()
        .unwrap_or(0);
    let mut ordered = Vec::with_capacity(total);
    for level in (0..depth).rev() {
        if let Some(ring) = outer_rings.get(level) {
            ordered.push(ring.points.clone());
        }
        for rings in &counter_rings {
            if let Some(ring) = rings.get(level) {
                ordered.push(ring.points.clone());
            }
        }
    }
    for ring in &mut ordered {
        close_loop(ring);
    }
    Ok(ordered)
}

/// An open pocket ring and its polygon, built once for the nesting tests.
struct Ring {
    points: Vec<Point>,
    polygon: Polygon<f64>,
}

impl Ring {
    fn new(points: Vec<Point>) -> Self {
        let polygon = to_polygon(&points);
        Self { points, polygon }
    }

    /// Touching or overlapping boundaries count as crossing.
    fn crosses(&self, other: &Ring) -> bool {
        self.polygon.exterior().intersects(other.polygon.exterior())
    }

    /// Whether this ring lies inside `outer`, judged by its first vertex.
    fn inside(&self, outer: &Ring) -> bool {
        self.points
            .first()
            .is_some_and(|p| outer.polygon.contains(&geo::Point::new(p.x, p.y)))
    }
}

/// Ring paths clearing laid-out text. A glyph the tool cannot enter is
/// skipped and reported in the returned warnings.
pub fn pocket_glyphs(glyphs: &GlyphContours, tool_radius: f64, stepover: f64) -> (Vec<PlannedPath>, Vec<String>) {
    let mut paths = Vec::new();
    let mut warnings = Vec::new();
    for (index, glyph) in glyphs.shapes.iter().enumerate() {
        let rings = offset_contour(&glyph.outer, tool_radius)
            .map_err(ToolpathError::from)
            .and_then(|outer| {
                let counters = glyph
                    .counters
                    .iter()
                    .map(|c| offset_contour(c, -tool_radius))
                    .collect::<Result<Vec<_>, _>>()?;
                ring_pocket(&outer, &counters, stepover)
            });
        match rings {
            Ok(rings) => paths.extend(
                rings
                    .into_iter()
                    .map(|ring| PlannedPath::closed(ring, EntryHint::Linear)),
            ),
            Err(err) => {
                let message = format!("glyph {index} skipped: {err}");
                warn!("{message}");
                warnings.push(message);
            }
        }
    }
    (paths, warnings)
}

fn dedup_consecutive(points: &mut Vec<Point>) {
    points.dedup_by(|a, b| a.distance(*b) < POINT_EPSILON);
}

/// Unit vector pointing away from the region enclosed by a closed ring, at
/// the ring's first vertex.
pub fn outward_at_start(ring: &[Point]) -> Vec2 {
    let winding = signed_area2(ring).signum();
    let direction = match (ring.first(), ring.iter().skip(1).find(|p| p.distance(ring[0]) > POINT_EPSILON)) {
        (Some(p0), Some(p1)) => *p1 - *p0,
        _ => return Vec2::new(0.0, -1.0),
    };
    let u = direction / direction.hypot();
    Vec2::new(u.y, -u.x) * winding
}
