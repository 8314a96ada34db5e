//! Planar geometry shared by every planner.
//!
//! Points are [`kurbo::Point`]s in millimeters. A contour is a `Vec<Point>`;
//! it is treated as closed when its first and last points coincide
//! within [`POINT_EPSILON`], or when the consuming algorithm says so.

use geo::{LineString, Polygon};
use kurbo::{Circle, CubicBez, ParamCurve, Point, QuadBez, Rect, Vec2};
use std::f64::consts::{PI, TAU};

pub mod glyph;
pub mod offset;
pub mod shape;

pub use glyph::{
    flatten_outline, layout_glyphs, FallbackGlyphProvider, GlyphContours, GlyphProvider,
    GlyphShape, OutlineFile, OutlineFileProvider,
};
pub use offset::offset_contour;
pub use shape::{
    base_outlines, ellipse_inner_ring, primitive_features, rounded_rect_ring, Compensated, Feature,
};

/// Two points closer than this are the same point.
pub const POINT_EPSILON: f64 = 1e-9;
/// Three points whose cross product is below this are collinear.
pub const COLLINEAR_EPSILON: f64 = 1e-10;
/// A polygon with a smaller doubled signed area has collapsed.
pub const AREA_EPSILON: f64 = 1e-6;
/// Tie-break tolerance when comparing a feature size against the tool.
pub const SIZE_EPSILON: f64 = 1e-6;
/// Largest chord sagitta allowed when discretizing circles and ellipses.
pub const SAGITTA_TOLERANCE: f64 = 0.01;
/// Segments used for every Bézier curve command.
pub const BEZIER_SEGMENTS: usize = 16;
pub const MIN_CIRCLE_SEGMENTS: usize = 4;
pub const MAX_CIRCLE_SEGMENTS: usize = 360;

pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Twice the signed area of the polygon; positive when counter-clockwise.
///
/// The closing edge is implicit, so a repeated last point changes nothing.
pub fn signed_area2(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum
}

/// Circle through three points, or `None` when they are collinear.
pub fn circumcircle(a: Point, b: Point, c: Point) -> Option<Circle> {
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.cross(ac);
    if d.abs() < COLLINEAR_EPSILON {
        return None;
    }
    let ab2 = ab.hypot2();
    let ac2 = ac.hypot2();
    let ux = (ac.y * ab2 - ab.y * ac2) / d;
    let uy = (ab.x * ac2 - ac.x * ab2) / d;
    let offset = Vec2::new(ux, uy);
    Some(Circle::new(a + offset, offset.hypot()))
}

/// Distance of `point` from the circumference of `circle`.
pub fn radial_deviation(point: Point, circle: &Circle) -> f64 {
    (point.distance(circle.center) - circle.radius).abs()
}

/// Segment count for a full circle of `radius` so that the chord sagitta
/// stays within [`SAGITTA_TOLERANCE`].
pub fn segments_for_radius(radius: f64) -> usize {
    if !(radius > SAGITTA_TOLERANCE) {
        return MIN_CIRCLE_SEGMENTS;
    }
    let half_angle = (1.0 - SAGITTA_TOLERANCE / radius).acos();
    let segments = (PI / half_angle).ceil();
    if segments.is_finite() {
        (segments as usize).clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS)
    } else {
        MAX_CIRCLE_SEGMENTS
    }
}

/// Closed ring (last point repeats the first) starting at `start_angle`,
/// counter-clockwise.
pub fn circle_ring(center: Point, radius: f64, segments: usize, start_angle: f64) -> Vec<Point> {
    (0..=segments)
        .map(|i| {
            let angle = start_angle + TAU * i as f64 / segments as f64;
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}

/// Points along a quadratic Bézier, excluding `p0`.
pub fn sample_quad(p0: Point, p1: Point, p2: Point) -> Vec<Point> {
    let curve = QuadBez::new(p0, p1, p2);
    (1..=BEZIER_SEGMENTS)
        .map(|i| curve.eval(i as f64 / BEZIER_SEGMENTS as f64))
        .collect()
}

/// Points along a cubic Bézier, excluding `p0`.
pub fn sample_cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> Vec<Point> {
    let curve = CubicBez::new(p0, p1, p2, p3);
    (1..=BEZIER_SEGMENTS)
        .map(|i| curve.eval(i as f64 / BEZIER_SEGMENTS as f64))
        .collect()
}

pub fn is_closed(points: &[Point]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 => first.distance(*last) < POINT_EPSILON,
        _ => false,
    }
}

/// Repeat the first point at the end unless the contour is already closed.
pub fn close_loop(points: &mut Vec<Point>) {
    if let Some(first) = points.first().copied() {
        if points.len() > 1 && !is_closed(points) {
            points.push(first);
        }
    }
}

/// Drop the repeated closing point, if any.
pub fn open_loop(points: &[Point]) -> Vec<Point> {
    let mut open = points.to_vec();
    if is_closed(&open) {
        open.pop();
    }
    open
}

/// Polyline length along the given point order.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

pub fn bounding_rect(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p)),
    )
}

pub fn translate(points: &[Point], offset: Vec2) -> Vec<Point> {
    points.iter().map(|p| *p + offset).collect()
}

/// Closed `geo` ring through the points of a contour.
pub fn to_line_string(contour: &[Point]) -> LineString<f64> {
    let coords: Vec<(f64, f64)> = contour.iter().map(|p| (p.x, p.y)).collect();
    let mut ring = LineString::from(coords);
    ring.close();
    ring
}

pub fn to_polygon(contour: &[Point]) -> Polygon<f64> {
    Polygon::new(to_line_string(contour), Vec::new())
}
