//! Nominal and tool-compensated outlines for the parametric shapes.

use super::{
    circle_ring, close_loop, segments_for_radius, to_line_string, GlyphContours, SIZE_EPSILON,
};
use crate::error::{ToolpathError, ToolpathResult};
use crate::types::{CutSide, ShapeSpec};
use geo::{EuclideanDistance, LineString};
use kurbo::{Point, Vec2};
use std::f64::consts::{FRAC_PI_2, TAU};
use tracing::debug;

/// A primitive feature placed in the work plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feature {
    Circle {
        center: Point,
        radius: f64,
    },
    Rect {
        center: Point,
        half_width: f64,
        half_height: f64,
    },
    /// Axis-aligned ellipse with semi-axes `rx` (X) and `ry` (Y).
    Ellipse { center: Point, rx: f64, ry: f64 },
}

/// Tool-center geometry for one feature after compensation.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensated {
    /// The tool only fits straight down at this point.
    Drill(Point),
    /// The tool fits along a single line.
    Slot { start: Point, end: Point },
    /// A closed ring, first point repeated at the end.
    Ring(Vec<Point>),
}

impl Feature {
    pub fn center(&self) -> Point {
        match *self {
            Feature::Circle { center, .. }
            | Feature::Rect { center, .. }
            | Feature::Ellipse { center, .. } => center,
        }
    }

    /// Half extents of the feature along X and Y.
    pub fn half_extents(&self) -> (f64, f64) {
        match *self {
            Feature::Circle { radius, .. } => (radius, radius),
            Feature::Rect {
                half_width,
                half_height,
                ..
            } => (half_width, half_height),
            Feature::Ellipse { rx, ry, .. } => (rx, ry),
        }
    }

    /// Room left for the tool center along X and Y.
    pub fn clearances(&self, tool_radius: f64) -> (f64, f64) {
        let (hx, hy) = self.half_extents();
        (hx - tool_radius, hy - tool_radius)
    }

    /// Radius of the largest circle the tool center can sweep around the
    /// feature center without leaving the compensated boundary.
    pub fn inscribed_clearance(&self, tool_radius: f64) -> f64 {
        let (cx, cy) = self.clearances(tool_radius);
        cx.min(cy).max(0.0)
    }

    /// Nominal outline as a closed counter-clockwise ring.
    pub fn outline(&self) -> Vec<Point> {
        match *self {
            Feature::Circle { center, radius } => {
                circle_ring(center, radius, segments_for_radius(radius), 0.0)
            }
            Feature::Rect {
                center,
                half_width,
                half_height,
            } => rect_ring(center, half_width, half_height),
            Feature::Ellipse { center, rx, ry } => ellipse_ring(center, rx, ry, 0.0),
        }
    }

    /// Compensate the outline by the tool radius toward `side`.
    pub fn compensate(&self, side: CutSide, tool_radius: f64) -> ToolpathResult<Compensated> {
        match side {
            CutSide::OnLine => Ok(Compensated::Ring(self.outline())),
            CutSide::Outside => Ok(Compensated::Ring(self.outer_ring(tool_radius))),
            CutSide::Inside => self.inner_geometry(tool_radius),
        }
    }

    fn outer_ring(&self, tool_radius: f64) -> Vec<Point> {
        match *self {
            Feature::Circle { center, radius } => {
                let r = radius + tool_radius;
                circle_ring(center, r, segments_for_radius(r), 0.0)
            }
            Feature::Rect {
                center,
                half_width,
                half_height,
            } => rounded_rect_ring(center, half_width, half_height, tool_radius),
            Feature::Ellipse { center, rx, ry } => ellipse_ring(center, rx, ry, -tool_radius),
        }
    }

    /// Inside compensation following the size tie-break table: drill point,
    /// slot, or ring.
    pub fn inner_geometry(&self, tool_radius: f64) -> ToolpathResult<Compensated> {
        let center = self.center();
        let (cx, cy) = self.clearances(tool_radius);
        if cx < -SIZE_EPSILON || cy < -SIZE_EPSILON {
            return Err(ToolpathError::ToolTooLarge {
                tool_diameter: tool_radius * 2.0,
                feature: self.name().to_string(),
            });
        }
        let (flat_x, flat_y) = (cx <= SIZE_EPSILON, cy <= SIZE_EPSILON);
        let geometry = match (flat_x, flat_y) {
            (true, true) => Compensated::Drill(center),
            (true, false) => Compensated::Slot {
                start: center + Vec2::new(0.0, -cy),
                end: center + Vec2::new(0.0, cy),
            },
            (false, true) => Compensated::Slot {
                start: center + Vec2::new(-cx, 0.0),
                end: center + Vec2::new(cx, 0.0),
            },
            (false, false) => Compensated::Ring(match *self {
                Feature::Circle { .. } => circle_ring(center, cx, segments_for_radius(cx), 0.0),
                Feature::Rect { .. } => rect_ring(center, cx, cy),
                Feature::Ellipse { rx, ry, .. } => {
                    ellipse_inner_ring(center, rx, ry, tool_radius, ellipse_segments(rx, ry))
                }
            }),
        };
        debug!(feature = self.name(), cx, cy, ?flat_x, ?flat_y, "inside compensation");
        Ok(geometry)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Circle { .. } => "circle",
            Feature::Rect { .. } => "rectangle",
            Feature::Ellipse { .. } => "ellipse",
        }
    }
}

/// Primitive features of a non-text shape. `layer_z` (negative, below the
/// stock top) only matters for the countersink, whose diameter narrows
/// with depth.
pub fn primitive_features(shape: &ShapeSpec, layer_z: f64) -> Vec<Feature> {
    let origin = Point::ORIGIN;
    match shape {
        ShapeSpec::Circle { diameter } => vec![Feature::Circle {
            center: origin,
            radius: diameter / 2.0,
        }],
        ShapeSpec::Square { size } => vec![Feature::Rect {
            center: origin,
            half_width: size / 2.0,
            half_height: size / 2.0,
        }],
        ShapeSpec::Rectangle { width, height } => vec![Feature::Rect {
            center: origin,
            half_width: width / 2.0,
            half_height: height / 2.0,
        }],
        ShapeSpec::Ellipse {
            major_axis,
            minor_axis,
        } => vec![Feature::Ellipse {
            center: origin,
            rx: major_axis / 2.0,
            ry: minor_axis / 2.0,
        }],
        ShapeSpec::CountersunkBolt {
            head_diameter,
            bolt_diameter,
            countersink_depth,
        } => vec![Feature::Circle {
            center: origin,
            radius: countersink_diameter(
                *head_diameter,
                *bolt_diameter,
                *countersink_depth,
                layer_z,
            ) / 2.0,
        }],
        ShapeSpec::PatternedHoles {
            hole_diameter,
            spacing,
            count_x,
            count_y,
        } => grid_centers(*count_x, *count_y, *spacing)
            .into_iter()
            .map(|center| Feature::Circle {
                center,
                radius: hole_diameter / 2.0,
            })
            .collect(),
        ShapeSpec::Letters { .. } => Vec::new(),
    }
}

/// Hole diameter of a countersunk bolt at a layer whose floor sits at `layer_z`.
pub fn countersink_diameter(head: f64, bolt: f64, countersink_depth: f64, layer_z: f64) -> f64 {
    if countersink_depth <= 0.0 {
        return bolt;
    }
    let depth = -layer_z;
    let diameter = head - (head - bolt) * depth / countersink_depth;
    diameter.max(bolt)
}

/// Number of holes in a grid, widened before multiplying.
fn hole_count(count_x: u32, count_y: u32) -> usize {
    (count_x as usize).saturating_mul(count_y as usize)
}

/// Grid of hole centers centered on the origin, ordered row by row with
/// alternating direction so consecutive holes are neighbours.
pub fn grid_centers(count_x: u32, count_y: u32, spacing: f64) -> Vec<Point> {
    let offset_x = (count_x.saturating_sub(1)) as f64 * spacing / 2.0;
    let offset_y = (count_y.saturating_sub(1)) as f64 * spacing / 2.0;
    let mut centers = Vec::with_capacity(hole_count(count_x, count_y));
    for row in 0..count_y {
        let y = row as f64 * spacing - offset_y;
        let columns: Box<dyn Iterator<Item = u32>> = if row % 2 == 0 {
            Box::new(0..count_x)
        } else {
            Box::new((0..count_x).rev())
        };
        for col in columns {
            centers.push(Point::new(col as f64 * spacing - offset_x, y));
        }
    }
    centers
}

/// Uncompensated outlines of a shape, for previewing the nominal part.
pub fn base_outlines(shape: &ShapeSpec, glyphs: Option<&GlyphContours>) -> Vec<Vec<Point>> {
    match shape {
        ShapeSpec::Letters { .. } => glyphs
            .map(|g| {
                g.contours()
                    .map(|contour| {
                        let mut ring = contour.clone();
                        close_loop(&mut ring);
                        ring
                    })
                    .collect()
            })
            .unwrap_or_default(),
        ShapeSpec::CountersunkBolt { head_diameter, .. } => {
            let radius = head_diameter / 2.0;
            vec![circle_ring(Point::ORIGIN, radius, segments_for_radius(radius), 0.0)]
        }
        _ => primitive_features(shape, 0.0)
            .iter()
            .map(Feature::outline)
            .collect(),
    }
}

/// Closed counter-clockwise rectangle starting mid-way along the bottom edge.
pub fn rect_ring(center: Point, half_width: f64, half_height: f64) -> Vec<Point> {
    [
        (0.0, -half_height),
        (half_width, -half_height),
        (half_width, half_height),
        (-half_width, half_height),
        (-half_width, -half_height),
        (0.0, -half_height),
    ]
    .iter()
    .map(|(x, y)| center + Vec2::new(*x, *y))
    .collect()
}

/// Rectangle grown by `radius` with round corners, as traced by the tool
/// center around the outside of a sharp rectangle.
pub fn rounded_rect_ring(center: Point, half_width: f64, half_height: f64, radius: f64) -> Vec<Point> {
    let arc_segments = (segments_for_radius(radius) / 4).max(2);
    let corners = [
        (Vec2::new(half_width, -half_height), -FRAC_PI_2),
        (Vec2::new(half_width, half_height), 0.0),
        (Vec2::new(-half_width, half_height), FRAC_PI_2),
        (Vec2::new(-half_width, -half_height), std::f64::consts::PI),
    ];
    let mut ring = vec![center + Vec2::new(0.0, -half_height - radius)];
    for (corner, start_angle) in corners {
        for i in 0..=arc_segments {
            let angle = start_angle + FRAC_PI_2 * i as f64 / arc_segments as f64;
            ring.push(center + corner + Vec2::from_angle(angle) * radius);
        }
    }
    ring.push(ring[0]);
    ring
}

fn ellipse_segments(rx: f64, ry: f64) -> usize {
    segments_for_radius(rx.max(ry))
}

fn ellipse_point(rx: f64, ry: f64, t: f64) -> Vec2 {
    Vec2::new(rx * t.cos(), ry * t.sin())
}

fn ellipse_normal(rx: f64, ry: f64, t: f64) -> Vec2 {
    let n = Vec2::new(ry * t.cos(), rx * t.sin());
    n / n.hypot()
}

/// Closed ellipse ring offset along its normals by `-inset` (positive
/// `inset` moves inward). Only valid inward while the inset stays below
/// the smallest radius of curvature; see [`ellipse_inner_ring`].
fn ellipse_ring(center: Point, rx: f64, ry: f64, inset: f64) -> Vec<Point> {
    let segments = ellipse_segments(rx, ry);
    (0..=segments)
        .map(|i| {
            let t = TAU * i as f64 / segments as f64;
            center + ellipse_point(rx, ry, t) - ellipse_normal(rx, ry, t) * inset
        })
        .collect()
}

/// Locus of the tool center touching the inside of an ellipse, sampled at
/// `segments` equal parameter steps and closed.
///
/// Where the tool is wider than the local curvature the plain normal
/// offset folds over itself; those samples are pulled toward the center
/// until they are a full tool radius away from the boundary.
pub fn ellipse_inner_ring(center: Point, rx: f64, ry: f64, tool_radius: f64, segments: usize) -> Vec<Point> {
    let (a, b) = (rx.max(ry), rx.min(ry));
    let min_curvature_radius = b * b / a;
    let reference = if tool_radius >= min_curvature_radius {
        Some(to_line_string(&ellipse_ring(Point::ORIGIN, rx, ry, 0.0)))
    } else {
        None
    };

    (0..=segments)
        .map(|i| {
            let t = TAU * i as f64 / segments as f64;
            let offset = ellipse_point(rx, ry, t) - ellipse_normal(rx, ry, t) * tool_radius;
            let offset = match &reference {
                Some(boundary) => pull_inside(offset, boundary, tool_radius),
                None => offset,
            };
            center + offset
        })
        .collect()
}

fn pull_inside(point: Vec2, boundary: &LineString<f64>, clearance: f64) -> Vec2 {
    let far_enough = |v: Vec2| distance_to_ring(v, boundary) >= clearance - 1e-9;
    if far_enough(point) {
        return point;
    }
    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..40 {
        let mid = (lo + hi) / 2.0;
        if far_enough(point * mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    point * lo
}

fn distance_to_ring(v: Vec2, ring: &LineString<f64>) -> f64 {
    geo::Point::new(v.x, v.y).euclidean_distance(ring)
}
