//! Contour (profile) paths: the outline offset by the tool radius to one side.

use crate::entry::{EntryHint, PlannedPath};
use crate::error::ToolpathResult;
use crate::geometry::shape::{Compensated, Feature};
use crate::geometry::{offset_contour, GlyphContours};
use crate::pocket::outward_at_start;
use crate::types::CutSide;
use kurbo::Point;
use tracing::warn;

/// Signed offset for a cut side: positive moves into the outlined region.
pub fn side_offset(side: CutSide, tool_radius: f64) -> f64 {
    match side {
        CutSide::Inside => tool_radius,
        CutSide::Outside => -tool_radius,
        CutSide::OnLine => 0.0,
    }
}

/// Contour path around a primitive feature.
pub fn contour_feature(feature: &Feature, side: CutSide, tool_radius: f64) -> ToolpathResult<PlannedPath> {
    let path = match feature.compensate(side, tool_radius)? {
        Compensated::Drill(point) => PlannedPath::open(vec![point], EntryHint::PlungeOnly),
        Compensated::Slot { start, end } => PlannedPath::open(vec![start, end], EntryHint::Linear),
        Compensated::Ring(ring) => ring_path(ring, side),
    };
    Ok(path)
}

fn ring_path(ring: Vec<Point>, side: CutSide) -> PlannedPath {
    let hint = match side {
        CutSide::Outside => EntryHint::Outside {
            outward: outward_at_start(&ring),
        },
        CutSide::Inside | CutSide::OnLine => EntryHint::Linear,
    };
    PlannedPath::closed(ring, hint).with_tabs()
}

/// Contour paths for laid-out text.
///
/// Outers and counters are offset in opposite directions so the tool
/// stays on the same side of the letter material. A glyph whose outer
/// cannot be offset is skipped, as is a counter too small for the tool;
/// each skip is reported in the returned warnings.
pub fn contour_glyphs(glyphs: &GlyphContours, side: CutSide, tool_radius: f64) -> (Vec<PlannedPath>, Vec<String>) {
    let distance = side_offset(side, tool_radius);
    let mut paths = Vec::new();
    let mut warnings = Vec::new();

    for (index, glyph) in glyphs.shapes.iter().enumerate() {
        let outer = match offset_or_keep(&glyph.outer, distance) {
            Ok(outer) => outer,
            Err(err) => {
                let message = format!("glyph {index} skipped: {err}");
                warn!("{message}");
                warnings.push(message);
                continue;
            }
        };
        paths.push(ring_path(outer, side));

        for (counter_index, counter) in glyph.counters.iter().enumerate() {
            match offset_or_keep(counter, -distance) {
                Ok(ring) => paths.push(PlannedPath::closed(ring, EntryHint::Linear).with_tabs()),
                Err(err) => {
                    let message = format!("glyph {index} counter {counter_index} skipped: {err}");
                    warn!("{message}");
                    warnings.push(message);
                }
            }
        }
    }
    (paths, warnings)
}

fn offset_or_keep(contour: &[Point], distance: f64) -> ToolpathResult<Vec<Point>> {
    if distance == 0.0 {
        return Ok(contour.to_vec());
    }
    Ok(offset_contour(contour, distance)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{bounding_rect, GlyphShape};
    use kurbo::Vec2;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_outside_contour_of_square() {
        let feature = Feature::Rect {
            center: Point::ORIGIN,
            half_width: 10.0,
            half_height: 10.0,
        };
        let path = contour_feature(&feature, CutSide::Outside, 3.0).expect("contour");
        assert!(path.closed && path.tabbed);
        let bbox = bounding_rect(&path.points).unwrap();
        assert!((bbox.width() - 26.0).abs() < 1e-9);
        match path.hint {
            EntryHint::Outside { outward } => assert!((outward - Vec2::new(0.0, -1.0)).hypot() < 1e-9),
            other => panic!("unexpected hint {other:?}"),
        }
    }

    #[test]
    fn test_inside_contour_equal_to_tool_is_drill() {
        let feature = Feature::Circle {
            center: Point::ORIGIN,
            radius: 3.0,
        };
        let path = contour_feature(&feature, CutSide::Inside, 3.0).expect("contour");
        assert_eq!(path.points, vec![Point::ORIGIN]);
    }

    #[test]
    fn test_glyph_contours_offset_opposite_ways() {
        let glyphs = GlyphContours {
            shapes: vec![GlyphShape {
                outer: square(0.0, 0.0, 20.0),
                counters: vec![square(5.0, 5.0, 10.0).into_iter().rev().collect()],
            }],
        };
        let (paths, warnings) = contour_glyphs(&glyphs, CutSide::Inside, 1.0);
        assert!(warnings.is_empty());
        assert_eq!(paths.len(), 2);
        let outer = bounding_rect(&paths[0].points).unwrap();
        assert!((outer.width() - 18.0).abs() < 1e-9);
        let counter = bounding_rect(&paths[1].points).unwrap();
        assert!((counter.width() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_glyph_is_skipped_with_warning() {
        let glyphs = GlyphContours {
            shapes: vec![
                GlyphShape {
                    outer: square(0.0, 0.0, 1.0),
                    counters: vec![],
                },
                GlyphShape {
                    outer: square(10.0, 0.0, 20.0),
                    counters: vec![],
                },
            ],
        };
        let (paths, warnings) = contour_glyphs(&glyphs, CutSide::Inside, 2.0);
        assert_eq!(paths.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("glyph 0"));
    }
}
