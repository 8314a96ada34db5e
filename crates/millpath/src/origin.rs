//! Rebase finished moves onto the requested work origin.

use crate::types::{OriginSpec, ToolpathMove, XyOrigin, ZOrigin};
use kurbo::{Point, Rect};
use tracing::debug;

/// Which way tool compensation moved the path off the nominal outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Path runs one tool radius outside the part.
    Outside,
    /// Path runs one tool radius inside the feature (pockets, holes).
    Inside,
    /// Path is the outline itself (on-line contours, facing).
    None,
}

/// Nominal part extents recovered from the extents of the tool-center
/// paths.
pub fn nominal_extents(path_extents: Rect, compensation: Compensation, tool_radius: f64) -> Rect {
    match compensation {
        Compensation::Outside => path_extents.inflate(-tool_radius, -tool_radius),
        Compensation::Inside => path_extents.inflate(tool_radius, tool_radius),
        Compensation::None => path_extents,
    }
}

/// The point of `nominal` that becomes the work origin.
pub fn origin_anchor(nominal: Rect, xy_origin: XyOrigin) -> Point {
    match xy_origin {
        XyOrigin::Center => nominal.center(),
        XyOrigin::BottomLeft => Point::new(nominal.x0, nominal.y0),
        XyOrigin::BottomRight => Point::new(nominal.x1, nominal.y0),
        XyOrigin::TopLeft => Point::new(nominal.x0, nominal.y1),
        XyOrigin::TopRight => Point::new(nominal.x1, nominal.y1),
    }
}

/// Shift every move so the chosen corner or center of the nominal extents
/// lands on (0, 0), then rebase Z. Arc center offsets are relative and
/// stay as they are.
pub fn apply_origin(moves: &mut [ToolpathMove], nominal: Rect, origin: &OriginSpec, total_depth: f64) {
    let shift = Point::ORIGIN - origin_anchor(nominal, origin.xy_origin);
    let z_shift = match origin.z_origin {
        ZOrigin::StockTop => 0.0,
        ZOrigin::StockBottom => total_depth,
    } + origin.z_offset;
    debug!(dx = shift.x, dy = shift.y, dz = z_shift, "origin transform");
    for m in moves.iter_mut() {
        let p = Point::new(m.x, m.y) + shift;
        m.x = p.x;
        m.y = p.y;
        m.z += z_shift;
    }
}

/// Extents of every point, or `None` when there are none.
pub fn extents<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Rect> {
    let mut iter = points.into_iter();
    let first = *iter.next()?;
    Some(iter.fold(Rect::from_points(first, first), |r, p| r.union_pt(*p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoveKind;

    fn circle_moves() -> Vec<ToolpathMove> {
        vec![
            ToolpathMove::rapid(22.0, 0.0, 5.0),
            ToolpathMove::cut(22.0, 0.0, -2.0),
            ToolpathMove::arc(-22.0, 0.0, -2.0, -22.0, 0.0, false),
            ToolpathMove::arc(22.0, 0.0, -2.0, 22.0, 0.0, false),
        ]
    }

    #[test]
    fn test_nominal_extents() {
        let path = Rect::new(-22.0, -22.0, 22.0, 22.0);
        assert_eq!(
            nominal_extents(path, Compensation::Inside, 3.0),
            Rect::new(-25.0, -25.0, 25.0, 25.0)
        );
        assert_eq!(
            nominal_extents(path, Compensation::Outside, 3.0),
            Rect::new(-19.0, -19.0, 19.0, 19.0)
        );
        assert_eq!(nominal_extents(path, Compensation::None, 3.0), path);
    }

    #[test]
    fn test_bottom_left_origin() {
        let mut moves = circle_moves();
        let nominal = Rect::new(-25.0, -25.0, 25.0, 25.0);
        let origin = OriginSpec {
            xy_origin: XyOrigin::BottomLeft,
            z_origin: ZOrigin::StockTop,
            z_offset: 0.0,
        };
        apply_origin(&mut moves, nominal, &origin, 5.0);
        assert_eq!(moves[0], ToolpathMove::rapid(47.0, 25.0, 5.0));
        // Arc offsets are relative and unchanged.
        assert_eq!(
            moves[2].kind,
            MoveKind::Arc {
                i: -22.0,
                j: 0.0,
                clockwise: false
            }
        );
    }

    #[test]
    fn test_stock_bottom_and_offset() {
        let mut moves = circle_moves();
        let nominal = Rect::new(-25.0, -25.0, 25.0, 25.0);
        let origin = OriginSpec {
            xy_origin: XyOrigin::TopRight,
            z_origin: ZOrigin::StockBottom,
            z_offset: 0.5,
        };
        apply_origin(&mut moves, nominal, &origin, 5.0);
        assert_eq!(moves[1], ToolpathMove::cut(-3.0, -25.0, 3.5));
    }

    #[test]
    fn test_extents() {
        let points = [Point::new(1.0, 2.0), Point::new(-3.0, 5.0)];
        assert_eq!(extents(&points), Some(Rect::new(-3.0, 2.0, 1.0, 5.0)));
        assert_eq!(extents(&[] as &[Point]), None);
    }
}
