use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use kurbo::Point;
use millpath::*;

fn create_polyline(points: &[Point]) -> Polyline {
    let mut pline = Polyline::new();
    for p in points {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// Area of cavalier's offset in the direction that yields the smaller
/// (`inward`) or larger region.
fn reference_area(points: &[Point], distance: f64, inward: bool) -> f64 {
    let pline = create_polyline(points);
    let areas: Vec<f64> = [distance, -distance]
        .iter()
        .flat_map(|d| pline.parallel_offset(*d))
        .map(|p| p.area().abs())
        .collect();
    let pick = if inward { f64::min } else { f64::max };
    areas.into_iter().reduce(pick).expect("Reference offset produced nothing")
}

fn convex_pentagon() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(40.0, -5.0),
        Point::new(55.0, 20.0),
        Point::new(25.0, 45.0),
        Point::new(-5.0, 25.0),
    ]
}

#[test]
fn test_inset_matches_reference_area() {
    let polygon = convex_pentagon();
    for distance in [0.5, 3.0, 8.0] {
        let inset = offset_contour(&polygon, distance).expect("Failed to inset pentagon");
        let area = signed_area2(&inset).abs() / 2.0;
        let expected = reference_area(&polygon, distance, true);
        assert!(
            (area - expected).abs() < 1e-6 * expected.max(1.0),
            "inset by {distance}: got {area}, reference {expected}"
        );
    }
}

#[test]
fn test_inset_is_winding_independent() {
    let polygon = convex_pentagon();
    let reversed: Vec<Point> = polygon.iter().rev().copied().collect();
    let a = offset_contour(&polygon, 2.0).expect("ccw");
    let b = offset_contour(&reversed, 2.0).expect("cw");
    assert!((signed_area2(&a).abs() - signed_area2(&b).abs()).abs() < 1e-6);
    assert!(signed_area2(&a) > 0.0 && signed_area2(&b) < 0.0);
}

#[test]
fn test_outset_contains_rounded_reference() {
    // Mitered corners enclose the reference's rounded corners.
    let polygon = convex_pentagon();
    let outset = offset_contour(&polygon, -3.0).expect("Failed to outset pentagon");
    let area = signed_area2(&outset).abs() / 2.0;
    let rounded = reference_area(&polygon, 3.0, false);
    assert!(area >= rounded - 1e-6);
    // Never more than the corner wedges a full miter adds.
    assert!(area - rounded < 5.0 * 9.0);
}

#[test]
fn test_inset_past_the_middle_fails() {
    let polygon = convex_pentagon();
    assert!(offset_contour(&polygon, 40.0).is_err());
}
