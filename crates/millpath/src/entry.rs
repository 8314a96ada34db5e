//! Entry planning: how the tool gets from the safe plane onto a path at a
//! given depth, follows it, and what it does afterwards.
//!
//! Each pass runs through [`EntryPhase`]s in order. The tool's situation
//! between passes is an [`EntryState`]; a pass that may continue from the
//! previous one skips the retract and re-approach.

use crate::geometry::{close_loop, path_length, sample_quad, segments_for_radius, POINT_EPSILON};
use crate::tabs::TabConfig;
use crate::types::{CutParams, EntryMethod, ToolpathMove};
use kurbo::{Point, Vec2};
use std::f64::consts::TAU;
use tracing::{debug, trace, warn};

/// Distance of the outside plunge point from the path, in tool diameters.
const PLUNGE_OUTSIDE_FACTOR: f64 = 1.5;
/// Below this radius a helix is just a plunge.
const MIN_HELIX_RADIUS: f64 = 0.05;
const MIN_HELIX_SEGMENTS: usize = 8;
const Z_EPSILON: f64 = 1e-9;

/// Where a path allows the tool to come in, as decided by its planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryHint {
    /// Circular room around `center`: ramp helically within `clearance`.
    Helical { center: Point, clearance: f64 },
    /// Ramp along the path itself.
    Linear,
    /// Part outline cut from outside; plunging can happen clear of the
    /// part in the `outward` direction.
    Outside { outward: Vec2 },
    /// No room to ramp.
    PlungeOnly,
}

/// A 2D tool-center path handed to the entry planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPath {
    pub points: Vec<Point>,
    /// Closed paths repeat their first point at the end.
    pub closed: bool,
    pub hint: EntryHint,
    /// Tabs may be left on this path on the final pass.
    pub tabbed: bool,
}

impl PlannedPath {
    pub fn closed(mut points: Vec<Point>, hint: EntryHint) -> Self {
        close_loop(&mut points);
        Self {
            points,
            closed: true,
            hint,
            tabbed: false,
        }
    }

    pub fn open(points: Vec<Point>, hint: EntryHint) -> Self {
        Self {
            points,
            closed: false,
            hint,
            tabbed: false,
        }
    }

    pub fn with_tabs(mut self) -> Self {
        self.tabbed = self.closed;
        self
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn length(&self) -> f64 {
        path_length(&self.points)
    }

    /// Same points within `tolerance`, in the same order.
    pub fn same_geometry(&self, other: &PlannedPath, tolerance: f64) -> bool {
        self.closed == other.closed
            && self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(&other.points)
                .all(|(a, b)| a.distance(*b) <= tolerance)
    }
}

/// The descent strategy for one path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryStyle {
    /// Straight down at the path start.
    Plunge,
    /// Straight down clear of the part, then a curved lead-in onto the path.
    PlungeOutside { outward: Vec2 },
    /// Descend while walking the path, at `angle` radians.
    LinearRamp { angle: f64 },
    /// Descend around `center` at `radius`, at `angle` radians.
    Helix { center: Point, radius: f64, angle: f64 },
}

/// Pick the descent strategy for a path from the requested entry method.
pub fn select_entry_style(path: &PlannedPath, params: &CutParams) -> EntryStyle {
    if path.points.len() < 2 || path.length() < POINT_EPSILON {
        return EntryStyle::Plunge;
    }
    match params.entry_method {
        EntryMethod::Plunge => match path.hint {
            EntryHint::Outside { outward } => EntryStyle::PlungeOutside { outward },
            _ => EntryStyle::Plunge,
        },
        EntryMethod::Ramp => {
            let degrees = params.ramp_angle_max;
            if !(degrees > 0.0 && degrees < 90.0) {
                warn!(degrees, "ramp angle out of range, plunging instead");
                return EntryStyle::Plunge;
            }
            let angle = degrees.to_radians();
            match path.hint {
                EntryHint::Helical { center, clearance } => {
                    let radius = params.tool_radius().min(clearance);
                    if radius < MIN_HELIX_RADIUS {
                        debug!(radius, "no room for a helix, plunging");
                        EntryStyle::Plunge
                    } else {
                        EntryStyle::Helix {
                            center,
                            radius,
                            angle,
                        }
                    }
                }
                EntryHint::Linear | EntryHint::Outside { .. } => EntryStyle::LinearRamp { angle },
                EntryHint::PlungeOnly => EntryStyle::Plunge,
            }
        }
    }
}

/// The tool's situation between passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryState {
    /// At or above the safe plane.
    Clear,
    /// In the material where the last pass ended. `path_s` is the arc
    /// length along that pass's loop, used to resume a linear ramp.
    Engaged { position: Point, z: f64, path_s: f64 },
}

/// Steps of a single pass, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPhase {
    RapidToSafe,
    LeadInDescend,
    FollowPath,
    /// The tool is left engaged; the next pass either continues from here
    /// or retracts first.
    RetractOrContinue,
}

/// One path at one depth.
#[derive(Debug, Clone, Copy)]
pub struct LayerPass<'a> {
    pub path: &'a PlannedPath,
    pub style: EntryStyle,
    pub target_z: f64,
    /// Floor already cut above this path; descent is rapid-free only below it.
    pub cleared_z: f64,
    /// The pass may ramp on from where the previous pass ended.
    pub may_continue: bool,
    pub tabs: Option<&'a TabConfig>,
}

/// Emits the moves of consecutive passes and tracks the [`EntryState`].
pub struct EntryPlanner {
    safe_height: f64,
    lead_in_z: f64,
    tool_diameter: f64,
    state: EntryState,
    moves: Vec<ToolpathMove>,
}

impl EntryPlanner {
    pub fn new(params: &CutParams) -> Self {
        Self {
            safe_height: params.safe_height,
            lead_in_z: params.lead_in_z(),
            tool_diameter: params.tool_diameter,
            state: EntryState::Clear,
            moves: Vec::new(),
        }
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn moves(&self) -> &[ToolpathMove] {
        &self.moves
    }

    /// Whether `pass` can start from the current position without retracting.
    pub fn can_continue(&self, pass: &LayerPass) -> bool {
        match self.state {
            EntryState::Engaged { z, .. } => pass.may_continue && pass.target_z < z - Z_EPSILON,
            EntryState::Clear => false,
        }
    }

    pub fn cut_pass(&mut self, pass: &LayerPass) {
        let Some(start) = pass.path.start() else {
            return;
        };
        let continuing = self.can_continue(pass);
        let (current_z, resume_s) = match self.state {
            EntryState::Engaged { z, path_s, .. } if continuing => (z, path_s),
            _ => (self.lead_in_z, 0.0),
        };
        let style = match pass.style {
            // Already in the kerf: the outside approach would cut fresh material.
            EntryStyle::PlungeOutside { .. } if continuing => EntryStyle::Plunge,
            style => style,
        };
        let walker = LoopWalker::for_path(pass.path, pass.tabs);
        let ramp_start_s = if continuing { resume_s } else { 0.0 };
        let entry_xy = match style {
            EntryStyle::Plunge => start,
            EntryStyle::PlungeOutside { outward } => {
                start + outward * (PLUNGE_OUTSIDE_FACTOR * self.tool_diameter)
            }
            EntryStyle::LinearRamp { .. } => walker
                .as_ref()
                .map_or(start, |w| w.point_at(ramp_start_s)),
            EntryStyle::Helix { center, radius, .. } => helix_start(center, radius, start),
        };

        let mut phase = EntryPhase::RapidToSafe;
        let mut end_s = 0.0;
        loop {
            trace!(?phase, ?style, z = pass.target_z, "entry phase");
            phase = match phase {
                EntryPhase::RapidToSafe => {
                    if continuing {
                        // Reposition over the cleared floor at the current depth.
                        self.cut_to(entry_xy, current_z);
                    } else {
                        self.rapid_to_safe(entry_xy);
                    }
                    EntryPhase::LeadInDescend
                }
                EntryPhase::LeadInDescend => {
                    end_s = self.descend(pass, style, entry_xy, current_z, walker.as_ref(), ramp_start_s);
                    EntryPhase::FollowPath
                }
                EntryPhase::FollowPath => {
                    end_s = self.follow(pass, style, walker.as_ref(), end_s);
                    EntryPhase::RetractOrContinue
                }
                EntryPhase::RetractOrContinue => {
                    if let Some(last) = self.moves.last() {
                        self.state = EntryState::Engaged {
                            position: Point::new(last.x, last.y),
                            z: pass.target_z,
                            path_s: end_s,
                        };
                    }
                    break;
                }
            };
        }
    }

    /// Retract to the safe plane if engaged.
    pub fn retract(&mut self) {
        if let EntryState::Engaged { position, .. } = self.state {
            self.moves
                .push(ToolpathMove::rapid(position.x, position.y, self.safe_height));
            self.state = EntryState::Clear;
        }
    }

    /// Final retract; returns every move emitted.
    pub fn finish(mut self) -> Vec<ToolpathMove> {
        self.retract();
        self.moves
    }

    fn rapid_to_safe(&mut self, entry_xy: Point) {
        self.retract();
        self.rapid_to(entry_xy, self.safe_height);
        self.rapid_to(entry_xy, self.lead_in_z);
    }

    fn rapid_to(&mut self, point: Point, z: f64) {
        let target = ToolpathMove::rapid(point.x, point.y, z);
        if self.moves.last() != Some(&target) {
            self.moves.push(target);
        }
    }

    fn cut_to(&mut self, point: Point, z: f64) {
        if let Some(last) = self.moves.last() {
            if Point::new(last.x, last.y).distance(point) < POINT_EPSILON
                && (last.z - z).abs() < Z_EPSILON
            {
                return;
            }
        }
        self.moves.push(ToolpathMove::cut(point.x, point.y, z));
    }

    /// Lower the tool from `from_z` to the pass depth. Returns the loop
    /// position where the path should be picked up.
    fn descend(
        &mut self,
        pass: &LayerPass,
        style: EntryStyle,
        entry_xy: Point,
        from_z: f64,
        walker: Option<&LoopWalker>,
        ramp_start_s: f64,
    ) -> f64 {
        let target_z = pass.target_z;
        let start = entry_xy;
        match style {
            EntryStyle::Plunge => {
                self.cut_to(start, target_z);
                0.0
            }
            EntryStyle::PlungeOutside { .. } => {
                self.cut_to(start, target_z);
                self.lead_in_curve(pass.path, start, target_z);
                0.0
            }
            EntryStyle::LinearRamp { angle } => {
                let Some(walker) = walker else {
                    self.cut_to(start, target_z);
                    return 0.0;
                };
                let ramp_z = self.feed_to_cleared(start, from_z, pass.cleared_z);
                let run = (ramp_z - target_z).max(0.0) / angle.tan();
                if run < POINT_EPSILON {
                    self.cut_to(start, target_z);
                    return ramp_start_s;
                }
                debug!(run, loop_length = walker.length, "linear ramp");
                for station in walker.walk(ramp_start_s, run) {
                    let z = ramp_z + (target_z - ramp_z) * station.travelled / run;
                    let z = self.tab_z(pass, station.s, z.max(target_z));
                    self.cut_to(station.point, z);
                }
                (ramp_start_s + run).rem_euclid(walker.length)
            }
            EntryStyle::Helix {
                center,
                radius,
                angle,
            } => {
                let helix_z = self.feed_to_cleared(start, from_z, pass.cleared_z);
                let drop = (helix_z - target_z).max(0.0);
                let per_turn = TAU * radius * angle.tan();
                let turns = ((drop / per_turn) - 1e-9).ceil().max(1.0) as usize;
                let steps = segments_for_radius(radius).max(MIN_HELIX_SEGMENTS);
                let start_angle = (start - center).atan2();
                debug!(radius, turns, "helical entry");
                let total = turns * steps;
                for k in 1..=total {
                    let a = start_angle + TAU * k as f64 / steps as f64;
                    let p = center + Vec2::from_angle(a) * radius;
                    let z = helix_z - drop * k as f64 / total as f64;
                    self.cut_to(p, z);
                }
                if let Some(path_start) = pass.path.start() {
                    self.cut_to(path_start, target_z);
                }
                0.0
            }
        }
    }

    /// Feed straight down to the cleared floor when starting above it.
    /// Returns the Z the ramp starts from.
    fn feed_to_cleared(&mut self, at: Point, from_z: f64, cleared_z: f64) -> f64 {
        if from_z > cleared_z + Z_EPSILON {
            self.cut_to(at, cleared_z);
            cleared_z
        } else {
            from_z
        }
    }

    /// Curved approach from the outside plunge point onto the path,
    /// arriving tangent to the first segment.
    fn lead_in_curve(&mut self, path: &PlannedPath, from: Point, z: f64) {
        let (Some(p0), Some(p1)) = (path.points.first(), path.points.get(1)) else {
            return;
        };
        let direction = *p1 - *p0;
        let length = direction.hypot();
        if length < POINT_EPSILON {
            self.cut_to(*p0, z);
            return;
        }
        let control = *p0 - direction / length * (PLUNGE_OUTSIDE_FACTOR * self.tool_diameter);
        for p in sample_quad(from, control, *p0) {
            self.cut_to(p, z);
        }
    }

    /// Cut the path at depth. Returns the loop position where it stopped.
    fn follow(
        &mut self,
        pass: &LayerPass,
        style: EntryStyle,
        walker: Option<&LoopWalker>,
        resume_s: f64,
    ) -> f64 {
        let z = pass.target_z;
        match (style, walker) {
            (EntryStyle::LinearRamp { .. }, Some(walker)) => {
                for station in walker.walk(resume_s, walker.length) {
                    let z = self.tab_z(pass, station.s, z);
                    self.cut_to(station.point, z);
                }
                resume_s
            }
            (_, Some(walker)) if pass.path.closed => {
                for station in walker.walk(0.0, walker.length) {
                    let z = self.tab_z(pass, station.s, z);
                    self.cut_to(station.point, z);
                }
                0.0
            }
            _ => {
                for p in pass.path.points.iter().skip(1) {
                    self.cut_to(*p, z);
                }
                0.0
            }
        }
    }

    fn tab_z(&self, pass: &LayerPass, s: f64, z: f64) -> f64 {
        match pass.tabs {
            Some(tabs) if pass.path.closed && pass.path.tabbed => z.max(tabs.z_at(s, pass.target_z)),
            _ => z,
        }
    }
}

fn helix_start(center: Point, radius: f64, path_start: Point) -> Point {
    let offset = path_start - center;
    let angle = if offset.hypot() < POINT_EPSILON {
        0.0
    } else {
        offset.atan2()
    };
    center + Vec2::from_angle(angle) * radius
}

/// A point on a walk, with the distance travelled so far and its arc
/// length along the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub point: Point,
    pub travelled: f64,
    pub s: f64,
}

/// Arc-length walker over a closed loop. Open paths are walked out and back.
#[derive(Debug, Clone)]
pub struct LoopWalker {
    points: Vec<Point>,
    cumulative: Vec<f64>,
    pub length: f64,
    breakpoints: Vec<f64>,
}

impl LoopWalker {
    pub fn new(mut points: Vec<Point>, breakpoints: Vec<f64>) -> Option<Self> {
        close_loop(&mut points);
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for w in points.windows(2) {
            total += w[0].distance(w[1]);
            cumulative.push(total);
        }
        if total < POINT_EPSILON {
            return None;
        }
        Some(Self {
            points,
            cumulative,
            length: total,
            breakpoints,
        })
    }

    pub fn for_path(path: &PlannedPath, tabs: Option<&TabConfig>) -> Option<Self> {
        if path.closed {
            let breakpoints = match tabs {
                Some(tabs) if path.tabbed => tabs.breakpoints(),
                _ => Vec::new(),
            };
            Self::new(path.points.clone(), breakpoints)
        } else {
            let mut out_and_back = path.points.clone();
            out_and_back.extend(path.points.iter().rev().skip(1));
            Self::new(out_and_back, Vec::new())
        }
    }

    pub fn point_at(&self, s: f64) -> Point {
        let s = s.rem_euclid(self.length);
        let segments = self.points.len() - 1;
        let k = self
            .cumulative
            .partition_point(|&c| c <= s)
            .saturating_sub(1)
            .min(segments - 1);
        let span = self.cumulative[k + 1] - self.cumulative[k];
        let t = if span > 0.0 {
            ((s - self.cumulative[k]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.points[k].lerp(self.points[k + 1], t)
    }

    /// Stations from `from` forward over `distance`, wrapping around the
    /// loop. Every vertex and breakpoint passed is a station; the start
    /// point is not, the end point is.
    pub fn walk(&self, from: f64, distance: f64) -> Vec<Station> {
        let end = from + distance;
        let first_lap = (from / self.length).floor() as i64;
        let last_lap = (end / self.length).floor() as i64;
        let mut marks: Vec<f64> = Vec::new();
        for lap in first_lap..=last_lap {
            let base = lap as f64 * self.length;
            let candidates = self.cumulative[1..]
                .iter()
                .chain(self.breakpoints.iter())
                .map(|c| base + c);
            marks.extend(candidates.filter(|&u| u > from + POINT_EPSILON && u < end - POINT_EPSILON));
        }
        marks.push(end);
        marks.sort_by(f64::total_cmp);
        marks.dedup_by(|a, b| (*a - *b).abs() < POINT_EPSILON);
        marks
            .into_iter()
            .map(|u| Station {
                point: self.point_at(u),
                travelled: u - from,
                s: u.rem_euclid(self.length),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TabSpec;

    fn params(entry_method: EntryMethod) -> CutParams {
        CutParams {
            tool_diameter: 6.0,
            total_depth: 5.0,
            stepdown: 2.5,
            stepover: 3.0,
            feedrate: 800.0,
            safe_height: 5.0,
            lead_in_above_mm: 1.0,
            entry_method,
            ramp_angle_max: 3.0,
        }
    }

    fn square_path(size: f64) -> PlannedPath {
        PlannedPath::closed(
            vec![
                Point::new(0.0, 0.0),
                Point::new(size, 0.0),
                Point::new(size, size),
                Point::new(0.0, size),
            ],
            EntryHint::Linear,
        )
    }

    fn pass<'a>(path: &'a PlannedPath, style: EntryStyle, z: f64, cleared: f64) -> LayerPass<'a> {
        LayerPass {
            path,
            style,
            target_z: z,
            cleared_z: cleared,
            may_continue: true,
            tabs: None,
        }
    }

    #[test]
    fn test_style_selection() {
        let ring = square_path(10.0);
        assert_eq!(select_entry_style(&ring, &params(EntryMethod::Plunge)), EntryStyle::Plunge);
        assert!(matches!(
            select_entry_style(&ring, &params(EntryMethod::Ramp)),
            EntryStyle::LinearRamp { .. }
        ));

        let mut spiral = ring.clone();
        spiral.hint = EntryHint::Helical {
            center: Point::new(5.0, 5.0),
            clearance: 2.0,
        };
        match select_entry_style(&spiral, &params(EntryMethod::Ramp)) {
            EntryStyle::Helix { radius, .. } => assert_eq!(radius, 2.0),
            other => panic!("expected helix, got {other:?}"),
        }

        let drill = PlannedPath::open(vec![Point::ORIGIN], EntryHint::PlungeOnly);
        assert_eq!(select_entry_style(&drill, &params(EntryMethod::Ramp)), EntryStyle::Plunge);

        let mut steep = params(EntryMethod::Ramp);
        steep.ramp_angle_max = 0.0;
        assert_eq!(select_entry_style(&ring, &steep), EntryStyle::Plunge);
    }

    #[test]
    fn test_plunge_then_continue_without_retract() {
        let path = square_path(10.0);
        let mut planner = EntryPlanner::new(&params(EntryMethod::Plunge));
        planner.cut_pass(&pass(&path, EntryStyle::Plunge, -2.5, 0.0));
        assert!(matches!(planner.state(), EntryState::Engaged { z, .. } if z == -2.5));
        let first_layer_moves = planner.moves().len();
        planner.cut_pass(&pass(&path, EntryStyle::Plunge, -5.0, -2.5));
        let moves = planner.finish();

        assert_eq!(moves[0], ToolpathMove::rapid(0.0, 0.0, 5.0));
        assert_eq!(moves[1], ToolpathMove::rapid(0.0, 0.0, 1.0));
        assert_eq!(moves[2], ToolpathMove::cut(0.0, 0.0, -2.5));
        let rapids = moves.iter().filter(|m| m.is_rapid()).count();
        assert_eq!(rapids, 3, "only approach and the final retract are rapids");
        assert_eq!(moves[first_layer_moves], ToolpathMove::cut(0.0, 0.0, -5.0));
        assert_eq!(*moves.last().unwrap(), ToolpathMove::rapid(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_no_continuation_retracts() {
        let path = square_path(10.0);
        let mut planner = EntryPlanner::new(&params(EntryMethod::Plunge));
        planner.cut_pass(&pass(&path, EntryStyle::Plunge, -2.5, 0.0));
        let mut second = pass(&path, EntryStyle::Plunge, -5.0, -2.5);
        second.may_continue = false;
        planner.cut_pass(&second);
        let moves = planner.finish();
        let retracts = moves
            .iter()
            .filter(|m| m.is_rapid() && m.z == 5.0)
            .count();
        assert_eq!(retracts, 3);
    }

    #[test]
    fn test_linear_ramp_respects_angle_and_wraps() {
        let path = square_path(10.0);
        let mut planner = EntryPlanner::new(&params(EntryMethod::Ramp));
        let angle = 3.0_f64.to_radians();
        planner.cut_pass(&pass(&path, EntryStyle::LinearRamp { angle }, -2.5, 0.0));
        let moves = planner.finish();

        // Feed down to the stock top, then ramp.
        assert_eq!(moves[2], ToolpathMove::cut(0.0, 0.0, 0.0));
        let mut travelled = 0.0;
        let mut reached = None;
        for pair in moves[2..].windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.is_rapid() {
                break;
            }
            let planar = (b.x - a.x).hypot(b.y - a.y);
            travelled += planar;
            if planar > 0.0 {
                let slope = (a.z - b.z) / planar;
                assert!(slope <= angle.tan() + 1e-9, "ramp too steep");
            }
            if reached.is_none() && (b.z + 2.5).abs() < 1e-9 {
                reached = Some(travelled);
            }
        }
        let run = 2.5 / angle.tan();
        assert!((reached.unwrap() - run).abs() < 1e-6);
        assert!(run > 40.0, "ramp needs more than one lap");
        // Ramp plus one full lap at depth.
        assert!((travelled - (run + 40.0)).abs() < 1e-6);
    }

    #[test]
    fn test_helix_stays_within_radius() {
        let center = Point::new(0.0, 0.0);
        let path = PlannedPath::open(
            vec![Point::new(3.0, 0.0), Point::new(10.0, 0.0)],
            EntryHint::Helical {
                center,
                clearance: 10.0,
            },
        );
        let style = EntryStyle::Helix {
            center,
            radius: 3.0,
            angle: 3.0_f64.to_radians(),
        };
        let mut planner = EntryPlanner::new(&params(EntryMethod::Ramp));
        planner.cut_pass(&pass(&path, style, -2.5, 0.0));
        let moves = planner.finish();
        let helix: Vec<_> = moves
            .iter()
            .filter(|m| !m.is_rapid() && m.z < 0.0 && m.z > -2.5)
            .collect();
        assert!(!helix.is_empty());
        for m in &helix {
            assert!((m.x.hypot(m.y) - 3.0).abs() < 1e-9);
        }
        let bottom = moves.iter().position(|m| m.z == -2.5).unwrap();
        assert!((moves[bottom].x - 3.0).abs() < 1e-9);
        assert!(moves[bottom].y.abs() < 1e-9);
    }

    #[test]
    fn test_plunge_outside_lead_in() {
        let mut path = square_path(10.0);
        path.hint = EntryHint::Outside {
            outward: Vec2::new(0.0, -1.0),
        };
        let style = select_entry_style(&path, &params(EntryMethod::Plunge));
        let mut planner = EntryPlanner::new(&params(EntryMethod::Plunge));
        planner.cut_pass(&pass(&path, style, -2.5, 0.0));
        let moves = planner.finish();
        assert_eq!(moves[0], ToolpathMove::rapid(0.0, -9.0, 5.0));
        assert_eq!(moves[2], ToolpathMove::cut(0.0, -9.0, -2.5));
        let arrival = moves
            .iter()
            .position(|m| m.x == 0.0 && m.y == 0.0)
            .expect("lead-in reaches the path");
        let before = moves[arrival - 1];
        // Arrives heading along the first segment (+X).
        assert!(before.x < 0.0);
        assert!(before.y.abs() < 0.5);
    }

    #[test]
    fn test_tabs_raise_final_pass() {
        let path = square_path(25.0).with_tabs();
        let spec = TabSpec {
            enabled: true,
            interval: 50.0,
            width: 6.0,
            height: 1.5,
        };
        let tabs = TabConfig::new(&spec, 100.0, 5.0).unwrap();
        let mut layer = pass(&path, EntryStyle::Plunge, -5.0, 0.0);
        layer.tabs = Some(&tabs);
        let mut planner = EntryPlanner::new(&params(EntryMethod::Plunge));
        planner.cut_pass(&layer);
        let moves = planner.finish();
        let on_tab = moves.iter().filter(|m| (m.z + 3.5).abs() < 1e-9).count();
        // Both ends of each flat, plus the corner each tab straddles.
        assert_eq!(on_tab, 6);
        assert!(moves.iter().all(|m| m.z >= -5.0));
    }

    #[test]
    fn test_walker_wraps_and_splits() {
        let walker = LoopWalker::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            vec![5.0],
        )
        .unwrap();
        assert_eq!(walker.length, 40.0);
        let stations = walker.walk(35.0, 12.0);
        let s: Vec<f64> = stations.iter().map(|st| st.s).collect();
        assert_eq!(s, vec![0.0, 5.0, 7.0]);
        assert_eq!(stations[1].point, Point::new(5.0, 0.0));
        assert_eq!(stations[2].travelled, 12.0);
    }
}
