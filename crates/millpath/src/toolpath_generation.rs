use crate::arc_fit::{fit_arcs, ArcFitConfig};
use crate::depth::compute_depth_levels;
use crate::entry::{select_entry_style, EntryPlanner, EntryStyle, LayerPass, PlannedPath};
use crate::error::{ToolpathError, ToolpathResult};
use crate::geometry::{base_outlines, bounding_rect, layout_glyphs, primitive_features, GlyphContours};
use crate::origin::{apply_origin, extents, nominal_extents, Compensation};
use crate::pocket::{facing_path, pocket_feature, pocket_glyphs};
use crate::profile::{contour_feature, contour_glyphs};
use crate::tabs::TabConfig;
use crate::types::{CutSide, Operation, ShapeSpec, Toolpath, ToolpathRequest};
use kurbo::BezPath;
use tracing::{debug, info};

/// Paths closer than this are the same geometry across layers.
const SAME_GEOMETRY_TOLERANCE: f64 = 1e-9;

/// Paths planned for one depth layer.
#[derive(Debug, Clone, Default)]
pub struct LayerPlan {
    pub z: f64,
    pub paths: Vec<PlannedPath>,
    pub warnings: Vec<String>,
}

/// Generate the complete move list for a request.
///
/// `glyph_outlines` must be supplied for text shapes and is ignored for
/// every other shape.
pub fn generate_toolpath(request: &ToolpathRequest, glyph_outlines: Option<&[BezPath]>) -> ToolpathResult<Toolpath> {
    let cut = &request.cut;
    let glyphs = match &request.shape {
        ShapeSpec::Letters {
            text, orientation, ..
        } => {
            let outlines = glyph_outlines.ok_or_else(|| {
                ToolpathError::GlyphsUnavailable(format!("no outlines supplied for {text:?}"))
            })?;
            let laid_out = layout_glyphs(outlines, *orientation);
            if laid_out.is_empty() {
                return Err(ToolpathError::GlyphsUnavailable(format!(
                    "outlines for {text:?} contain no closed contours"
                )));
            }
            Some(laid_out)
        }
        _ => None,
    };

    let levels = compute_depth_levels(cut.total_depth, cut.stepdown);
    if levels.is_empty() {
        return Err(ToolpathError::GeometryDegenerate(format!(
            "total depth {} leaves nothing to cut",
            cut.total_depth
        )));
    }

    let plans = plan_layers(request, glyphs.as_ref(), &levels)?;
    let mut warnings: Vec<String> = Vec::new();
    for plan in &plans {
        for warning in &plan.warnings {
            if !warnings.contains(warning) {
                warnings.push(warning.clone());
            }
        }
    }

    let mut planner = EntryPlanner::new(cut);
    let final_index = plans.len() - 1;
    let mut previous: Option<&LayerPlan> = None;
    for (index, plan) in plans.iter().enumerate() {
        let cleared_z = previous.map_or(0.0, |p| p.z);
        for path in &plan.paths {
            let style = select_entry_style(path, cut);
            let tabs = if index == final_index && path.tabbed && is_contour(request) {
                TabConfig::new(&request.tabs, path.length(), cut.total_depth)
            } else {
                None
            };
            let pass = LayerPass {
                path,
                style,
                target_z: plan.z,
                cleared_z,
                may_continue: may_continue(previous, plan, path, style),
                tabs: tabs.as_ref(),
            };
            planner.cut_pass(&pass);
        }
        previous = Some(plan);
    }
    let mut moves = planner.finish();

    if request.arc_fitting {
        moves = fit_arcs(&moves, &ArcFitConfig::default());
    }

    let path_extents = extents(plans.iter().flat_map(|p| p.paths.iter()).flat_map(|p| p.points.iter()))
        .ok_or_else(|| ToolpathError::GeometryDegenerate("no tool path points".to_string()))?;
    let nominal = nominal_extents(path_extents, compensation(request), cut.tool_radius());
    apply_origin(&mut moves, nominal, &request.origin, cut.total_depth);

    if let Some(index) = moves.iter().position(|m| !m.is_finite()) {
        return Err(ToolpathError::NonFiniteMove { index });
    }

    info!(
        shape = request.shape.name(),
        moves = moves.len(),
        layers = levels.len(),
        warnings = warnings.len(),
        "generated toolpath"
    );
    Ok(Toolpath {
        moves,
        layers: levels,
        warnings,
    })
}

/// Plan the tool-center paths of every layer. Geometry is planned once
/// unless it changes with depth (the countersink cone).
pub fn plan_layers(
    request: &ToolpathRequest,
    glyphs: Option<&GlyphContours>,
    levels: &[f64],
) -> ToolpathResult<Vec<LayerPlan>> {
    let depth_dependent = matches!(request.shape, ShapeSpec::CountersunkBolt { .. });
    let mut plans: Vec<LayerPlan> = Vec::with_capacity(levels.len());
    for &z in levels {
        let plan = match plans.last() {
            Some(last) if !depth_dependent => LayerPlan {
                z,
                paths: last.paths.clone(),
                warnings: Vec::new(),
            },
            _ => plan_layer(request, glyphs, z)?,
        };
        debug!(z, paths = plan.paths.len(), "layer planned");
        plans.push(plan);
    }
    Ok(plans)
}

fn plan_layer(request: &ToolpathRequest, glyphs: Option<&GlyphContours>, z: f64) -> ToolpathResult<LayerPlan> {
    let cut = &request.cut;
    let tool_radius = cut.tool_radius();
    let stepover = cut.effective_stepover();
    let shape = &request.shape;

    let (paths, warnings) = match (&request.operation, shape) {
        (Operation::Facing, _) => {
            let outlines = base_outlines(shape, glyphs);
            let all: Vec<_> = outlines.into_iter().flatten().collect();
            let bbox = bounding_rect(&all).ok_or_else(|| {
                ToolpathError::GeometryDegenerate(format!("{} has no outline to face", shape.name()))
            })?;
            let path = facing_path(bbox.center(), bbox.width(), bbox.height(), stepover);
            (vec![path], Vec::new())
        }
        (Operation::Pocket, ShapeSpec::Letters { .. }) => {
            let glyphs = require_glyphs(glyphs)?;
            let (paths, warnings) = pocket_glyphs(glyphs, tool_radius, stepover);
            if paths.is_empty() {
                return Err(ToolpathError::GeometryDegenerate(
                    "tool too large for any letter".to_string(),
                ));
            }
            (paths, warnings)
        }
        (Operation::Contour { side }, ShapeSpec::Letters { .. }) => {
            let glyphs = require_glyphs(glyphs)?;
            let (paths, warnings) = contour_glyphs(glyphs, *side, tool_radius);
            if paths.is_empty() {
                return Err(ToolpathError::GeometryDegenerate(
                    "tool too large for any letter".to_string(),
                ));
            }
            (paths, warnings)
        }
        (Operation::Pocket, _) => {
            let paths = primitive_features(shape, z)
                .iter()
                .map(|feature| pocket_feature(feature, tool_radius, stepover))
                .collect::<ToolpathResult<Vec<_>>>()?;
            (paths, Vec::new())
        }
        (Operation::Contour { side }, _) => {
            let side = if shape.is_hole() { CutSide::Inside } else { *side };
            let paths = primitive_features(shape, z)
                .iter()
                .map(|feature| contour_feature(feature, side, tool_radius))
                .collect::<ToolpathResult<Vec<_>>>()?;
            (paths, Vec::new())
        }
    };
    Ok(LayerPlan { z, paths, warnings })
}

fn require_glyphs(glyphs: Option<&GlyphContours>) -> ToolpathResult<&GlyphContours> {
    glyphs.ok_or_else(|| ToolpathError::GlyphsUnavailable("text shape without glyph outlines".to_string()))
}

/// A pass continues without retracting only when it is the sole path of
/// its layer, follows a layer with a sole path, and either repeats that
/// path or enters by helix.
fn may_continue(previous: Option<&LayerPlan>, plan: &LayerPlan, path: &PlannedPath, style: EntryStyle) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    if plan.paths.len() != 1 || previous.paths.len() != 1 {
        return false;
    }
    previous.paths[0].same_geometry(path, SAME_GEOMETRY_TOLERANCE) || matches!(style, EntryStyle::Helix { .. })
}

fn is_contour(request: &ToolpathRequest) -> bool {
    matches!(request.operation, Operation::Contour { .. })
}

fn compensation(request: &ToolpathRequest) -> Compensation {
    match request.operation {
        Operation::Facing => Compensation::None,
        Operation::Pocket => Compensation::Inside,
        Operation::Contour { .. } if request.shape.is_hole() => Compensation::Inside,
        Operation::Contour { side } => match side {
            CutSide::Inside => Compensation::Inside,
            CutSide::Outside => Compensation::Outside,
            CutSide::OnLine => Compensation::None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CutParams, EntryMethod, OriginSpec, TabSpec};

    fn request(shape: ShapeSpec, operation: Operation) -> ToolpathRequest {
        ToolpathRequest {
            shape,
            operation,
            cut: CutParams {
                tool_diameter: 6.0,
                total_depth: 5.0,
                stepdown: 2.5,
                stepover: 3.0,
                feedrate: 800.0,
                safe_height: 5.0,
                lead_in_above_mm: 1.0,
                entry_method: EntryMethod::Plunge,
                ramp_angle_max: 3.0,
            },
            origin: OriginSpec::default(),
            tabs: TabSpec::default(),
            arc_fitting: false,
        }
    }

    #[test]
    fn test_letters_require_outlines() {
        let req = request(
            ShapeSpec::Letters {
                text: "A".to_string(),
                font_size: 20.0,
                orientation: Default::default(),
            },
            Operation::Pocket,
        );
        assert!(matches!(
            generate_toolpath(&req, None),
            Err(ToolpathError::GlyphsUnavailable(_))
        ));
    }

    #[test]
    fn test_countersink_layers_narrow() {
        let req = request(
            ShapeSpec::CountersunkBolt {
                head_diameter: 20.0,
                bolt_diameter: 8.0,
                countersink_depth: 5.0,
            },
            Operation::Contour {
                side: CutSide::Outside,
            },
        );
        let plans = plan_layers(&req, None, &[-2.5, -5.0]).expect("plans");
        let radius = |plan: &LayerPlan| {
            let p = plan.paths[0].points[0];
            p.x.hypot(p.y)
        };
        // Holes are always cut inside: (14 / 2) - 3 then (8 / 2) - 3.
        assert!((radius(&plans[0]) - 4.0).abs() < 1e-9);
        assert!((radius(&plans[1]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_patterned_holes_plan_one_path_per_hole() {
        let req = request(
            ShapeSpec::PatternedHoles {
                hole_diameter: 10.0,
                spacing: 20.0,
                count_x: 3,
                count_y: 2,
            },
            Operation::Pocket,
        );
        let plans = plan_layers(&req, None, &[-2.5, -5.0]).expect("plans");
        assert_eq!(plans[0].paths.len(), 6);
        assert_eq!(plans[1].paths, plans[0].paths);
    }

    #[test]
    fn test_tool_too_large_aborts() {
        let req = request(ShapeSpec::Circle { diameter: 4.0 }, Operation::Pocket);
        assert!(matches!(
            generate_toolpath(&req, None),
            Err(ToolpathError::ToolTooLarge { .. })
        ));
    }

    #[test]
    fn test_facing_covers_bounding_box() {
        let req = request(
            ShapeSpec::Rectangle {
                width: 40.0,
                height: 20.0,
            },
            Operation::Facing,
        );
        let plans = plan_layers(&req, None, &[-2.5]).expect("plans");
        let bbox = bounding_rect(&plans[0].paths[0].points).unwrap();
        assert!((bbox.width() - 40.0).abs() < 1e-9);
        assert!((bbox.height() - 20.0).abs() < 1e-9);
    }
}
