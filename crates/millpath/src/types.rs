use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parametric shape to machine. All dimensions are millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeSpec {
    Circle {
        diameter: f64,
    },
    Square {
        size: f64,
    },
    Rectangle {
        width: f64,
        height: f64,
    },
    /// Full axis lengths: `major_axis` along X, `minor_axis` along Y.
    Ellipse {
        major_axis: f64,
        minor_axis: f64,
    },
    /// Text whose outlines come from the glyph collaborator.
    Letters {
        text: String,
        font_size: f64,
        #[serde(default)]
        orientation: TextOrientation,
    },
    /// A clearance hole with a conical countersink at the top.
    CountersunkBolt {
        head_diameter: f64,
        bolt_diameter: f64,
        countersink_depth: f64,
    },
    /// A grid of equal holes, `spacing` apart center to center.
    PatternedHoles {
        hole_diameter: f64,
        spacing: f64,
        count_x: u32,
        count_y: u32,
    },
}

impl ShapeSpec {
    /// Short human-readable name, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeSpec::Circle { .. } => "circle",
            ShapeSpec::Square { .. } => "square",
            ShapeSpec::Rectangle { .. } => "rectangle",
            ShapeSpec::Ellipse { .. } => "ellipse",
            ShapeSpec::Letters { .. } => "letters",
            ShapeSpec::CountersunkBolt { .. } => "countersunk bolt",
            ShapeSpec::PatternedHoles { .. } => "patterned holes",
        }
    }

    /// Hole shapes are always compensated toward the inside of the hole.
    pub fn is_hole(&self) -> bool {
        matches!(
            self,
            ShapeSpec::CountersunkBolt { .. } | ShapeSpec::PatternedHoles { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOrientation {
    #[default]
    Horizontal,
    /// Rotated 90° counter-clockwise.
    Vertical,
}

/// Defines which side of the vector to cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutSide {
    Inside,
    Outside,
    OnLine,
}

/// The machining operation applied to the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Clear the whole interior.
    Pocket,
    /// Follow the outline, compensated to one side.
    Contour { side: CutSide },
    /// Surface the shape's bounding box.
    Facing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMethod {
    #[default]
    Plunge,
    Ramp,
}

/// Cutting parameters. Lengths in millimeters, feed in mm/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutParams {
    pub tool_diameter: f64,
    /// Final depth below the stock top, as a positive number.
    pub total_depth: f64,
    /// The maximum Z-depth to cut in a single pass.
    pub stepdown: f64,
    /// Lateral distance between neighbouring passes.
    pub stepover: f64,
    #[serde(default = "default_feedrate")]
    pub feedrate: f64,
    /// Clearance plane for rapid repositioning.
    #[serde(default = "default_safe_height")]
    pub safe_height: f64,
    /// Height above the stock top where the descent switches from rapid to feed.
    #[serde(default = "default_lead_in_above")]
    pub lead_in_above_mm: f64,
    #[serde(default)]
    pub entry_method: EntryMethod,
    /// Maximum ramp angle in degrees.
    #[serde(default = "default_ramp_angle")]
    pub ramp_angle_max: f64,
}

fn default_feedrate() -> f64 {
    800.0
}

fn default_safe_height() -> f64 {
    5.0
}

fn default_lead_in_above() -> f64 {
    1.0
}

fn default_ramp_angle() -> f64 {
    3.0
}

impl CutParams {
    pub fn tool_radius(&self) -> f64 {
        self.tool_diameter / 2.0
    }

    /// Stepover never exceeds the tool diameter.
    pub fn effective_stepover(&self) -> f64 {
        self.stepover.min(self.tool_diameter)
    }

    /// Z where the vertical lead-in turns from a rapid into a feed move.
    pub fn lead_in_z(&self) -> f64 {
        self.lead_in_above_mm.min(self.safe_height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XyOrigin {
    #[default]
    Center,
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZOrigin {
    #[default]
    StockTop,
    StockBottom,
}

/// Work coordinate convention of the emitted moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginSpec {
    #[serde(default)]
    pub xy_origin: XyOrigin,
    #[serde(default)]
    pub z_origin: ZOrigin,
    #[serde(default)]
    pub z_offset: f64,
}

/// Material bridges left standing on the final contour pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TabSpec {
    #[serde(default)]
    pub enabled: bool,
    /// Target distance between tab centers along the closed path.
    pub interval: f64,
    pub width: f64,
    /// Material height left under each tab.
    pub height: f64,
}

impl Default for TabSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 50.0,
            width: 6.0,
            height: 1.5,
        }
    }
}

/// A complete, validated generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolpathRequest {
    pub shape: ShapeSpec,
    pub operation: Operation,
    pub cut: CutParams,
    #[serde(default)]
    pub origin: OriginSpec,
    #[serde(default)]
    pub tabs: TabSpec,
    /// Collapse circular runs of cut moves into arcs.
    #[serde(default = "default_arc_fitting")]
    pub arc_fitting: bool,
}

fn default_arc_fitting() -> bool {
    true
}

impl ToolpathRequest {
    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("deserialize toolpath request")
    }

    /// Load a request from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("read toolpath request {}", path.display()))?;
        Self::from_json_str(&data)
    }
}

/// How the machine moves to the end point of a [`ToolpathMove`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveKind {
    Rapid,
    Cut,
    /// Circular move; `(i, j)` is the center relative to the move's start point.
    Arc { i: f64, j: f64, clockwise: bool },
}

/// A single commanded move. Coordinates are the end point, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolpathMove {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub kind: MoveKind,
}

impl ToolpathMove {
    pub fn rapid(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            kind: MoveKind::Rapid,
        }
    }

    pub fn cut(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            kind: MoveKind::Cut,
        }
    }

    pub fn arc(x: f64, y: f64, z: f64, i: f64, j: f64, clockwise: bool) -> Self {
        Self {
            x,
            y,
            z,
            kind: MoveKind::Arc { i, j, clockwise },
        }
    }

    pub fn is_rapid(&self) -> bool {
        matches!(self.kind, MoveKind::Rapid)
    }

    pub fn is_finite(&self) -> bool {
        let offsets_finite = match self.kind {
            MoveKind::Arc { i, j, .. } => i.is_finite() && j.is_finite(),
            _ => true,
        };
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && offsets_finite
    }
}

/// The finished move list handed to code emitters and previewers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Toolpath {
    pub moves: Vec<ToolpathMove>,
    /// Depth of every layer, top to bottom, relative to the stock top.
    pub layers: Vec<f64>,
    /// Features that were skipped without failing the request.
    pub warnings: Vec<String>,
}

impl Toolpath {
    /// Total feed distance, arcs measured along the arc.
    pub fn cut_length(&self) -> f64 {
        self.length_where(|m| !m.is_rapid())
    }

    /// Total rapid distance.
    pub fn rapid_length(&self) -> f64 {
        self.length_where(ToolpathMove::is_rapid)
    }

    fn length_where(&self, include: impl Fn(&ToolpathMove) -> bool) -> f64 {
        let mut total = 0.0;
        for pair in self.moves.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            if !include(to) {
                continue;
            }
            total += match to.kind {
                MoveKind::Arc { i, j, clockwise } => {
                    let (cx, cy) = (from.x + i, from.y + j);
                    let radius = i.hypot(j);
                    let a0 = (from.y - cy).atan2(from.x - cx);
                    let a1 = (to.y - cy).atan2(to.x - cx);
                    let mut sweep = if clockwise { a0 - a1 } else { a1 - a0 };
                    if sweep <= 0.0 {
                        sweep += std::f64::consts::TAU;
                    }
                    let planar = radius * sweep;
                    planar.hypot(to.z - from.z)
                }
                _ => {
                    let (dx, dy, dz) = (to.x - from.x, to.y - from.y, to.z - from.z);
                    (dx * dx + dy * dy + dz * dz).sqrt()
                }
            };
        }
        total
    }
}
