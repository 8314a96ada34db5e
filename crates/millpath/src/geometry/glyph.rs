//! Glyph outlines for text shapes.
//!
//! Fetching outlines is the caller's job: a [`GlyphProvider`] hands back
//! Bézier paths, and [`layout_glyphs`] turns them into flat contours
//! grouped into letter islands that the planners can offset.

use super::{
    bounding_rect, open_loop, sample_cubic, sample_quad, signed_area2, to_polygon, translate,
};
use crate::types::TextOrientation;
use anyhow::{anyhow, bail, Context, Result};
use geo::{Contains, Polygon};
use kurbo::{Affine, BezPath, PathEl, Point};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Supplies glyph outlines for a string at a given font size (mm).
pub trait GlyphProvider {
    fn outlines(&self, text: &str, font_size: f64) -> Result<Vec<BezPath>>;
}

/// Tries each provider in order and returns the first success.
#[derive(Default)]
pub struct FallbackGlyphProvider {
    providers: Vec<Box<dyn GlyphProvider>>,
}

impl FallbackGlyphProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl GlyphProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl GlyphProvider for FallbackGlyphProvider {
    fn outlines(&self, text: &str, font_size: f64) -> Result<Vec<BezPath>> {
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.outlines(text, font_size) {
                Ok(outlines) => return Ok(outlines),
                Err(err) => warn!(provider = index, "glyph provider failed: {err:#}"),
            }
        }
        bail!("no glyph provider could supply outlines for {text:?}")
    }
}

/// On-disk outline set: SVG path data in font units, y up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineFile {
    pub text: String,
    pub units_per_em: f64,
    pub outlines: Vec<String>,
}

/// Reads pre-extracted outlines from a JSON [`OutlineFile`].
pub struct OutlineFileProvider {
    path: PathBuf,
}

impl OutlineFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GlyphProvider for OutlineFileProvider {
    fn outlines(&self, text: &str, font_size: f64) -> Result<Vec<BezPath>> {
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("read outline file {}", self.path.display()))?;
        let file: OutlineFile = serde_json::from_str(&data)
            .with_context(|| format!("parse outline file {}", self.path.display()))?;
        if file.text != text {
            bail!(
                "outline file {} holds {:?}, not {:?}",
                self.path.display(),
                file.text,
                text
            );
        }
        if !(file.units_per_em > 0.0) {
            bail!("outline file units_per_em must be positive");
        }
        let scale = Affine::scale(font_size / file.units_per_em);
        file.outlines
            .iter()
            .map(|svg| {
                let mut path =
                    BezPath::from_svg(svg).map_err(|e| anyhow!("invalid outline path: {e}"))?;
                path.apply_affine(scale);
                Ok(path)
            })
            .collect()
    }
}

/// One letter island: an outer boundary and the counters (holes) inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphShape {
    pub outer: Vec<Point>,
    pub counters: Vec<Vec<Point>>,
}

/// Laid-out text, centered on the origin. Contours are open (no repeated
/// closing point).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphContours {
    pub shapes: Vec<GlyphShape>,
}

impl GlyphContours {
    pub fn contours(&self) -> impl Iterator<Item = &Vec<Point>> {
        self.shapes
            .iter()
            .flat_map(|shape| std::iter::once(&shape.outer).chain(shape.counters.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Flatten a Bézier path into polylines, one per subpath. Curves are
/// sampled at a fixed segment count; subpaths with fewer than three
/// points are dropped.
pub fn flatten_outline(path: &BezPath) -> Vec<Vec<Point>> {
    let mut contours = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut finish = |current: &mut Vec<Point>| {
        let contour = open_loop(current);
        if contour.len() >= 3 {
            contours.push(contour);
        }
        current.clear();
    };

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                finish(&mut current);
                current.push(p);
            }
            PathEl::LineTo(p) => current.push(p),
            PathEl::QuadTo(p1, p2) => {
                let p0 = current.last().copied().unwrap_or(Point::ORIGIN);
                current.extend(sample_quad(p0, p1, p2));
            }
            PathEl::CurveTo(p1, p2, p3) => {
                let p0 = current.last().copied().unwrap_or(Point::ORIGIN);
                current.extend(sample_cubic(p0, p1, p2, p3));
            }
            PathEl::ClosePath => finish(&mut current),
        }
    }
    finish(&mut current);
    contours
}

/// Flatten, group and place glyph outlines.
///
/// Contours nested an even number of times are letter outers; odd ones are
/// counters of the smallest outer that contains them.
pub fn layout_glyphs(outlines: &[BezPath], orientation: TextOrientation) -> GlyphContours {
    let mut contours: Vec<Vec<Point>> = outlines.iter().flat_map(flatten_outline).collect();

    if orientation == TextOrientation::Vertical {
        for contour in &mut contours {
            for p in contour.iter_mut() {
                *p = Point::new(-p.y, p.x);
            }
        }
    }

    let all: Vec<Point> = contours.iter().flatten().copied().collect();
    if let Some(bbox) = bounding_rect(&all) {
        let shift = Point::ORIGIN - bbox.center();
        for contour in &mut contours {
            *contour = translate(contour, shift);
        }
    }

    let polygons: Vec<Polygon<f64>> = contours.iter().map(|c| to_polygon(c)).collect();
    let depths: Vec<usize> = contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            let probe = geo::Point::new(contour[0].x, contour[0].y);
            polygons
                .iter()
                .enumerate()
                .filter(|(j, polygon)| *j != i && polygon.contains(&probe))
                .count()
        })
        .collect();

    let mut shapes: Vec<GlyphShape> = Vec::new();
    let mut outer_index: Vec<Option<usize>> = vec![None; contours.len()];
    for (i, contour) in contours.iter().enumerate() {
        if depths[i] % 2 == 0 {
            outer_index[i] = Some(shapes.len());
            shapes.push(GlyphShape {
                outer: contour.clone(),
                counters: Vec::new(),
            });
        }
    }
    for (i, contour) in contours.iter().enumerate() {
        if depths[i] % 2 == 0 {
            continue;
        }
        let probe = geo::Point::new(contour[0].x, contour[0].y);
        let owner = (0..contours.len())
            .filter(|&j| outer_index[j].is_some() && polygons[j].contains(&probe))
            .min_by(|&a, &b| {
                signed_area2(&contours[a])
                    .abs()
                    .total_cmp(&signed_area2(&contours[b]).abs())
            });
        match owner.and_then(|j| outer_index[j]) {
            Some(shape) => shapes[shape].counters.push(contour.clone()),
            None => debug!(contour = i, "counter without an enclosing outer dropped"),
        }
    }

    debug!(shapes = shapes.len(), contours = contours.len(), "laid out glyphs");
    GlyphContours { shapes }
}
