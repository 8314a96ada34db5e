mod arc_fit;
mod depth;
mod entry;
mod error;
mod geometry;
mod origin;
mod pocket;
mod profile;
mod tabs;
mod toolpath_generation;
mod types;

pub use arc_fit::{fit_arcs, ArcFitConfig, ARC_FIT_TOLERANCE};
pub use depth::compute_depth_levels;
pub use entry::{
    select_entry_style, EntryHint, EntryPhase, EntryPlanner, EntryState, EntryStyle, LayerPass,
    LoopWalker, PlannedPath, Station,
};
pub use error::{OffsetError, ToolpathError, ToolpathResult};
pub use geometry::*;
pub use origin::{apply_origin, extents, nominal_extents, origin_anchor, Compensation};
pub use pocket::{
    facing_path, outward_at_start, pocket_feature, pocket_glyphs, rect_spiral, ring_pocket,
    round_spiral, MAX_POCKET_RINGS,
};
pub use profile::{contour_feature, contour_glyphs, side_offset};
pub use tabs::TabConfig;
pub use toolpath_generation::*;
pub use types::*;

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
