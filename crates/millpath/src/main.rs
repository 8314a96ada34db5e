use anyhow::{Context, Result};
use millpath::*;
use tracing::info;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(request_path) = args.get(1) else {
        println!("Usage: millpath <request.json> [outlines.json]");
        println!("  request.json   - shape, operation and cutting parameters");
        println!("  outlines.json  - glyph outlines for text shapes");
        return Ok(());
    };

    init_logging()?;

    let request = ToolpathRequest::load_from_path(request_path)?;
    let mut provider = FallbackGlyphProvider::new();
    if let Some(outline_path) = args.get(2) {
        provider = provider.with(OutlineFileProvider::new(outline_path));
    }

    let outlines = match &request.shape {
        ShapeSpec::Letters {
            text, font_size, ..
        } => Some(provider.outlines(text, *font_size)?),
        _ => None,
    };

    let toolpath = generate_toolpath(&request, outlines.as_deref())
        .with_context(|| format!("generate toolpath for {request_path}"))?;
    info!(
        cut_length = toolpath.cut_length(),
        rapid_length = toolpath.rapid_length(),
        "toolpath summary"
    );
    for warning in &toolpath.warnings {
        eprintln!("warning: {warning}");
    }

    println!("{}", serde_json::to_string_pretty(&toolpath)?);
    Ok(())
}
