//! Error types for toolpath generation.
//!
//! Offsetting reports its own precise failure reason; the orchestrator
//! folds those into [`ToolpathError`] when a whole request cannot proceed.

use thiserror::Error;

/// Why a contour could not be offset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OffsetError {
    /// Fewer than three distinct vertices survived deduplication.
    #[error("contour has only {count} usable points after cleanup")]
    TooFewPoints { count: usize },

    /// A zero-length edge was still present after every cleanup pass.
    #[error("zero-length edge persists after cleanup")]
    ZeroLengthEdge,

    /// The polygon area vanished.
    #[error("contour collapsed (signed area {area:.3e})")]
    Collapsed { area: f64 },

    /// The offset turned the polygon inside out.
    #[error("offset inverted the contour winding")]
    Inverted,
}

/// Errors that abort a toolpath request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolpathError {
    /// No valid polygon could be produced for any feature.
    #[error("geometry degenerate: {0}")]
    GeometryDegenerate(String),

    /// The tool does not fit inside the feature.
    #[error("tool diameter {tool_diameter} mm is too large for the {feature}")]
    ToolTooLarge { tool_diameter: f64, feature: String },

    /// A text shape was requested without usable glyph outlines.
    #[error("glyph outlines unavailable: {0}")]
    GlyphsUnavailable(String),

    /// A NaN or infinite coordinate reached the move list.
    #[error("non-finite coordinate in move {index}")]
    NonFiniteMove { index: usize },
}

impl From<OffsetError> for ToolpathError {
    fn from(err: OffsetError) -> Self {
        ToolpathError::GeometryDegenerate(err.to_string())
    }
}

/// Result type alias for toolpath generation.
pub type ToolpathResult<T> = Result<T, ToolpathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_error_becomes_geometry_degenerate() {
        let err: ToolpathError = OffsetError::Inverted.into();
        assert_eq!(
            err,
            ToolpathError::GeometryDegenerate("offset inverted the contour winding".to_string())
        );
    }

    #[test]
    fn test_tool_too_large_message() {
        let err = ToolpathError::ToolTooLarge {
            tool_diameter: 8.0,
            feature: "circle".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tool diameter 8 mm is too large for the circle"
        );
    }
}
