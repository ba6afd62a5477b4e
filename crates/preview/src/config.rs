use crate::highlight::HighlightColor;

/// Footprint cells the structure can occupy.
pub const VALID_COLOR: HighlightColor = HighlightColor::rgba(64, 200, 96, 140);

/// Blocked footprint cells, and the building targeted for demolition.
pub const INVALID_COLOR: HighlightColor = HighlightColor::rgba(220, 60, 60, 140);

/// Extra height of highlight quads above structure visuals.
pub const HIGHLIGHT_LIFT: f32 = 0.02;
