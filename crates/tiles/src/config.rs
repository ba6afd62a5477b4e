/// Edge length of one grid cell in world units.
pub const CELL_SIZE: f32 = 1.0;

/// Height above the plane at which structure and connector visuals are placed.
pub const VISUAL_LIFT: f32 = 0.0;

/// Maximum number of placement/removal outcomes kept in the `BuildLog`.
pub const BUILD_LOG_CAPACITY: usize = 64;
