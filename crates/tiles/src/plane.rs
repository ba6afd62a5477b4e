//! Mapping between world space and grid cells.
//!
//! The grid lies on the world XZ plane: grid `x` runs along world `+X`, grid
//! `y` along world `+Z`. Cell `(0,0)` spans `[origin, origin + cell_size)` on
//! both axes.

use bevy::prelude::*;

use crate::config::CELL_SIZE;
use crate::grid_index::GridIndex;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct TilePlane {
    pub origin: Vec3,
    pub cell_size: f32,
}

impl Default for TilePlane {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            cell_size: CELL_SIZE,
        }
    }
}

impl TilePlane {
    pub fn new(origin: Vec3, cell_size: f32) -> Self {
        Self { origin, cell_size }
    }

    /// The cell containing `world_pos` after projecting it onto the plane.
    pub fn world_to_index(&self, world_pos: Vec3) -> GridIndex {
        let local = world_pos - self.origin;
        GridIndex::new(
            (local.x / self.cell_size).floor() as i32,
            (local.z / self.cell_size).floor() as i32,
        )
    }

    /// Centre of `index` relative to the plane origin.
    pub fn index_to_local(&self, index: GridIndex) -> Vec3 {
        Vec3::new(
            (index.x as f32 + 0.5) * self.cell_size,
            0.0,
            (index.y as f32 + 0.5) * self.cell_size,
        )
    }

    /// Centre of `index` in world space.
    pub fn index_to_world(&self, index: GridIndex) -> Vec3 {
        self.origin + self.index_to_local(index)
    }
}
