//! Build mode state machine and the per-frame placement preview.
//!
//! Input layers translate key and mouse events into [`BuildCommand`]s and
//! keep [`CursorCell`] up to date; everything else happens here.

use std::collections::HashSet;

use bevy::prelude::*;

use tiles::grid_index::{Facing, GridIndex};
use tiles::plane::TilePlane;
use tiles::plugin::{BuildTarget, BuildingRegistry, PlaceStructure, RemoveStructure};
use tiles::structures::{StructureCatalog, StructureId};
use tiles::visuals::CommandVisuals;

use crate::config::{INVALID_COLOR, VALID_COLOR};
use crate::highlight::{HighlightColor, HighlightOverlay};

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Idle,
    Place {
        structure: StructureId,
        facing: Facing,
    },
    Demolish,
}

/// Grid cell under the pointer, `None` when the pointer is off the plane.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorCell(pub Option<GridIndex>);

impl CursorCell {
    pub fn set_world(&mut self, plane: &TilePlane, world_pos: Option<Vec3>) {
        self.0 = world_pos.map(|pos| plane.world_to_index(pos));
    }
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewColors {
    pub valid: HighlightColor,
    pub invalid: HighlightColor,
}

impl Default for PreviewColors {
    fn default() -> Self {
        Self {
            valid: VALID_COLOR,
            invalid: INVALID_COLOR,
        }
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildCommand {
    /// Start placing `StructureId`, keeping the current facing if already
    /// placing.
    Select(StructureId),
    Demolish,
    Rotate { ccw: bool },
    /// Place or demolish at the cursor cell.
    Confirm,
    Cancel,
}

// =============================================================================
// Systems
// =============================================================================

pub fn apply_build_commands(
    mut requests: EventReader<BuildCommand>,
    mut mode: ResMut<BuildMode>,
    cursor: Res<CursorCell>,
    mut place: EventWriter<PlaceStructure>,
    mut remove: EventWriter<RemoveStructure>,
) {
    for request in requests.read() {
        match *request {
            BuildCommand::Select(structure) => {
                let facing = match *mode {
                    BuildMode::Place { facing, .. } => facing,
                    _ => Facing::North,
                };
                *mode = BuildMode::Place { structure, facing };
            }
            BuildCommand::Demolish => *mode = BuildMode::Demolish,
            BuildCommand::Rotate { ccw } => {
                if let BuildMode::Place { facing, .. } = &mut *mode {
                    *facing = facing.rotated(ccw);
                }
            }
            BuildCommand::Cancel => *mode = BuildMode::Idle,
            BuildCommand::Confirm => {
                let Some(cell) = cursor.0 else {
                    debug!("Build confirm ignored: cursor off grid");
                    continue;
                };
                match *mode {
                    BuildMode::Place { structure, facing } => {
                        place.send(PlaceStructure {
                            structure,
                            target: BuildTarget::Cell(cell),
                            facing,
                            overwrite: false,
                        });
                    }
                    BuildMode::Demolish => {
                        remove.send(RemoveStructure {
                            target: BuildTarget::Cell(cell),
                        });
                    }
                    BuildMode::Idle => {}
                }
            }
        }
    }
}

/// Recomputes preview highlights from the mode, cursor and registry.
///
/// Runs every frame; an unchanged preview costs no visual churn.
#[allow(clippy::too_many_arguments)]
pub fn update_build_preview(
    mut commands: Commands,
    mode: Res<BuildMode>,
    cursor: Res<CursorCell>,
    plane: Res<TilePlane>,
    catalog: Res<StructureCatalog>,
    registry: Res<BuildingRegistry>,
    colors: Res<PreviewColors>,
    mut overlay: ResMut<HighlightOverlay>,
) {
    let mut visuals = CommandVisuals::new(&mut commands, &plane);

    let Some(cell) = cursor.0 else {
        overlay.clear_all(&mut visuals);
        return;
    };

    match *mode {
        BuildMode::Idle => {
            overlay.clear_all(&mut visuals);
        }
        BuildMode::Demolish => match registry.building_at(cell) {
            Some(building) => {
                let cells = registry.cells_of(building.id);
                overlay.set_highlight_groups(
                    [(HashSet::new(), colors.valid), (cells, colors.invalid)],
                    &mut visuals,
                );
            }
            None => {
                overlay.clear_all(&mut visuals);
            }
        },
        BuildMode::Place { structure, facing } => {
            let Some(def) = catalog.get(structure) else {
                overlay.clear_all(&mut visuals);
                return;
            };
            // Blocked connector cells show up in red next to the footprint.
            let blocked: HashSet<GridIndex> =
                registry.blocked_cells(def, cell, facing).into_iter().collect();
            let free: HashSet<GridIndex> = def
                .footprint_cells(cell, facing)
                .into_iter()
                .filter(|c| !blocked.contains(c))
                .collect();
            overlay.set_highlight_groups(
                [(free, colors.valid), (blocked, colors.invalid)],
                &mut visuals,
            );
        }
    }
}
