//! ECS wiring: request/outcome events, the building registry resource and the
//! systems that apply placement and removal requests.

use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::build_log::{BuildLog, BuildLogEntry};
use crate::buildings::{BuildingId, BuildingManager, PlacedBuilding, PlacementError};
use crate::grid_index::{Facing, GridIndex};
use crate::plane::TilePlane;
use crate::structures::{StructureCatalog, StructureId};
use crate::visuals::CommandVisuals;
use crate::TilesSet;

/// Buildings placed in the world, with their visual entities.
#[derive(Resource, Debug, Default, Deref, DerefMut)]
pub struct BuildingRegistry(pub BuildingManager<Entity>);

// =============================================================================
// Events
// =============================================================================

/// Where a request points: a grid cell, or a world position projected onto
/// the [`TilePlane`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildTarget {
    Cell(GridIndex),
    World(Vec3),
}

impl BuildTarget {
    pub fn resolve(self, plane: &TilePlane) -> GridIndex {
        match self {
            Self::Cell(cell) => cell,
            Self::World(pos) => plane.world_to_index(pos),
        }
    }
}

impl From<GridIndex> for BuildTarget {
    fn from(cell: GridIndex) -> Self {
        Self::Cell(cell)
    }
}

/// Request to place a catalog structure with its pivot at `target`.
#[derive(Event, Debug, Clone)]
pub struct PlaceStructure {
    pub structure: StructureId,
    pub target: BuildTarget,
    pub facing: Facing,
    /// Demolish whatever is in the way instead of rejecting.
    pub overwrite: bool,
}

/// Request to remove the building covering `target`.
#[derive(Event, Debug, Clone)]
pub struct RemoveStructure {
    pub target: BuildTarget,
}

/// A building was committed. `structure` is the catalog name.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct StructurePlaced {
    pub id: BuildingId,
    pub structure: String,
    pub pivot: GridIndex,
    pub facing: Facing,
}

/// A building was removed, by request or to make room for an overwriting
/// placement. Carries the same fields as the matching [`StructurePlaced`].
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct StructureRemoved {
    pub id: BuildingId,
    pub structure: String,
    pub pivot: GridIndex,
    pub facing: Facing,
}

impl StructureRemoved {
    fn of<H>(building: &PlacedBuilding<H>) -> Self {
        Self {
            id: building.id,
            structure: building.structure.clone(),
            pivot: building.pivot,
            facing: building.facing,
        }
    }
}

#[derive(Event, Debug, Clone)]
pub struct PlacementRejected {
    pub cell: GridIndex,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    UnknownStructure(StructureId),
    Placement(PlacementError),
}

impl From<PlacementError> for RejectReason {
    fn from(err: PlacementError) -> Self {
        Self::Placement(err)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownStructure(id) => write!(f, "unknown structure id {}", id.0),
            Self::Placement(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RejectReason {}

// =============================================================================
// Systems
// =============================================================================

fn reject(
    cell: GridIndex,
    reason: RejectReason,
    log: &mut BuildLog,
    rejected: &mut EventWriter<PlacementRejected>,
) {
    warn!("Build request at {} rejected: {}", cell, reason);
    log.push(BuildLogEntry::Rejected {
        cell,
        reason: reason.clone(),
    });
    rejected.send(PlacementRejected { cell, reason });
}

/// Applies `PlaceStructure` requests in arrival order.
#[allow(clippy::too_many_arguments)]
pub fn handle_place_requests(
    mut commands: Commands,
    mut requests: EventReader<PlaceStructure>,
    plane: Res<TilePlane>,
    catalog: Res<StructureCatalog>,
    mut registry: ResMut<BuildingRegistry>,
    mut log: ResMut<BuildLog>,
    mut placed: EventWriter<StructurePlaced>,
    mut removed: EventWriter<StructureRemoved>,
    mut rejected: EventWriter<PlacementRejected>,
) {
    for req in requests.read() {
        let pivot = req.target.resolve(&plane);
        let Some(def) = catalog.get(req.structure) else {
            reject(
                pivot,
                RejectReason::UnknownStructure(req.structure),
                &mut log,
                &mut rejected,
            );
            continue;
        };

        let mut visuals = CommandVisuals::new(&mut commands, &plane);
        let result = if req.overwrite {
            registry
                .place_overwriting(def, pivot, req.facing, &mut visuals)
                .map(|report| {
                    for building in report.demolished {
                        info!(
                            "{} {} demolished to make room at {}",
                            building.structure, building.id, pivot
                        );
                        log.push(BuildLogEntry::Removed {
                            id: building.id,
                            structure: building.structure.clone(),
                        });
                        removed.send(StructureRemoved::of(&building));
                    }
                    report.id
                })
        } else {
            registry.try_place(def, pivot, req.facing, &mut visuals)
        };

        match result {
            Ok(id) => {
                info!("{} {} placed at {} facing {:?}", def.name, id, pivot, req.facing);
                log.push(BuildLogEntry::Placed {
                    id,
                    structure: def.name.clone(),
                    pivot,
                    facing: req.facing,
                });
                placed.send(StructurePlaced {
                    id,
                    structure: def.name.clone(),
                    pivot,
                    facing: req.facing,
                });
            }
            Err(err) => reject(pivot, err.into(), &mut log, &mut rejected),
        }
    }
}

/// Applies `RemoveStructure` requests in arrival order.
pub fn handle_remove_requests(
    mut commands: Commands,
    mut requests: EventReader<RemoveStructure>,
    plane: Res<TilePlane>,
    mut registry: ResMut<BuildingRegistry>,
    mut log: ResMut<BuildLog>,
    mut removed: EventWriter<StructureRemoved>,
    mut rejected: EventWriter<PlacementRejected>,
) {
    for req in requests.read() {
        let cell = req.target.resolve(&plane);
        let outcome = registry.building_at(cell).map(StructureRemoved::of);

        let mut visuals = CommandVisuals::new(&mut commands, &plane);
        match (registry.try_remove(cell, &mut visuals), outcome) {
            (Ok(id), Some(outcome)) => {
                info!("{} {} removed via {}", outcome.structure, id, cell);
                log.push(BuildLogEntry::Removed {
                    id,
                    structure: outcome.structure.clone(),
                });
                removed.send(outcome);
            }
            (Ok(id), None) => warn!("Building {} removed via {} without a record", id, cell),
            (Err(err), _) => reject(cell, err.into(), &mut log, &mut rejected),
        }
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// Registers the tile resources, build events and request handlers.
///
/// Resources already present (a custom [`TilePlane`] or catalog) are kept.
pub struct TilesPlugin;

impl Plugin for TilesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TilePlane>()
            .init_resource::<StructureCatalog>()
            .init_resource::<BuildingRegistry>()
            .init_resource::<BuildLog>()
            .add_event::<PlaceStructure>()
            .add_event::<RemoveStructure>()
            .add_event::<StructurePlaced>()
            .add_event::<StructureRemoved>()
            .add_event::<PlacementRejected>()
            .add_systems(
                Update,
                (handle_place_requests, handle_remove_requests)
                    .chain()
                    .in_set(TilesSet::Apply),
            );
    }
}
