//! Grid cell ownership, structure placement and connector topology.
//!
//! The building blocks are plain data structures usable without an ECS
//! ([`registry::TileRegistry`], [`buildings::BuildingManager`],
//! [`connectors::ConnectorNetwork`]); [`TilesPlugin`] wires them into a Bevy
//! app through request events.

use bevy::prelude::*;

pub mod build_log;
pub mod buildings;
pub mod config;
pub mod connectors;
pub mod grid_index;
pub mod plane;
pub mod plugin;
pub mod registry;
pub mod structures;
pub mod visuals;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use build_log::{BuildLog, BuildLogEntry};
pub use buildings::{BuildingId, BuildingManager, PlacedBuilding, PlacementError, PlacementReport};
pub use grid_index::{Facing, GridIndex};
pub use plane::TilePlane;
pub use plugin::{
    BuildTarget, BuildingRegistry, PlaceStructure, PlacementRejected, RejectReason,
    RemoveStructure, StructurePlaced, StructureRemoved, TilesPlugin,
};
pub use registry::{OverwritePolicy, TileRegistry};
pub use structures::{StructureCatalog, StructureDef, StructureId};

/// Systems that mutate building state. Anything reading the registry for
/// display in the same frame should run `.after(TilesSet::Apply)`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TilesSet {
    Apply,
}
