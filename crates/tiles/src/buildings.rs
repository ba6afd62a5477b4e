//! Placing and removing structures on the grid.
//!
//! [`BuildingManager`] owns the footprint registry (exclusive ownership), the
//! connector network and one [`PlacedBuilding`] record per building. A
//! placement either commits completely or leaves every map untouched.
//! Connector cells are exclusive between buildings as well: a structure whose
//! connector lands on another building's connector is obstructed. The
//! footprint registry is always updated before the connector network is
//! rebuilt, so the rebuild never sees a half-placed building.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connectors::{ConnectorNetwork, RebuildStats};
use crate::grid_index::{Facing, GridIndex};
use crate::registry::{OverwritePolicy, TileRegistry};
use crate::structures::StructureDef;
use crate::visuals::StructureVisuals;

/// Owner token for a placed building. Never reused by the same manager.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BuildingId(pub u32);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBuilding<H> {
    pub id: BuildingId,
    pub structure: String,
    pub pivot: GridIndex,
    pub facing: Facing,
    pub visual: H,
    /// Whether the structure registered connector cells when placed.
    pub has_connectors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementError {
    /// At least one footprint or connector cell is already owned.
    Obstructed { blocked: Vec<GridIndex> },
    /// The structure definition covers no cells.
    EmptyFootprint,
    /// Nothing is placed at the requested cell.
    Empty { cell: GridIndex },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Obstructed { blocked } => {
                write!(f, "placement obstructed at {} cell(s)", blocked.len())?;
                if let Some(first) = blocked.first() {
                    write!(f, ", first at {first}")?;
                }
                Ok(())
            }
            Self::EmptyFootprint => write!(f, "structure has an empty footprint"),
            Self::Empty { cell } => write!(f, "no building at {cell}"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Outcome of [`BuildingManager::place_overwriting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReport<H> {
    pub id: BuildingId,
    /// Buildings torn down to make room, in the order they were hit.
    pub demolished: Vec<PlacedBuilding<H>>,
    pub connectors: RebuildStats,
}

#[derive(Debug, Clone)]
pub struct BuildingManager<H> {
    footprints: TileRegistry<BuildingId>,
    connectors: ConnectorNetwork<H>,
    buildings: HashMap<BuildingId, PlacedBuilding<H>>,
    next_id: u32,
}

impl<H> Default for BuildingManager<H> {
    fn default() -> Self {
        Self {
            footprints: TileRegistry::new(),
            connectors: ConnectorNetwork::default(),
            buildings: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<H: Copy + Eq + fmt::Debug> BuildingManager<H> {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Placement / removal
    // -----------------------------------------------------------------------

    /// Place `def` at `pivot` facing `facing` if every footprint cell is free
    /// and none of its connector cells is held by another building.
    ///
    /// On error nothing has been mutated and no visual was spawned.
    pub fn try_place<V>(
        &mut self,
        def: &StructureDef,
        pivot: GridIndex,
        facing: Facing,
        visuals: &mut V,
    ) -> Result<BuildingId, PlacementError>
    where
        V: StructureVisuals<Handle = H>,
    {
        let cells = def.footprint_cells(pivot, facing);
        if cells.is_empty() {
            return Err(PlacementError::EmptyFootprint);
        }
        let blocked = self.blocked_cells(def, pivot, facing);
        if !blocked.is_empty() {
            return Err(PlacementError::Obstructed { blocked });
        }

        let (id, _) = self.commit(def, pivot, facing, cells, visuals);
        Ok(id)
    }

    /// Place `def` regardless of what is in the way. Every building whose
    /// footprint overlaps the new footprint, or whose connector cells overlap
    /// the new connector cells, is demolished first.
    pub fn place_overwriting<V>(
        &mut self,
        def: &StructureDef,
        pivot: GridIndex,
        facing: Facing,
        visuals: &mut V,
    ) -> Result<PlacementReport<H>, PlacementError>
    where
        V: StructureVisuals<Handle = H>,
    {
        let cells = def.footprint_cells(pivot, facing);
        if cells.is_empty() {
            return Err(PlacementError::EmptyFootprint);
        }

        let mut victims = self.footprints.owners_of(cells.iter().copied());
        for owner in self
            .connectors
            .registry()
            .owners_of(def.connector_cells(pivot, facing))
        {
            if !victims.contains(&owner) {
                victims.push(owner);
            }
        }
        let mut demolished = Vec::with_capacity(victims.len());
        let mut connectors = RebuildStats::default();
        for victim in victims {
            if let Some((building, stats)) = self.demolish(victim, visuals) {
                demolished.push(building);
                connectors.merge(stats);
            }
        }

        let (id, stats) = self.commit(def, pivot, facing, cells, visuals);
        connectors.merge(stats);

        Ok(PlacementReport {
            id,
            demolished,
            connectors,
        })
    }

    /// Remove the building covering `cell`.
    pub fn try_remove<V>(
        &mut self,
        cell: GridIndex,
        visuals: &mut V,
    ) -> Result<BuildingId, PlacementError>
    where
        V: StructureVisuals<Handle = H>,
    {
        let Some(id) = self.footprints.owner_at(cell) else {
            return Err(PlacementError::Empty { cell });
        };
        self.demolish(id, visuals);
        Ok(id)
    }

    /// Remove a building by id. Returns false for unknown ids.
    pub fn remove_building<V>(&mut self, id: BuildingId, visuals: &mut V) -> bool
    where
        V: StructureVisuals<Handle = H>,
    {
        self.demolish(id, visuals).is_some()
    }

    fn commit<V>(
        &mut self,
        def: &StructureDef,
        pivot: GridIndex,
        facing: Facing,
        cells: Vec<GridIndex>,
        visuals: &mut V,
    ) -> (BuildingId, RebuildStats)
    where
        V: StructureVisuals<Handle = H>,
    {
        let visual = visuals.spawn_structure(def, pivot, facing);
        let id = BuildingId(self.next_id);
        self.next_id += 1;

        let displaced = self.footprints.register(cells, id, OverwritePolicy::Exclusive);
        debug_assert!(displaced.is_empty(), "commit over occupied cells: {displaced:?}");

        let connector_cells = def.connector_cells(pivot, facing);
        let has_connectors = !connector_cells.is_empty();
        let stats = if has_connectors {
            self.connectors.connect(id, connector_cells, visuals)
        } else {
            RebuildStats::default()
        };

        self.buildings.insert(
            id,
            PlacedBuilding {
                id,
                structure: def.name.clone(),
                pivot,
                facing,
                visual,
                has_connectors,
            },
        );
        (id, stats)
    }

    fn demolish<V>(
        &mut self,
        id: BuildingId,
        visuals: &mut V,
    ) -> Option<(PlacedBuilding<H>, RebuildStats)>
    where
        V: StructureVisuals<Handle = H>,
    {
        let building = self.buildings.remove(&id)?;
        self.footprints.free_all(id);
        visuals.despawn(building.visual);
        let stats = if building.has_connectors {
            self.connectors.disconnect(id, visuals)
        } else {
            RebuildStats::default()
        };
        Some((building, stats))
    }

    /// Cells that would make placing `def` fail: occupied footprint cells
    /// first, then connector cells already held, each listed once.
    pub fn blocked_cells(
        &self,
        def: &StructureDef,
        pivot: GridIndex,
        facing: Facing,
    ) -> Vec<GridIndex> {
        let mut seen = HashSet::new();
        let footprint = def
            .footprint_cells(pivot, facing)
            .into_iter()
            .filter(|&c| !self.footprints.is_free(c));
        let connectors = self.connectors.claimed(def.connector_cells(pivot, facing));
        footprint
            .chain(connectors)
            .filter(|&c| seen.insert(c))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn building(&self, id: BuildingId) -> Option<&PlacedBuilding<H>> {
        self.buildings.get(&id)
    }

    pub fn building_at(&self, cell: GridIndex) -> Option<&PlacedBuilding<H>> {
        self.footprints
            .owner_at(cell)
            .and_then(|id| self.buildings.get(&id))
    }

    pub fn cells_of(&self, id: BuildingId) -> HashSet<GridIndex> {
        self.footprints.cells_of(id)
    }

    pub fn is_free(&self, cell: GridIndex) -> bool {
        self.footprints.is_free(cell)
    }

    pub fn all_free(&self, cells: impl IntoIterator<Item = GridIndex>) -> bool {
        self.footprints.all_free(cells)
    }

    pub fn obstructed(&self, cells: impl IntoIterator<Item = GridIndex>) -> HashSet<GridIndex> {
        self.footprints.obstructed(cells)
    }

    pub fn unobstructed(&self, cells: impl IntoIterator<Item = GridIndex>) -> HashSet<GridIndex> {
        self.footprints.unobstructed(cells)
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &PlacedBuilding<H>> {
        self.buildings.values()
    }

    pub fn footprints(&self) -> &TileRegistry<BuildingId> {
        &self.footprints
    }

    pub fn connectors(&self) -> &ConnectorNetwork<H> {
        &self.connectors
    }
}
