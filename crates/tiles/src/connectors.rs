//! Connector topology: arms and junctions derived from neighbour occupancy.
//!
//! Structures may declare connector cells (pipe inlets, road stubs). Those
//! cells live in their own [`TileRegistry`], separate from building
//! footprints. Each connector cell carries up to four arms, one per linked
//! cardinal neighbour, plus a junction piece unless the links form a straight
//! pass-through (exactly N+S or exactly E+W).
//!
//! After any change to connector occupancy only the *dirty set* is rebuilt:
//! the changed cells plus their occupied cardinal neighbours. Each cell's
//! pieces depend only on registry occupancy, so the order of the dirty set
//! does not matter and a second rebuild over unchanged occupancy is a no-op.

use std::collections::{HashMap, HashSet, VecDeque};

use bevy::prelude::*;

use crate::buildings::BuildingId;
use crate::grid_index::{Facing, GridIndex};
use crate::registry::{OverwritePolicy, TileRegistry};
use crate::visuals::StructureVisuals;

/// Which cardinal neighbours of a connector cell are connector cells too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Links {
    pub north: bool,
    pub east: bool,
    pub south: bool,
    pub west: bool,
}

impl Links {
    pub fn get(&self, direction: Facing) -> bool {
        match direction {
            Facing::North => self.north,
            Facing::East => self.east,
            Facing::South => self.south,
            Facing::West => self.west,
        }
    }

    pub fn count(&self) -> usize {
        [self.north, self.east, self.south, self.west]
            .into_iter()
            .filter(|&l| l)
            .count()
    }

    /// A junction is needed everywhere except on a straight pass-through.
    /// Dead ends and isolated cells get one as an end cap.
    pub fn needs_junction(&self) -> bool {
        let north_south = self.north && self.south && !self.east && !self.west;
        let east_west = self.east && self.west && !self.north && !self.south;
        !(north_south || east_west)
    }
}

/// Visual pieces currently spawned for one connector cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorPieces<H> {
    arms: [Option<H>; 4],
    pub junction: Option<H>,
}

impl<H: Copy> Default for ConnectorPieces<H> {
    fn default() -> Self {
        Self {
            arms: [None; 4],
            junction: None,
        }
    }
}

impl<H: Copy> ConnectorPieces<H> {
    pub fn arm(&self, direction: Facing) -> Option<H> {
        self.arms[usize::from(direction.quarter_turns())]
    }

    fn arm_mut(&mut self, direction: Facing) -> &mut Option<H> {
        &mut self.arms[usize::from(direction.quarter_turns())]
    }

    pub fn arm_count(&self) -> usize {
        self.arms.iter().filter(|a| a.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.junction.is_none() && self.arm_count() == 0
    }
}

/// Spawn/despawn totals from one rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RebuildStats {
    pub cells: usize,
    pub spawned: usize,
    pub despawned: usize,
}

impl RebuildStats {
    pub fn churn(&self) -> usize {
        self.spawned + self.despawned
    }

    pub(crate) fn merge(&mut self, other: RebuildStats) {
        self.cells += other.cells;
        self.spawned += other.spawned;
        self.despawned += other.despawned;
    }
}

#[derive(Debug, Clone)]
pub struct ConnectorNetwork<H> {
    registry: TileRegistry<BuildingId>,
    pieces: HashMap<GridIndex, ConnectorPieces<H>>,
}

impl<H> Default for ConnectorNetwork<H> {
    fn default() -> Self {
        Self {
            registry: TileRegistry::new(),
            pieces: HashMap::new(),
        }
    }
}

impl<H: Copy + Eq + std::fmt::Debug> ConnectorNetwork<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &TileRegistry<BuildingId> {
        &self.registry
    }

    pub fn is_connector(&self, cell: GridIndex) -> bool {
        !self.registry.is_free(cell)
    }

    pub fn pieces(&self, cell: GridIndex) -> Option<&ConnectorPieces<H>> {
        self.pieces.get(&cell)
    }

    /// Connector cells with at least one spawned piece.
    pub fn cells_with_pieces(&self) -> usize {
        self.pieces.len()
    }

    pub fn links(&self, cell: GridIndex) -> Links {
        let linked = |dir: Facing| self.is_connector(cell.neighbor(dir));
        Links {
            north: linked(Facing::North),
            east: linked(Facing::East),
            south: linked(Facing::South),
            west: linked(Facing::West),
        }
    }

    /// Claim `cells` as connector cells of `owner` and rebuild around them.
    ///
    /// The claim is transferring: cells held by another owner change hands
    /// and their pieces are respawned under `owner`. [`BuildingManager`]
    /// refuses such overlaps before calling this, so a transfer only happens
    /// when the network is driven directly.
    ///
    /// [`BuildingManager`]: crate::buildings::BuildingManager
    pub fn connect<V>(
        &mut self,
        owner: BuildingId,
        cells: impl IntoIterator<Item = GridIndex>,
        visuals: &mut V,
    ) -> RebuildStats
    where
        V: StructureVisuals<Handle = H>,
    {
        let cells: Vec<GridIndex> = cells.into_iter().collect();
        let taken: Vec<GridIndex> = cells
            .iter()
            .copied()
            .filter(|&c| self.registry.owner_at(c).is_some_and(|o| o != owner))
            .collect();
        self.registry
            .register(cells.iter().copied(), owner, OverwritePolicy::Transferring);

        let mut stats = RebuildStats::default();
        for cell in taken {
            stats.despawned += self.drop_pieces(cell, visuals);
        }
        let dirty = self.dirty_set(&cells);
        stats.merge(self.rebuild(dirty, visuals));
        stats
    }

    /// Connector cells among `cells` already held by some owner, in input
    /// order.
    pub fn claimed(&self, cells: impl IntoIterator<Item = GridIndex>) -> Vec<GridIndex> {
        let mut seen = HashSet::new();
        cells
            .into_iter()
            .filter(|&c| self.is_connector(c) && seen.insert(c))
            .collect()
    }

    /// Release every connector cell of `owner` and rebuild around them.
    pub fn disconnect<V>(&mut self, owner: BuildingId, visuals: &mut V) -> RebuildStats
    where
        V: StructureVisuals<Handle = H>,
    {
        let freed: Vec<GridIndex> = self.registry.free_all(owner).into_iter().collect();
        if freed.is_empty() {
            return RebuildStats::default();
        }
        let dirty = self.dirty_set(&freed);
        self.rebuild(dirty, visuals)
    }

    /// `changed` plus every occupied cardinal neighbour of a changed cell,
    /// each listed once.
    pub fn dirty_set(&self, changed: &[GridIndex]) -> Vec<GridIndex> {
        let mut seen: HashSet<GridIndex> = HashSet::new();
        let mut dirty = Vec::new();
        let mut queue: VecDeque<GridIndex> = changed.iter().copied().collect();

        while let Some(cell) = queue.pop_front() {
            if seen.insert(cell) {
                dirty.push(cell);
            }
            for (_, neighbor) in cell.neighbors4() {
                if self.is_connector(neighbor) && seen.insert(neighbor) {
                    dirty.push(neighbor);
                }
            }
        }
        dirty
    }

    /// Re-derive pieces for each cell in `dirty`.
    pub fn rebuild<V>(
        &mut self,
        dirty: impl IntoIterator<Item = GridIndex>,
        visuals: &mut V,
    ) -> RebuildStats
    where
        V: StructureVisuals<Handle = H>,
    {
        let mut stats = RebuildStats::default();
        for cell in dirty {
            stats.merge(self.rebuild_cell(cell, visuals));
        }
        debug!(
            "connector rebuild: {} cells, {} spawned, {} despawned",
            stats.cells, stats.spawned, stats.despawned
        );
        stats
    }

    /// Rebuild every connector cell. Mostly useful after bulk edits.
    pub fn rebuild_all<V>(&mut self, visuals: &mut V) -> RebuildStats
    where
        V: StructureVisuals<Handle = H>,
    {
        let mut cells: Vec<GridIndex> = self.registry.iter().map(|(c, _)| c).collect();
        cells.extend(self.pieces.keys().copied().filter(|&c| self.registry.is_free(c)));
        self.rebuild(cells, visuals)
    }

    fn rebuild_cell<V>(&mut self, cell: GridIndex, visuals: &mut V) -> RebuildStats
    where
        V: StructureVisuals<Handle = H>,
    {
        let mut stats = RebuildStats {
            cells: 1,
            ..default()
        };

        let Some(owner) = self.registry.owner_at(cell) else {
            // No longer a connector cell: tear down whatever was left.
            stats.despawned += self.drop_pieces(cell, visuals);
            return stats;
        };

        let links = self.links(cell);
        let pieces = self.pieces.entry(cell).or_default();

        for direction in Facing::ALL {
            let slot = pieces.arm_mut(direction);
            match (links.get(direction), *slot) {
                (true, None) => {
                    *slot = Some(visuals.spawn_connector(owner, cell, direction));
                    stats.spawned += 1;
                }
                (false, Some(handle)) => {
                    visuals.despawn(handle);
                    *slot = None;
                    stats.despawned += 1;
                }
                _ => {}
            }
        }

        match (links.needs_junction(), pieces.junction) {
            (true, None) => {
                pieces.junction = Some(visuals.spawn_junction(owner, cell));
                stats.spawned += 1;
            }
            (false, Some(handle)) => {
                visuals.despawn(handle);
                pieces.junction = None;
                stats.despawned += 1;
            }
            _ => {}
        }

        stats
    }

    fn drop_pieces<V>(&mut self, cell: GridIndex, visuals: &mut V) -> usize
    where
        V: StructureVisuals<Handle = H>,
    {
        let Some(pieces) = self.pieces.remove(&cell) else {
            return 0;
        };
        let mut despawned = 0;
        for handle in pieces.arms.into_iter().flatten().chain(pieces.junction) {
            visuals.despawn(handle);
            despawned += 1;
        }
        despawned
    }
}
