//! The boundary to whatever materialises structures on screen.
//!
//! Placement and connector logic never touch meshes or scene graphs; they ask
//! a [`StructureVisuals`] implementation to spawn or despawn opaque handles.
//! Two implementations live here:
//!
//! - [`CommandVisuals`] spawns tagged ECS entities through `Commands`; a
//!   renderer attaches meshes to them by querying the marker components.
//! - [`HeadlessVisuals`] hands out counters and records churn, for server-side
//!   validation, benchmarks and tests.

use std::collections::HashMap;
use std::fmt::Debug;

use bevy::prelude::*;

use crate::buildings::BuildingId;
use crate::config::VISUAL_LIFT;
use crate::grid_index::{Facing, GridIndex};
use crate::plane::TilePlane;
use crate::structures::StructureDef;

pub trait StructureVisuals {
    type Handle: Copy + Eq + Debug;

    fn spawn_structure(&mut self, def: &StructureDef, pivot: GridIndex, facing: Facing)
        -> Self::Handle;

    /// One connector arm leaving `cell` towards `direction`.
    fn spawn_connector(&mut self, owner: BuildingId, cell: GridIndex, direction: Facing)
        -> Self::Handle;

    fn spawn_junction(&mut self, owner: BuildingId, cell: GridIndex) -> Self::Handle;

    fn despawn(&mut self, handle: Self::Handle);
}

// ---------------------------------------------------------------------------
// ECS implementation
// ---------------------------------------------------------------------------

/// Root entity of a placed structure.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct StructureVisual {
    pub name: String,
    pub pivot: GridIndex,
    pub facing: Facing,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorArm {
    pub owner: BuildingId,
    pub cell: GridIndex,
    pub direction: Facing,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorJunction {
    pub owner: BuildingId,
    pub cell: GridIndex,
}

pub struct CommandVisuals<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    plane: &'a TilePlane,
}

impl<'a, 'w, 's> CommandVisuals<'a, 'w, 's> {
    pub fn new(commands: &'a mut Commands<'w, 's>, plane: &'a TilePlane) -> Self {
        Self { commands, plane }
    }

    pub fn commands(&mut self) -> &mut Commands<'w, 's> {
        self.commands
    }

    pub fn plane(&self) -> &TilePlane {
        self.plane
    }

    /// Transform at the centre of `cell`, lifted off the plane.
    pub fn cell_transform(&self, cell: GridIndex) -> Transform {
        Transform::from_translation(self.plane.index_to_world(cell) + Vec3::Y * VISUAL_LIFT)
    }
}

impl StructureVisuals for CommandVisuals<'_, '_, '_> {
    type Handle = Entity;

    fn spawn_structure(&mut self, def: &StructureDef, pivot: GridIndex, facing: Facing) -> Entity {
        let transform = self.cell_transform(pivot).with_rotation(facing.rotation());
        self.commands
            .spawn((
                StructureVisual {
                    name: def.name.clone(),
                    pivot,
                    facing,
                },
                transform,
            ))
            .id()
    }

    fn spawn_connector(&mut self, owner: BuildingId, cell: GridIndex, direction: Facing) -> Entity {
        // The arm covers the half cell between the centre and the shared edge.
        let half_step = Vec3::new(
            direction.offset().x as f32,
            0.0,
            direction.offset().y as f32,
        ) * (self.plane.cell_size * 0.25);
        let mut transform = self.cell_transform(cell).with_rotation(direction.rotation());
        transform.translation += half_step;
        self.commands
            .spawn((
                ConnectorArm {
                    owner,
                    cell,
                    direction,
                },
                transform,
            ))
            .id()
    }

    fn spawn_junction(&mut self, owner: BuildingId, cell: GridIndex) -> Entity {
        let transform = self.cell_transform(cell);
        self.commands
            .spawn((ConnectorJunction { owner, cell }, transform))
            .id()
    }

    fn despawn(&mut self, handle: Entity) {
        if let Some(mut entity) = self.commands.get_entity(handle) {
            entity.despawn();
        }
    }
}

// ---------------------------------------------------------------------------
// Headless implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Structure,
    ConnectorArm(Facing),
    Junction,
    Highlight,
}

/// Visual factory that only keeps books.
#[derive(Debug, Default)]
pub struct HeadlessVisuals {
    next_id: u32,
    live: HashMap<VisualId, (VisualKind, GridIndex)>,
    pub spawned: usize,
    pub despawned: usize,
    pub recolored: usize,
}

impl HeadlessVisuals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: VisualKind, cell: GridIndex) -> VisualId {
        let id = VisualId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, (kind, cell));
        self.spawned += 1;
        id
    }

    /// Returns false when `id` was not live (double despawn).
    pub fn despawn_id(&mut self, id: VisualId) -> bool {
        let removed = self.live.remove(&id).is_some();
        if removed {
            self.despawned += 1;
        }
        removed
    }

    pub fn record_recolor(&mut self, id: VisualId) {
        debug_assert!(self.live.contains_key(&id), "recolor of dead visual {id:?}");
        self.recolored += 1;
    }

    pub fn is_live(&self, id: VisualId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_of_kind(&self, kind: VisualKind) -> usize {
        self.live.values().filter(|(k, _)| *k == kind).count()
    }

    /// Total spawns plus despawns so far.
    pub fn churn(&self) -> usize {
        self.spawned + self.despawned
    }
}

impl StructureVisuals for HeadlessVisuals {
    type Handle = VisualId;

    fn spawn_structure(&mut self, _def: &StructureDef, pivot: GridIndex, _facing: Facing) -> VisualId {
        self.spawn(VisualKind::Structure, pivot)
    }

    fn spawn_connector(&mut self, _owner: BuildingId, cell: GridIndex, direction: Facing) -> VisualId {
        self.spawn(VisualKind::ConnectorArm(direction), cell)
    }

    fn spawn_junction(&mut self, _owner: BuildingId, cell: GridIndex) -> VisualId {
        self.spawn(VisualKind::Junction, cell)
    }

    fn despawn(&mut self, handle: VisualId) {
        let was_live = self.despawn_id(handle);
        debug_assert!(was_live, "despawn of dead visual {handle:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_books() {
        let mut v = HeadlessVisuals::new();
        let a = v.spawn_junction(BuildingId(1), GridIndex::ZERO);
        let b = v.spawn_connector(BuildingId(1), GridIndex::ZERO, Facing::East);
        assert_ne!(a, b);
        assert_eq!(v.live_count(), 2);
        assert_eq!(v.live_of_kind(VisualKind::ConnectorArm(Facing::East)), 1);

        v.despawn(a);
        assert!(!v.is_live(a));
        assert!(!v.despawn_id(a));
        assert_eq!(v.churn(), 3);
    }
}
