//! Placeable structure definitions.
//!
//! A [`StructureDef`] lists the cells a structure covers and the cells that
//! take part in the connector network, both as offsets from the pivot cell
//! when the structure faces North. The [`StructureCatalog`] resource holds the
//! definitions available to placement requests.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid_index::{Facing, GridIndex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureDef {
    pub name: String,
    #[serde(default = "pivot_only")]
    pub footprint: Vec<GridIndex>,
    #[serde(default)]
    pub connectors: Vec<GridIndex>,
}

fn pivot_only() -> Vec<GridIndex> {
    vec![GridIndex::ZERO]
}

impl StructureDef {
    /// A structure covering only its pivot cell, with no connectors.
    pub fn single_cell(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            footprint: pivot_only(),
            connectors: Vec::new(),
        }
    }

    pub fn with_footprint(mut self, offsets: impl IntoIterator<Item = (i32, i32)>) -> Self {
        self.footprint = offsets.into_iter().map(GridIndex::from).collect();
        self
    }

    pub fn with_connectors(mut self, offsets: impl IntoIterator<Item = (i32, i32)>) -> Self {
        self.connectors = offsets.into_iter().map(GridIndex::from).collect();
        self
    }

    pub fn has_connectors(&self) -> bool {
        !self.connectors.is_empty()
    }

    /// Grid cells covered when placed at `pivot` facing `facing`.
    pub fn footprint_cells(&self, pivot: GridIndex, facing: Facing) -> Vec<GridIndex> {
        transform_offsets(&self.footprint, pivot, facing)
    }

    /// Connector cells when placed at `pivot` facing `facing`.
    pub fn connector_cells(&self, pivot: GridIndex, facing: Facing) -> Vec<GridIndex> {
        transform_offsets(&self.connectors, pivot, facing)
    }
}

fn transform_offsets(offsets: &[GridIndex], pivot: GridIndex, facing: Facing) -> Vec<GridIndex> {
    offsets.iter().map(|o| o.rotated(facing) + pivot).collect()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Index of a definition inside the [`StructureCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureId(pub usize);

#[derive(Resource, Debug, Clone)]
pub struct StructureCatalog {
    defs: Vec<StructureDef>,
}

impl Default for StructureCatalog {
    /// The stock set: a pipe segment, a pump with one outlet, a 2x2 tank
    /// and an L-shaped depot.
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.add(StructureDef::single_cell("Pipe").with_connectors([(0, 0)]));
        catalog.add(
            StructureDef::single_cell("Pump")
                .with_footprint([(0, 0), (0, 1)])
                .with_connectors([(0, -1)]),
        );
        catalog.add(StructureDef::single_cell("Tank").with_footprint([(0, 0), (1, 0), (0, 1), (1, 1)]));
        catalog.add(
            StructureDef::single_cell("Depot").with_footprint([(0, 0), (1, 0), (2, 0), (0, 1)]),
        );
        catalog
    }
}

impl StructureCatalog {
    pub fn empty() -> Self {
        Self { defs: Vec::new() }
    }

    pub fn add(&mut self, def: StructureDef) -> StructureId {
        self.defs.push(def);
        StructureId(self.defs.len() - 1)
    }

    pub fn get(&self, id: StructureId) -> Option<&StructureDef> {
        self.defs.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<StructureId> {
        self.defs.iter().position(|d| d.name == name).map(StructureId)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &StructureDef)> {
        self.defs.iter().enumerate().map(|(i, d)| (StructureId(i), d))
    }
}
