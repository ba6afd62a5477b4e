//! Coloured cell highlights for placement previews.
//!
//! [`Highlighter`] keeps one highlight visual per highlighted cell. Cells are
//! grouped by colour in a [`TileRegistry`] keyed by [`HighlightColor`], so a
//! cell carries at most one colour and moving a cell between colours is a
//! recolour rather than a despawn/spawn pair.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use tiles::grid_index::GridIndex;
use tiles::registry::{OverwritePolicy, TileRegistry};
use tiles::visuals::{CommandVisuals, HeadlessVisuals, VisualId, VisualKind};

use crate::config::HIGHLIGHT_LIFT;

/// 8-bit sRGBA colour. Doubles as the owner token of a highlight group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighlightColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HighlightColor {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<HighlightColor> for Color {
    fn from(c: HighlightColor) -> Self {
        Color::srgba_u8(c.r, c.g, c.b, c.a)
    }
}

pub trait HighlightVisuals {
    type Handle: Copy + Eq + Debug;

    fn spawn_highlight(&mut self, cell: GridIndex, color: HighlightColor) -> Self::Handle;
    fn recolor(&mut self, handle: Self::Handle, color: HighlightColor);
    fn despawn_highlight(&mut self, handle: Self::Handle);
}

// ---------------------------------------------------------------------------
// Visual implementations
// ---------------------------------------------------------------------------

/// Highlight quad over one cell. The tint lives in [`HighlightTint`] so a
/// recolour only replaces that component.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightTile {
    pub cell: GridIndex,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Deref)]
pub struct HighlightTint(pub HighlightColor);

impl HighlightVisuals for CommandVisuals<'_, '_, '_> {
    type Handle = Entity;

    fn spawn_highlight(&mut self, cell: GridIndex, color: HighlightColor) -> Entity {
        let mut transform = self.cell_transform(cell);
        transform.translation.y += HIGHLIGHT_LIFT;
        self.commands()
            .spawn((HighlightTile { cell }, HighlightTint(color), transform))
            .id()
    }

    fn recolor(&mut self, handle: Entity, color: HighlightColor) {
        if let Some(mut entity) = self.commands().get_entity(handle) {
            entity.insert(HighlightTint(color));
        }
    }

    fn despawn_highlight(&mut self, handle: Entity) {
        if let Some(mut entity) = self.commands().get_entity(handle) {
            entity.despawn();
        }
    }
}

impl HighlightVisuals for HeadlessVisuals {
    type Handle = VisualId;

    fn spawn_highlight(&mut self, cell: GridIndex, _color: HighlightColor) -> VisualId {
        self.spawn(VisualKind::Highlight, cell)
    }

    fn recolor(&mut self, handle: VisualId, _color: HighlightColor) {
        self.record_recolor(handle);
    }

    fn despawn_highlight(&mut self, handle: VisualId) {
        let was_live = self.despawn_id(handle);
        debug_assert!(was_live, "despawn of dead highlight {handle:?}");
    }
}

// ---------------------------------------------------------------------------
// Highlighter
// ---------------------------------------------------------------------------

/// Visual work done by one highlighter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightChurn {
    pub spawned: usize,
    pub recolored: usize,
    pub despawned: usize,
}

impl HighlightChurn {
    pub fn is_zero(&self) -> bool {
        self.spawned == 0 && self.recolored == 0 && self.despawned == 0
    }
}

#[derive(Debug, Clone)]
pub struct Highlighter<H> {
    colors: TileRegistry<HighlightColor>,
    handles: HashMap<GridIndex, H>,
}

impl<H> Default for Highlighter<H> {
    fn default() -> Self {
        Self {
            colors: TileRegistry::new(),
            handles: HashMap::new(),
        }
    }
}

impl<H: Copy + Eq + Debug> Highlighter<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `cells` exactly the set highlighted in `color`.
    ///
    /// Cells of other colours inside `cells` switch colour; their remaining
    /// cells are untouched. Cells that were `color` and are not in `cells`
    /// lose their highlight.
    pub fn set_highlights<V>(
        &mut self,
        cells: impl IntoIterator<Item = GridIndex>,
        color: HighlightColor,
        visuals: &mut V,
    ) -> HighlightChurn
    where
        V: HighlightVisuals<Handle = H>,
    {
        let mut seen = HashSet::new();
        let target: Vec<GridIndex> = cells.into_iter().filter(|c| seen.insert(*c)).collect();
        let before: Vec<Option<HighlightColor>> =
            target.iter().map(|&c| self.colors.owner_at(c)).collect();

        let stale = self.colors.free_all(color);
        self.colors
            .register(target.iter().copied(), color, OverwritePolicy::Transferring);

        let mut churn = HighlightChurn::default();
        for cell in stale {
            if !self.colors.is_free(cell) {
                continue;
            }
            if let Some(handle) = self.handles.remove(&cell) {
                visuals.despawn_highlight(handle);
                churn.despawned += 1;
            }
        }

        for (&cell, prev) in target.iter().zip(before) {
            match prev {
                None => {
                    let handle = visuals.spawn_highlight(cell, color);
                    self.handles.insert(cell, handle);
                    churn.spawned += 1;
                }
                Some(prev) if prev != color => {
                    if let Some(&handle) = self.handles.get(&cell) {
                        visuals.recolor(handle, color);
                        churn.recolored += 1;
                    }
                }
                Some(_) => {}
            }
        }

        debug_assert_eq!(self.handles.len(), self.colors.len());
        churn
    }

    /// Replace several colour groups at once. A cell moving between two of
    /// the groups is recoloured, never despawned and respawned. Later groups
    /// win cells listed twice.
    pub fn set_highlight_groups<V, C>(
        &mut self,
        groups: impl IntoIterator<Item = (C, HighlightColor)>,
        visuals: &mut V,
    ) -> HighlightChurn
    where
        V: HighlightVisuals<Handle = H>,
        C: IntoIterator<Item = GridIndex>,
    {
        let mut group_colors = Vec::new();
        let mut desired: HashMap<GridIndex, HighlightColor> = HashMap::new();
        for (cells, color) in groups {
            group_colors.push(color);
            desired.extend(cells.into_iter().map(|cell| (cell, color)));
        }
        let before: HashMap<GridIndex, Option<HighlightColor>> = desired
            .keys()
            .map(|&cell| (cell, self.colors.owner_at(cell)))
            .collect();

        let mut stale = Vec::new();
        for &color in &group_colors {
            stale.extend(self.colors.free_all(color));
        }
        for &color in &group_colors {
            let cells = desired
                .iter()
                .filter(|(_, c)| **c == color)
                .map(|(cell, _)| *cell);
            self.colors
                .register(cells, color, OverwritePolicy::Transferring);
        }

        let mut churn = HighlightChurn::default();
        for cell in stale {
            if !self.colors.is_free(cell) {
                continue;
            }
            if let Some(handle) = self.handles.remove(&cell) {
                visuals.despawn_highlight(handle);
                churn.despawned += 1;
            }
        }
        for (&cell, &color) in &desired {
            match before.get(&cell).copied().flatten() {
                None => {
                    let handle = visuals.spawn_highlight(cell, color);
                    self.handles.insert(cell, handle);
                    churn.spawned += 1;
                }
                Some(prev) if prev != color => {
                    if let Some(&handle) = self.handles.get(&cell) {
                        visuals.recolor(handle, color);
                        churn.recolored += 1;
                    }
                }
                Some(_) => {}
            }
        }

        debug_assert_eq!(self.handles.len(), self.colors.len());
        churn
    }

    /// Remove every highlight of `color`. Returns the number despawned.
    pub fn clear_color<V>(&mut self, color: HighlightColor, visuals: &mut V) -> usize
    where
        V: HighlightVisuals<Handle = H>,
    {
        let freed = self.colors.free_all(color);
        let mut despawned = 0;
        for cell in freed {
            if let Some(handle) = self.handles.remove(&cell) {
                visuals.despawn_highlight(handle);
                despawned += 1;
            }
        }
        despawned
    }

    pub fn clear_all<V>(&mut self, visuals: &mut V) -> usize
    where
        V: HighlightVisuals<Handle = H>,
    {
        let despawned = self.handles.len();
        for (_, handle) in self.handles.drain() {
            visuals.despawn_highlight(handle);
        }
        self.colors.clear();
        despawned
    }

    pub fn color_at(&self, cell: GridIndex) -> Option<HighlightColor> {
        self.colors.owner_at(cell)
    }

    pub fn cells_of(&self, color: HighlightColor) -> HashSet<GridIndex> {
        self.colors.cells_of(color)
    }

    pub fn handle_at(&self, cell: GridIndex) -> Option<H> {
        self.handles.get(&cell).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Highlights shown in the world, with their entities.
#[derive(Resource, Debug, Default, Deref, DerefMut)]
pub struct HighlightOverlay(pub Highlighter<Entity>);

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: HighlightColor = HighlightColor::rgba(0, 255, 0, 128);
    const RED: HighlightColor = HighlightColor::rgba(255, 0, 0, 128);

    fn g(x: i32, y: i32) -> GridIndex {
        GridIndex::new(x, y)
    }

    fn row(xs: std::ops::Range<i32>) -> Vec<GridIndex> {
        xs.map(|x| g(x, 0)).collect()
    }

    #[test]
    fn test_spawn_then_idempotent() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();

        let churn = hl.set_highlights(row(0..3), GREEN, &mut v);
        assert_eq!(churn.spawned, 3);
        assert_eq!(v.live_of_kind(VisualKind::Highlight), 3);

        let churn = hl.set_highlights(row(0..3), GREEN, &mut v);
        assert!(churn.is_zero());
        assert_eq!(v.churn(), 3);
    }

    #[test]
    fn test_moving_footprint_only_touches_edges() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();
        hl.set_highlights(row(0..3), GREEN, &mut v);

        let churn = hl.set_highlights(row(1..4), GREEN, &mut v);
        assert_eq!(
            churn,
            HighlightChurn {
                spawned: 1,
                recolored: 0,
                despawned: 1
            }
        );
        assert_eq!(hl.color_at(g(0, 0)), None);
        assert_eq!(hl.color_at(g(3, 0)), Some(GREEN));
    }

    #[test]
    fn test_other_colour_recolours_overlap_only() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();
        hl.set_highlights(row(0..4), GREEN, &mut v);
        let handle = hl.handle_at(g(2, 0)).unwrap();

        let churn = hl.set_highlights([g(2, 0), g(3, 0), g(9, 9)], RED, &mut v);
        assert_eq!(churn.recolored, 2);
        assert_eq!(churn.spawned, 1);
        assert_eq!(churn.despawned, 0);
        assert_eq!(v.recolored, 2);

        // The handle survives the colour change.
        assert_eq!(hl.handle_at(g(2, 0)), Some(handle));
        assert_eq!(hl.cells_of(GREEN).len(), 2);
        assert_eq!(hl.cells_of(RED).len(), 3);
    }

    #[test]
    fn test_shrinking_group_keeps_cells_taken_by_other_colour() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();
        hl.set_highlights(row(0..2), RED, &mut v);
        // Green takes one red cell.
        hl.set_highlights([g(1, 0)], GREEN, &mut v);
        // Red empties: only (0,0) is despawned, (1,0) stays green.
        let churn = hl.set_highlights(Vec::<GridIndex>::new(), RED, &mut v);
        assert_eq!(churn.despawned, 1);
        assert_eq!(hl.color_at(g(1, 0)), Some(GREEN));
        assert_eq!(hl.len(), 1);
    }

    #[test]
    fn test_groups_swap_colours_without_respawn() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();
        hl.set_highlight_groups([(row(0..3), GREEN), (row(3..4), RED)], &mut v);
        assert_eq!(v.spawned, 4);

        // Every cell flips colour.
        let churn = hl.set_highlight_groups([(row(3..4), GREEN), (row(0..3), RED)], &mut v);
        assert_eq!(
            churn,
            HighlightChurn {
                spawned: 0,
                recolored: 4,
                despawned: 0
            }
        );

        let churn = hl.set_highlight_groups([(row(3..4), GREEN), (row(0..3), RED)], &mut v);
        assert!(churn.is_zero());

        // Shrinking both groups despawns the rest.
        let churn = hl.set_highlight_groups([(row(3..4), GREEN), (Vec::new(), RED)], &mut v);
        assert_eq!(churn.despawned, 3);
        assert_eq!(hl.len(), 1);
    }

    #[test]
    fn test_clear_color_and_clear_all() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();
        hl.set_highlights(row(0..3), GREEN, &mut v);
        hl.set_highlights(row(5..7), RED, &mut v);

        assert_eq!(hl.clear_color(RED, &mut v), 2);
        assert_eq!(hl.clear_color(RED, &mut v), 0);
        assert_eq!(hl.len(), 3);

        assert_eq!(hl.clear_all(&mut v), 3);
        assert!(hl.is_empty());
        assert_eq!(v.live_count(), 0);
    }

    #[test]
    fn test_duplicate_cells_spawn_once() {
        let mut hl = Highlighter::new();
        let mut v = HeadlessVisuals::new();
        let churn = hl.set_highlights([g(1, 1), g(1, 1)], GREEN, &mut v);
        assert_eq!(churn.spawned, 1);
        assert_eq!(hl.len(), 1);
    }

    #[test]
    fn test_color_conversion() {
        let color: Color = HighlightColor::rgba(255, 0, 0, 255).into();
        assert_eq!(color, Color::srgba_u8(255, 0, 0, 255));
    }
}
