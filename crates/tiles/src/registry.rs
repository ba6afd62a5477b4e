//! Two-way cell ownership registry.
//!
//! [`TileRegistry`] keeps a `cell -> owner` map and an `owner -> cells` map in
//! lockstep. Every mutation goes through the private `assign` / `unassign`
//! pair, so after any public call:
//!
//! - `cell ∈ cells_of(o)` exactly when `owner_at(cell) == Some(o)`,
//! - no cell has two owners,
//! - no owner is listed with an empty cell set.
//!
//! How a claim on an already-owned cell is resolved is chosen per call with
//! [`OverwritePolicy`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::grid_index::GridIndex;

/// Conflict resolution for [`TileRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverwritePolicy {
    /// Any owner touched by the claim loses all of its cells, and the
    /// claiming owner's previous cells are replaced wholesale.
    Exclusive,
    /// Only the overlapping cells change hands. The claiming owner keeps its
    /// previous cells and accumulates the new ones.
    Transferring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRegistry<O>
where
    O: Copy + Eq + Hash,
{
    cell_to_owner: HashMap<GridIndex, O>,
    owner_to_cells: HashMap<O, HashSet<GridIndex>>,
}

impl<O> Default for TileRegistry<O>
where
    O: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self {
            cell_to_owner: HashMap::new(),
            owner_to_cells: HashMap::new(),
        }
    }
}

impl<O> TileRegistry<O>
where
    O: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Claim `cells` for `owner` and return the other owners that lost cells
    /// to the claim, each listed once in the order they were first hit.
    ///
    /// An empty `cells` is a no-op under both policies.
    pub fn register(
        &mut self,
        cells: impl IntoIterator<Item = GridIndex>,
        owner: O,
        policy: OverwritePolicy,
    ) -> Vec<O> {
        let mut seen = HashSet::new();
        let cells: Vec<GridIndex> = cells.into_iter().filter(|c| seen.insert(*c)).collect();
        if cells.is_empty() {
            return Vec::new();
        }

        let mut displaced = Vec::new();
        match policy {
            OverwritePolicy::Exclusive => {
                for &cell in &cells {
                    if let Some(prev) = self.owner_at(cell) {
                        if prev != owner {
                            displaced.push(prev);
                            self.free_all(prev);
                        }
                    }
                }
                self.free_all(owner);
                for cell in cells {
                    self.assign(cell, owner);
                }
            }
            OverwritePolicy::Transferring => {
                for cell in cells {
                    match self.owner_at(cell) {
                        Some(prev) if prev == owner => continue,
                        Some(prev) => {
                            self.unassign(cell);
                            if !displaced.contains(&prev) {
                                displaced.push(prev);
                            }
                        }
                        None => {}
                    }
                    self.assign(cell, owner);
                }
            }
        }

        self.debug_check();
        displaced
    }

    /// Release a single cell. Returns whether it was occupied.
    pub fn free(&mut self, cell: GridIndex) -> bool {
        let freed = self.unassign(cell).is_some();
        self.debug_check();
        freed
    }

    /// Release every cell held by `owner` and return them. Unknown owners
    /// yield an empty set.
    pub fn free_all(&mut self, owner: O) -> HashSet<GridIndex> {
        let Some(cells) = self.owner_to_cells.remove(&owner) else {
            return HashSet::new();
        };
        for cell in &cells {
            self.cell_to_owner.remove(cell);
        }
        self.debug_check();
        cells
    }

    /// Release each of `cells`; returns how many were actually occupied.
    pub fn free_cells(&mut self, cells: impl IntoIterator<Item = GridIndex>) -> usize {
        let freed = cells
            .into_iter()
            .filter(|&cell| self.unassign(cell).is_some())
            .count();
        self.debug_check();
        freed
    }

    pub fn clear(&mut self) {
        self.cell_to_owner.clear();
        self.owner_to_cells.clear();
    }

    fn assign(&mut self, cell: GridIndex, owner: O) {
        debug_assert!(
            !self.cell_to_owner.contains_key(&cell),
            "assign on occupied cell {cell}"
        );
        self.cell_to_owner.insert(cell, owner);
        self.owner_to_cells.entry(owner).or_default().insert(cell);
    }

    fn unassign(&mut self, cell: GridIndex) -> Option<O> {
        let owner = self.cell_to_owner.remove(&cell)?;
        if let Entry::Occupied(mut entry) = self.owner_to_cells.entry(owner) {
            entry.get_mut().remove(&cell);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
        Some(owner)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[inline]
    pub fn is_free(&self, cell: GridIndex) -> bool {
        !self.cell_to_owner.contains_key(&cell)
    }

    /// True when every cell is free (vacuously true for no cells).
    pub fn all_free(&self, cells: impl IntoIterator<Item = GridIndex>) -> bool {
        cells.into_iter().all(|cell| self.is_free(cell))
    }

    #[inline]
    pub fn owner_at(&self, cell: GridIndex) -> Option<O> {
        self.cell_to_owner.get(&cell).copied()
    }

    pub fn is_owner_of(&self, cell: GridIndex, owner: O) -> bool {
        self.owner_at(cell) == Some(owner)
    }

    pub fn cells_of(&self, owner: O) -> HashSet<GridIndex> {
        self.owner_to_cells.get(&owner).cloned().unwrap_or_default()
    }

    pub fn contains_owner(&self, owner: O) -> bool {
        self.owner_to_cells.contains_key(&owner)
    }

    /// Distinct owners of the given cells in first-seen order. Free cells are
    /// skipped.
    pub fn owners_of(&self, cells: impl IntoIterator<Item = GridIndex>) -> Vec<O> {
        let mut owners = Vec::new();
        for cell in cells {
            if let Some(owner) = self.owner_at(cell) {
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
            }
        }
        owners
    }

    /// The subset of `cells` that is currently occupied.
    pub fn obstructed(&self, cells: impl IntoIterator<Item = GridIndex>) -> HashSet<GridIndex> {
        cells.into_iter().filter(|&c| !self.is_free(c)).collect()
    }

    /// The subset of `cells` that is currently free.
    pub fn unobstructed(&self, cells: impl IntoIterator<Item = GridIndex>) -> HashSet<GridIndex> {
        cells.into_iter().filter(|&c| self.is_free(c)).collect()
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cell_to_owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_to_owner.is_empty()
    }

    pub fn owner_count(&self) -> usize {
        self.owner_to_cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridIndex, O)> + '_ {
        self.cell_to_owner.iter().map(|(&c, &o)| (c, o))
    }

    /// Whether the two maps agree with each other.
    pub fn is_consistent(&self) -> bool {
        let listed: usize = self.owner_to_cells.values().map(HashSet::len).sum();
        if listed != self.cell_to_owner.len() {
            return false;
        }
        self.owner_to_cells.iter().all(|(owner, cells)| {
            !cells.is_empty()
                && cells
                    .iter()
                    .all(|c| self.cell_to_owner.get(c) == Some(owner))
        })
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(self.is_consistent(), "TileRegistry maps out of sync");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn g(x: i32, y: i32) -> GridIndex {
        GridIndex::new(x, y)
    }

    fn set(cells: &[(i32, i32)]) -> HashSet<GridIndex> {
        cells.iter().map(|&c| c.into()).collect()
    }

    const A: u32 = 1;
    const B: u32 = 2;

    #[test]
    fn test_exclusive_overwrite_evicts_whole_owner() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(1, 0)], A, OverwritePolicy::Exclusive);
        let displaced = reg.register([g(1, 0), g(1, 1)], B, OverwritePolicy::Exclusive);

        assert_eq!(displaced, vec![A]);
        assert!(reg.cells_of(A).is_empty());
        assert!(!reg.contains_owner(A));
        assert_eq!(reg.cells_of(B), set(&[(1, 0), (1, 1)]));
        assert!(reg.is_free(g(0, 0)));
    }

    #[test]
    fn test_transferring_overwrite_moves_only_overlap() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(1, 0)], A, OverwritePolicy::Exclusive);
        let displaced = reg.register([g(1, 0), g(1, 1)], B, OverwritePolicy::Transferring);

        assert_eq!(displaced, vec![A]);
        assert_eq!(reg.cells_of(A), set(&[(0, 0)]));
        assert_eq!(reg.cells_of(B), set(&[(1, 0), (1, 1)]));
    }

    #[test]
    fn test_exclusive_reregister_replaces_own_cells() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(0, 1)], A, OverwritePolicy::Exclusive);
        let displaced = reg.register([g(5, 5)], A, OverwritePolicy::Exclusive);

        assert!(displaced.is_empty());
        assert_eq!(reg.cells_of(A), set(&[(5, 5)]));
        assert!(reg.is_free(g(0, 0)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_transferring_accumulates() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0)], A, OverwritePolicy::Transferring);
        reg.register([g(0, 0), g(3, 3)], A, OverwritePolicy::Transferring);
        assert_eq!(reg.cells_of(A), set(&[(0, 0), (3, 3)]));
    }

    #[test]
    fn test_empty_register_is_noop() {
        let mut reg: TileRegistry<u32> = TileRegistry::new();
        reg.register([], A, OverwritePolicy::Exclusive);
        reg.register([], B, OverwritePolicy::Transferring);
        assert!(reg.is_empty());
        assert_eq!(reg.owner_count(), 0);

        reg.register([g(1, 1)], A, OverwritePolicy::Exclusive);
        reg.register([], A, OverwritePolicy::Exclusive);
        assert_eq!(reg.cells_of(A), set(&[(1, 1)]));
    }

    #[test]
    fn test_duplicate_cells_in_claim() {
        let mut reg = TileRegistry::new();
        reg.register([g(2, 2), g(2, 2)], A, OverwritePolicy::Exclusive);
        assert_eq!(reg.len(), 1);
        reg.register([g(4, 4), g(4, 4)], A, OverwritePolicy::Transferring);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_free_single_cell_drops_empty_owner() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(1, 0)], A, OverwritePolicy::Exclusive);

        assert!(reg.free(g(0, 0)));
        assert!(!reg.free(g(0, 0)));
        assert_eq!(reg.cells_of(A), set(&[(1, 0)]));

        assert!(reg.free(g(1, 0)));
        assert!(!reg.contains_owner(A));
        assert_eq!(reg.owner_count(), 0);
    }

    #[test]
    fn test_free_all_and_unknown_owner() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(1, 0)], A, OverwritePolicy::Exclusive);
        assert!(reg.free_all(B).is_empty());
        assert_eq!(reg.free_all(A), set(&[(0, 0), (1, 0)]));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_free_cells_counts_occupied_only() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(1, 0)], A, OverwritePolicy::Exclusive);
        assert_eq!(reg.free_cells([g(0, 0), g(9, 9)]), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_plural_is_free_and_partitions() {
        let mut reg = TileRegistry::new();
        reg.register([g(1, 0)], A, OverwritePolicy::Exclusive);
        let candidate = [g(0, 0), g(1, 0), g(2, 0)];

        assert!(!reg.all_free(candidate));
        assert!(reg.all_free([g(0, 0), g(2, 0)]));
        assert!(reg.all_free([]));
        assert_eq!(reg.obstructed(candidate), set(&[(1, 0)]));
        assert_eq!(reg.unobstructed(candidate), set(&[(0, 0), (2, 0)]));
    }

    #[test]
    fn test_owners_of_is_distinct_and_skips_free() {
        let mut reg = TileRegistry::new();
        reg.register([g(0, 0), g(1, 0)], A, OverwritePolicy::Exclusive);
        reg.register([g(2, 0)], B, OverwritePolicy::Exclusive);
        let owners = reg.owners_of([g(1, 0), g(7, 7), g(2, 0), g(0, 0)]);
        assert_eq!(owners, vec![A, B]);
        assert!(reg.is_owner_of(g(2, 0), B));
        assert!(!reg.is_owner_of(g(2, 0), A));
    }

    #[test]
    fn test_randomized_ops_keep_maps_in_sync() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x7115);
        let mut reg: TileRegistry<u8> = TileRegistry::new();

        for _ in 0..2_000 {
            let owner: u8 = rng.gen_range(0..6);
            match rng.gen_range(0..5) {
                0 | 1 => {
                    let n = rng.gen_range(0..5);
                    let cells: Vec<GridIndex> = (0..n)
                        .map(|_| g(rng.gen_range(-4..4), rng.gen_range(-4..4)))
                        .collect();
                    let policy = if rng.gen_bool(0.5) {
                        OverwritePolicy::Exclusive
                    } else {
                        OverwritePolicy::Transferring
                    };
                    reg.register(cells, owner, policy);
                }
                2 => {
                    reg.free(g(rng.gen_range(-4..4), rng.gen_range(-4..4)));
                }
                3 => {
                    reg.free_all(owner);
                }
                _ => {
                    reg.free_cells([g(rng.gen_range(-4..4), 0), g(0, rng.gen_range(-4..4))]);
                }
            }

            assert!(reg.is_consistent());
            for (cell, owner) in reg.iter() {
                assert!(reg.cells_of(owner).contains(&cell));
            }
            for o in 0..6u8 {
                for cell in reg.cells_of(o) {
                    assert_eq!(reg.owner_at(cell), Some(o));
                }
            }
        }
    }
}
