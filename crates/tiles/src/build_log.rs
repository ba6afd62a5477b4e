//! Ring-buffer log of recent placement and removal outcomes.
//!
//! [`BuildLog`] keeps the last [`BUILD_LOG_CAPACITY`] outcomes handled by the
//! plugin systems, so UI and tests can inspect what happened without holding
//! event readers across frames.

use bevy::prelude::*;

use crate::buildings::BuildingId;
use crate::config::BUILD_LOG_CAPACITY;
use crate::grid_index::{Facing, GridIndex};
use crate::plugin::RejectReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildLogEntry {
    Placed {
        id: BuildingId,
        structure: String,
        pivot: GridIndex,
        facing: Facing,
    },
    Removed {
        id: BuildingId,
        structure: String,
    },
    Rejected {
        cell: GridIndex,
        reason: RejectReason,
    },
}

impl BuildLogEntry {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[derive(Resource, Debug, Clone)]
pub struct BuildLog {
    entries: Vec<BuildLogEntry>,
    capacity: usize,
}

impl Default for BuildLog {
    fn default() -> Self {
        Self::with_capacity(BUILD_LOG_CAPACITY)
    }
}

impl BuildLog {
    /// A log holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an outcome, evicting the oldest entry when full.
    pub fn push(&mut self, entry: BuildLogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    /// The last `n` entries, oldest first.
    pub fn last_n(&self, n: usize) -> &[BuildLogEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn latest(&self) -> Option<&BuildLogEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildLogEntry> {
        self.entries.iter()
    }

    pub fn rejections(&self) -> usize {
        self.entries.iter().filter(|e| e.is_rejection()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(n: u32) -> BuildLogEntry {
        BuildLogEntry::Removed {
            id: BuildingId(n),
            structure: "Pipe".into(),
        }
    }

    #[test]
    fn push_and_last_n() {
        let mut log = BuildLog::default();
        log.push(removed(1));
        log.push(BuildLogEntry::Rejected {
            cell: GridIndex::new(2, 3),
            reason: RejectReason::Placement(crate::buildings::PlacementError::EmptyFootprint),
        });

        let last = log.last_n(1);
        assert_eq!(last.len(), 1);
        assert!(last[0].is_rejection());
        assert_eq!(log.last_n(10).len(), 2);
        assert_eq!(log.rejections(), 1);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = BuildLog::default();
        let total = BUILD_LOG_CAPACITY as u32 + 6;
        for i in 0..total {
            log.push(removed(i));
        }
        assert_eq!(log.len(), BUILD_LOG_CAPACITY);
        assert_eq!(log.iter().next(), Some(&removed(6)));
        assert_eq!(log.latest(), Some(&removed(total - 1)));
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut log = BuildLog::with_capacity(0);
        log.push(removed(1));
        log.push(removed(2));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.latest(), Some(&removed(2)));
        log.clear();
        assert!(log.is_empty());
    }
}
