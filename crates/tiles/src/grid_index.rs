//! Integer grid coordinates and cardinal facings.
//!
//! Coordinates are `i32` and wrap at its bounds: stepping east of `i32::MAX`
//! lands on `i32::MIN`. `North` points along `+y` and the
//! facings are ordered clockwise, so `East` is `+x`. Rotating an offset by a
//! facing is exact integer arithmetic; four quarter turns are always the
//! identity.

use std::fmt;
use std::ops::{Add, Sub};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridIndex {
    pub x: i32,
    pub y: i32,
}

impl GridIndex {
    pub const ZERO: GridIndex = GridIndex { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rotate this offset about `(0,0)` to face `facing`.
    ///
    /// One clockwise quarter turn maps `(x, y)` to `(y, -x)`.
    pub fn rotated(self, facing: Facing) -> Self {
        let mut v = self;
        for _ in 0..facing.quarter_turns() {
            v = GridIndex::new(v.y, v.x.wrapping_neg());
        }
        v
    }

    /// The adjacent cell one step towards `direction`.
    #[inline]
    pub fn neighbor(self, direction: Facing) -> Self {
        self + direction.offset()
    }

    /// The four cardinal neighbours in `Facing::ALL` order.
    pub fn neighbors4(self) -> [(Facing, GridIndex); 4] {
        Facing::ALL.map(|dir| (dir, self.neighbor(dir)))
    }
}

impl Add for GridIndex {
    type Output = GridIndex;

    fn add(self, rhs: GridIndex) -> GridIndex {
        GridIndex::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}

impl Sub for GridIndex {
    type Output = GridIndex;

    fn sub(self, rhs: GridIndex) -> GridIndex {
        GridIndex::new(self.x.wrapping_sub(rhs.x), self.y.wrapping_sub(rhs.y))
    }
}

impl From<(i32, i32)> for GridIndex {
    fn from((x, y): (i32, i32)) -> Self {
        GridIndex::new(x, y)
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Facing {
    #[default]
    North,
    East,
    South,
    West,
}

impl Facing {
    /// All facings in clockwise order starting from North.
    pub const ALL: [Facing; 4] = [Facing::North, Facing::East, Facing::South, Facing::West];

    pub fn rotated_cw(self) -> Self {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
        }
    }

    pub fn rotated_ccw(self) -> Self {
        match self {
            Facing::North => Facing::West,
            Facing::East => Facing::North,
            Facing::South => Facing::East,
            Facing::West => Facing::South,
        }
    }

    pub fn rotated(self, counter_clockwise: bool) -> Self {
        if counter_clockwise {
            self.rotated_ccw()
        } else {
            self.rotated_cw()
        }
    }

    pub fn opposite(self) -> Self {
        self.rotated_cw().rotated_cw()
    }

    /// Clockwise quarter turns past North (0..=3).
    pub fn quarter_turns(self) -> u8 {
        match self {
            Facing::North => 0,
            Facing::East => 1,
            Facing::South => 2,
            Facing::West => 3,
        }
    }

    /// Clockwise degrees past North: 0, 90, 180 or 270.
    pub fn degrees(self) -> f32 {
        f32::from(self.quarter_turns()) * 90.0
    }

    /// Unit step on the grid.
    pub fn offset(self) -> GridIndex {
        match self {
            Facing::North => GridIndex::new(0, 1),
            Facing::East => GridIndex::new(1, 0),
            Facing::South => GridIndex::new(0, -1),
            Facing::West => GridIndex::new(-1, 0),
        }
    }

    /// Orientation of a structure facing this way. Grid `+y` lies on world
    /// `+Z`, so a clockwise turn seen from above is a positive yaw.
    pub fn rotation(self) -> Quat {
        Quat::from_rotation_y(self.degrees().to_radians())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_offsets() -> Vec<GridIndex> {
        let mut out = Vec::new();
        for x in -3..=3 {
            for y in -3..=3 {
                out.push(GridIndex::new(x, y));
            }
        }
        out.push(GridIndex::new(i32::from(i16::MAX), -17));
        out
    }

    #[test]
    fn test_four_quarter_turns_are_identity() {
        for facing in Facing::ALL {
            for v in sample_offsets() {
                let r = v
                    .rotated(facing)
                    .rotated(facing)
                    .rotated(facing)
                    .rotated(facing);
                assert_eq!(r, v, "{v} rotated four times by {facing:?}");
            }
        }
    }

    #[test]
    fn test_rotation_sends_north_unit_to_facing_offset() {
        let north = Facing::North.offset();
        for facing in Facing::ALL {
            assert_eq!(north.rotated(facing), facing.offset());
        }
    }

    #[test]
    fn test_rotation_examples() {
        let v = GridIndex::new(2, 1);
        assert_eq!(v.rotated(Facing::North), GridIndex::new(2, 1));
        assert_eq!(v.rotated(Facing::East), GridIndex::new(1, -2));
        assert_eq!(v.rotated(Facing::South), GridIndex::new(-2, -1));
        assert_eq!(v.rotated(Facing::West), GridIndex::new(-1, 2));
    }

    #[test]
    fn test_facing_rotation_cycles() {
        for facing in Facing::ALL {
            assert_eq!(facing.rotated_cw().rotated_ccw(), facing);
            assert_eq!(facing.rotated(true), facing.rotated_ccw());
            assert_eq!(facing.rotated(false), facing.rotated_cw());
            assert_eq!(facing.opposite().opposite(), facing);
        }
        assert_eq!(Facing::North.rotated_ccw(), Facing::West);
        assert_eq!(Facing::West.rotated_cw(), Facing::North);
    }

    #[test]
    fn test_degrees() {
        let degs: Vec<f32> = Facing::ALL.iter().map(|f| f.degrees()).collect();
        assert_eq!(degs, vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn test_rotation_quat_turns_forward_towards_east() {
        let forward = Vec3::Z;
        let turned = Facing::East.rotation() * forward;
        assert!((turned - Vec3::X).length() < 1e-5, "got {turned:?}");
    }

    #[test]
    fn test_neighbors4_order() {
        let c = GridIndex::new(5, -2);
        let n = c.neighbors4();
        assert_eq!(n[0], (Facing::North, GridIndex::new(5, -1)));
        assert_eq!(n[1], (Facing::East, GridIndex::new(6, -2)));
        assert_eq!(n[2], (Facing::South, GridIndex::new(5, -3)));
        assert_eq!(n[3], (Facing::West, GridIndex::new(4, -2)));
    }

    #[test]
    fn test_edge_of_grid_wraps() {
        let corner = GridIndex::new(i32::MAX, i32::MIN);
        let around = corner.neighbors4();
        assert_eq!(around[0].1, GridIndex::new(i32::MAX, i32::MIN + 1));
        assert_eq!(around[1].1, GridIndex::new(i32::MIN, i32::MIN));
        assert_eq!(around[2].1, GridIndex::new(i32::MAX, i32::MAX));
        assert_eq!(around[1].1 - Facing::East.offset(), corner);

        let far = GridIndex::new(i32::MIN, 3);
        assert_eq!(far.rotated(Facing::East), GridIndex::new(3, i32::MIN));
        assert_eq!(far.rotated(Facing::South), GridIndex::new(i32::MIN, -3));
        for facing in Facing::ALL {
            let r = far.rotated(facing).rotated(facing).rotated(facing).rotated(facing);
            assert_eq!(r, far);
        }
    }
}
