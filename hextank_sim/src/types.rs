// Core types shared across the tank library.
//
// Defines spatial coordinates (`VoxelCoord`), block faces (`Face`), the four
// growth orientations a tank can take (`Orientation`), the tagged block
// variant stored in every grid cell (`BlockKind` + `Voxel`), and the fluid
// identity newtype (`FluidId`). All types derive `Serialize` and
// `Deserialize` for save/load.
//
// The block variant replaces type-check chains: the validator consumes it
// through exhaustive `match`, so a new block kind forces every rule to decide
// what it means for that kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 3D voxel grid. Each component is in voxel units.
///
/// The coordinate system follows the host world:
/// - X: east  (positive) / west  (negative)
/// - Y: up    (positive) / down  (negative)
/// - Z: south (positive) / north (negative)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Unit vector pointing up (+Y).
    pub const UP: Self = Self::new(0, 1, 0);

    /// Component-wise multiplication by a scalar. Used to walk `n` steps
    /// along a unit direction.
    pub fn scaled(self, n: i32) -> Self {
        Self::new(self.x * n, self.y * n, self.z * n)
    }
}

impl Add for VoxelCoord {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six faces of a block. Used both for the face a player clicked
/// during setup and for the side fluid is pumped in from or out to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// -Y
    Down,
    /// +Y
    Up,
    /// -Z
    North,
    /// +Z
    South,
    /// -X
    West,
    /// +X
    East,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    /// Unit offset from a block to its neighbor across this face.
    pub fn offset(self) -> VoxelCoord {
        match self {
            Face::Down => VoxelCoord::new(0, -1, 0),
            Face::Up => VoxelCoord::new(0, 1, 0),
            Face::North => VoxelCoord::new(0, 0, -1),
            Face::South => VoxelCoord::new(0, 0, 1),
            Face::West => VoxelCoord::new(-1, 0, 0),
            Face::East => VoxelCoord::new(1, 0, 0),
        }
    }
}

/// Direction in which a tank's depth grows away from the valve that set it
/// up. Fixed at setup time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Depth grows along +X.
    XPos,
    /// Depth grows along -X.
    XNeg,
    /// Depth grows along +Z.
    ZPos,
    /// Depth grows along -Z.
    ZNeg,
}

impl Orientation {
    /// Orientation produced by clicking the given face of a valve. The tank
    /// grows away from the clicked face, into the block's back side. Top and
    /// bottom faces never form a tank.
    pub fn from_clicked_face(face: Face) -> Option<Self> {
        match face {
            Face::North => Some(Orientation::ZPos),
            Face::South => Some(Orientation::ZNeg),
            Face::West => Some(Orientation::XPos),
            Face::East => Some(Orientation::XNeg),
            Face::Up | Face::Down => None,
        }
    }

    /// Stable integer code used in persisted records.
    pub fn code(self) -> i32 {
        match self {
            Orientation::XPos => 0,
            Orientation::XNeg => 1,
            Orientation::ZPos => 2,
            Orientation::ZNeg => 3,
        }
    }

    /// Inverse of [`Orientation::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Orientation::XPos),
            1 => Some(Orientation::XNeg),
            2 => Some(Orientation::ZPos),
            3 => Some(Orientation::ZNeg),
            _ => None,
        }
    }

    /// True if depth grows along the X axis.
    pub fn is_x_axis(self) -> bool {
        matches!(self, Orientation::XPos | Orientation::XNeg)
    }

    /// Unit step along the growth axis.
    pub fn depth_step(self) -> VoxelCoord {
        match self {
            Orientation::XPos => VoxelCoord::new(1, 0, 0),
            Orientation::XNeg => VoxelCoord::new(-1, 0, 0),
            Orientation::ZPos => VoxelCoord::new(0, 0, 1),
            Orientation::ZNeg => VoxelCoord::new(0, 0, -1),
        }
    }

    /// Unit step along the width axis, pointing to the positive side. Width
    /// runs along Z for X-axis tanks and along X for Z-axis tanks.
    pub fn lateral_step(self) -> VoxelCoord {
        if self.is_x_axis() {
            VoxelCoord::new(0, 0, 1)
        } else {
            VoxelCoord::new(1, 0, 0)
        }
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// What occupies a grid cell, as far as tank logic cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Nothing there.
    Empty,
    /// The invisible block that carries a tank's fill visualization.
    RenderProxy,
    /// Tempered glass, a valid tank wall.
    GlassWall,
    /// Any dedicated multi-tank wall block.
    WallMaterial,
    /// A tank valve. `rotated` is the block's rotation bit: unset means the
    /// valve faces along X, set means it faces along Z.
    Valve { rotated: bool },
    /// Anything else in the world.
    Other,
}

/// A single grid cell: the block plus its tank-membership flag.
///
/// `is_part` is set on every cell of a committed structure (walls, glass and
/// valves alike) and cleared on teardown. Setup refuses cells that already
/// carry it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voxel {
    pub kind: BlockKind,
    #[serde(default)]
    pub is_part: bool,
}

impl Voxel {
    pub const EMPTY: Self = Self::new(BlockKind::Empty);

    pub const fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            is_part: false,
        }
    }

    pub const fn valve(rotated: bool) -> Self {
        Self::new(BlockKind::Valve { rotated })
    }

    /// True for cells a probe may pass through: empty space or a render proxy.
    pub fn is_clear(self) -> bool {
        matches!(self.kind, BlockKind::Empty | BlockKind::RenderProxy)
    }

    pub fn is_valve(self) -> bool {
        matches!(self.kind, BlockKind::Valve { .. })
    }

    /// Rotation bit of a valve cell; `None` for every other block.
    pub fn valve_rotation(self) -> Option<bool> {
        match self.kind {
            BlockKind::Valve { rotated } => Some(rotated),
            _ => None,
        }
    }
}

impl Default for Voxel {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ---------------------------------------------------------------------------
// Fluids
// ---------------------------------------------------------------------------

/// Registry name of a fluid (e.g. `"water"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FluidId(pub String);

impl FluidId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FluidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clicked_face_maps_to_opposite_growth() {
        assert_eq!(Orientation::from_clicked_face(Face::North), Some(Orientation::ZPos));
        assert_eq!(Orientation::from_clicked_face(Face::South), Some(Orientation::ZNeg));
        assert_eq!(Orientation::from_clicked_face(Face::West), Some(Orientation::XPos));
        assert_eq!(Orientation::from_clicked_face(Face::East), Some(Orientation::XNeg));
        assert_eq!(Orientation::from_clicked_face(Face::Up), None);
        assert_eq!(Orientation::from_clicked_face(Face::Down), None);
    }

    #[test]
    fn growth_points_away_from_clicked_face() {
        // Clicking a face means the player stands outside it, so the tank
        // extends in the opposite direction of that face's offset.
        for face in Face::ALL {
            if let Some(orientation) = Orientation::from_clicked_face(face) {
                assert_eq!(orientation.depth_step().scaled(-1), face.offset());
            }
        }
    }

    #[test]
    fn orientation_codes_roundtrip() {
        for o in [
            Orientation::XPos,
            Orientation::XNeg,
            Orientation::ZPos,
            Orientation::ZNeg,
        ] {
            assert_eq!(Orientation::from_code(o.code()), Some(o));
        }
        assert_eq!(Orientation::from_code(-1), None);
        assert_eq!(Orientation::from_code(4), None);
    }

    #[test]
    fn lateral_step_is_perpendicular_to_depth() {
        for o in [
            Orientation::XPos,
            Orientation::XNeg,
            Orientation::ZPos,
            Orientation::ZNeg,
        ] {
            let d = o.depth_step();
            let l = o.lateral_step();
            assert_eq!(d.x * l.x + d.y * l.y + d.z * l.z, 0);
        }
    }

    #[test]
    fn clear_cells_are_empty_or_proxy() {
        assert!(Voxel::EMPTY.is_clear());
        assert!(Voxel::new(BlockKind::RenderProxy).is_clear());
        assert!(!Voxel::new(BlockKind::GlassWall).is_clear());
        assert!(!Voxel::valve(false).is_clear());
        assert!(!Voxel::new(BlockKind::Other).is_clear());
    }

    #[test]
    fn voxel_serialization_roundtrip() {
        let mut voxel = Voxel::valve(true);
        voxel.is_part = true;
        let json = serde_json::to_string(&voxel).unwrap();
        let restored: Voxel = serde_json::from_str(&json).unwrap();
        assert_eq!(voxel, restored);
    }

    #[test]
    fn voxel_coord_add_and_scale() {
        let a = VoxelCoord::new(1, 2, 3);
        let b = VoxelCoord::new(3, -4, 5);
        assert_eq!(a + b, VoxelCoord::new(4, -2, 8));
        assert_eq!(b.scaled(-2), VoxelCoord::new(-6, 8, -10));
        assert_eq!(a.to_string(), "(1, 2, 3)");
    }
}
