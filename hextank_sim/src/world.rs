// Sparse 3D voxel grid for the tank world.
//
// `VoxelGrid` is the capability the tank logic is written against: read and
// write a cell's `Voxel`, and reach the `ValveBlock` stored alongside every
// valve cell. Nothing in the structure code assumes a particular world; hosts
// can implement the trait over their own storage.
//
// `VoxelWorld` is the bundled implementation. Cells live in a `BTreeMap`
// keyed by coordinate; unset coordinates read as `Empty`, and writing
// `Empty` removes the entry. Valve state lives in a second map and follows
// the block: placing a valve creates an `Unconfigured` record, replacing it
// with anything else drops the record, and rewriting a valve cell (rotation
// or membership flag) keeps it.
//
// Saves go through `WorldSave`, a flat list of cells with an optional
// `ValveRecord` each, since JSON maps cannot be keyed by coordinate.
//
// **Constraint: determinism.** Iteration is in coordinate order (`BTreeMap`),
// so every scan and every save of the same world is identical.

use crate::error::TankError;
use crate::types::{BlockKind, Voxel, VoxelCoord};
use crate::valve::{ValveBlock, ValveRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read/write access to blocks and valve state at integer coordinates.
pub trait VoxelGrid {
    /// The cell at `coord`; `Voxel::EMPTY` where nothing is set.
    fn voxel(&self, coord: VoxelCoord) -> Voxel;

    /// Replace the cell at `coord`.
    fn set_voxel(&mut self, coord: VoxelCoord, voxel: Voxel);

    /// Valve state at `coord`, if the cell is a valve.
    fn valve(&self, coord: VoxelCoord) -> Option<&ValveBlock>;

    /// Mutable valve state at `coord`, if the cell is a valve.
    fn valve_mut(&mut self, coord: VoxelCoord) -> Option<&mut ValveBlock>;

    /// Set or clear the tank-membership flag of a cell, keeping its block.
    /// Empty cells carry no flag.
    fn set_part(&mut self, coord: VoxelCoord, is_part: bool) {
        let mut voxel = self.voxel(coord);
        if voxel.is_clear() || voxel.is_part == is_part {
            return;
        }
        voxel.is_part = is_part;
        self.set_voxel(coord, voxel);
    }
}

/// Sparse voxel grid with per-valve state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WorldSave", into = "WorldSave")]
pub struct VoxelWorld {
    voxels: BTreeMap<VoxelCoord, Voxel>,
    valves: BTreeMap<VoxelCoord, ValveBlock>,
}

impl VoxelWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// All valves in coordinate order.
    pub fn valves(&self) -> impl Iterator<Item = (VoxelCoord, &ValveBlock)> {
        self.valves.iter().map(|(&coord, valve)| (coord, valve))
    }

    /// Coordinates of every master valve, in coordinate order.
    pub fn master_coords(&self) -> Vec<VoxelCoord> {
        self.valves
            .iter()
            .filter(|(_, valve)| valve.as_master().is_some())
            .map(|(&coord, _)| coord)
            .collect()
    }
}

impl VoxelGrid for VoxelWorld {
    fn voxel(&self, coord: VoxelCoord) -> Voxel {
        self.voxels.get(&coord).copied().unwrap_or(Voxel::EMPTY)
    }

    fn set_voxel(&mut self, coord: VoxelCoord, voxel: Voxel) {
        if voxel.is_valve() {
            self.valves.entry(coord).or_default();
        } else {
            self.valves.remove(&coord);
        }
        if voxel.kind == BlockKind::Empty {
            self.voxels.remove(&coord);
        } else {
            self.voxels.insert(coord, voxel);
        }
    }

    fn valve(&self, coord: VoxelCoord) -> Option<&ValveBlock> {
        self.valves.get(&coord)
    }

    fn valve_mut(&mut self, coord: VoxelCoord) -> Option<&mut ValveBlock> {
        self.valves.get_mut(&coord)
    }
}

// ---------------------------------------------------------------------------
// Save format
// ---------------------------------------------------------------------------

/// One saved cell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellSave {
    pub coord: VoxelCoord,
    pub voxel: Voxel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valve: Option<ValveRecord>,
}

/// Flat save format of a `VoxelWorld`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorldSave {
    pub cells: Vec<CellSave>,
}

impl From<VoxelWorld> for WorldSave {
    fn from(world: VoxelWorld) -> Self {
        let cells = world
            .voxels
            .iter()
            .map(|(&coord, &voxel)| CellSave {
                coord,
                voxel,
                valve: world.valves.get(&coord).map(|v| v.to_record(coord)),
            })
            .collect();
        WorldSave { cells }
    }
}

impl TryFrom<WorldSave> for VoxelWorld {
    type Error = TankError;

    fn try_from(save: WorldSave) -> Result<Self, TankError> {
        let mut world = VoxelWorld::new();
        for cell in save.cells {
            if cell.valve.is_some() && !cell.voxel.is_valve() {
                return Err(TankError::InvalidRecord {
                    coord: cell.coord,
                    reason: "valve record on a non-valve block".into(),
                });
            }
            world.set_voxel(cell.coord, cell.voxel);
            if let (Some(record), Some(valve)) = (&cell.valve, world.valve_mut(cell.coord)) {
                *valve = ValveBlock::from_record(cell.coord, record)?;
            }
        }
        Ok(world)
    }
}
