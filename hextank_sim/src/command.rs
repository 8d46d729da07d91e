// Commands that mutate a tank site.
//
// All host-driven changes to a `TankSite` go through `TankCommand`: block
// edits, setup clicks, pumped transfers and container use. The site is a
// pure function `(state, commands) -> (new_state, events)`; commands are the
// input.
//
// A `TankCommand` carries a `tick` (when to apply) and a `TankAction`:
// - `PlaceBlock` / `RemoveBlock` edit one cell. The site runs the valve
//   destruction hook and neighbor-change re-validation around the edit.
// - `SetupMultiTank`: a player clicks a valve face with the manipulator.
// - `Fill` / `Drain`: a pipe on `face` pushes or pulls fluid.
// - `UseValve`: a player uses a held container on a valve.
//
// See also: `site.rs` for `apply_command()` which dispatches these,
// `event.rs` for what comes out.

use crate::fluid::{FluidContainer, FluidStack};
use crate::types::{BlockKind, Face, VoxelCoord};
use serde::{Deserialize, Serialize};

/// A host-issued command targeting a specific site tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankCommand {
    pub tick: u64,
    pub action: TankAction,
}

/// The specific action a command performs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TankAction {
    /// Place `block` at `coord`, replacing whatever is there.
    PlaceBlock { coord: VoxelCoord, block: BlockKind },
    /// Clear the cell at `coord`.
    RemoveBlock { coord: VoxelCoord },
    /// Click `face` of the valve at `valve` to form a tank.
    SetupMultiTank { valve: VoxelCoord, face: Face },
    /// Pump `fluid` in through `face`.
    Fill {
        valve: VoxelCoord,
        face: Face,
        fluid: FluidStack,
    },
    /// Pull up to `max_amount` out through `face`.
    Drain {
        valve: VoxelCoord,
        face: Face,
        max_amount: u32,
    },
    /// Use the held container on the valve.
    UseValve { valve: VoxelCoord, held: FluidContainer },
}
