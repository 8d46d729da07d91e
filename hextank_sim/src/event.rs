// Tank site events: what a batch of commands did.
//
// `TankSite::step()` returns one `TankEvent` per observable outcome, in the
// order they happened. Hosts use them to play sounds, update GUIs and sync
// clients. Transfers that moved nothing produce no event.
//
// See also: `site.rs` which emits these, `command.rs` for the inputs.

use crate::fluid::{FluidContainer, FluidStack};
use crate::types::{Face, VoxelCoord};
use serde::{Deserialize, Serialize};

/// Something that happened at a given tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankEvent {
    pub tick: u64,
    pub kind: TankEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TankEventKind {
    /// A tank was committed with `master` as its master valve.
    StructureFormed {
        master: VoxelCoord,
        capacity: u32,
        render_coord: VoxelCoord,
    },
    /// A setup click did not form a tank.
    SetupRejected { valve: VoxelCoord, face: Face },
    /// The tank mastered at `master` was dissolved.
    StructureTornDown { master: VoxelCoord },
    /// `fluid` was accepted through the valve.
    FluidFilled { valve: VoxelCoord, fluid: FluidStack },
    /// `fluid` left through the valve.
    FluidDrained { valve: VoxelCoord, fluid: FluidStack },
    /// A player's container was swapped for `held`.
    ContainerExchanged { valve: VoxelCoord, held: FluidContainer },
}

/// Output of one `TankSite::step()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepResult {
    pub events: Vec<TankEvent>,
}
