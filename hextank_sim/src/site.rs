// Tank site state and command loop.
//
// `TankSite` is the single source of truth for one host world's tanks: the
// voxel grid (blocks plus valve state), the live render proxies, the config
// and the current tick. The site is a pure function
// `(state, commands) -> (new_state, events)`.
//
// ## Block edits
//
// A cell edit runs, in order:
//   1. The destruction hook, if the edit removes or replaces a master valve
//      with something that is not a valve.
//   2. The edit itself.
//   3. Neighbor-change re-validation for every other master whose footprint,
//      grown by one cell, contains the edited coordinate. The set of masters
//      is taken before the edit.
//
// Everything else is forwarded to `TankStructureManager`.
//
// See also: `manager.rs` for the tank operations, `command.rs` and
// `event.rs` for the inputs and outputs.
//
// **Critical constraint: determinism.** Commands apply in slice order and
// re-validation visits masters in coordinate order, so the same commands on
// the same site always yield the same state and events.

use crate::command::{TankAction, TankCommand};
use crate::config::TankConfig;
use crate::error::TankError;
use crate::event::{StepResult, TankEvent, TankEventKind};
use crate::manager::{Revalidation, TankStructureManager};
use crate::render_proxy::ProxyRegistry;
use crate::types::{Voxel, VoxelCoord};
use crate::world::{VoxelGrid, VoxelWorld};
use serde::{Deserialize, Serialize};

/// One world's tanks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankSite {
    /// Tick of the last applied batch.
    pub tick: u64,
    pub config: TankConfig,
    pub world: VoxelWorld,
    pub proxies: ProxyRegistry,
}

impl TankSite {
    /// An empty site with the given config.
    pub fn new(config: TankConfig) -> Self {
        Self {
            tick: 0,
            config,
            world: VoxelWorld::new(),
            proxies: ProxyRegistry::new(),
        }
    }

    /// A manager over this site's world and proxies.
    pub fn manager(&mut self) -> TankStructureManager<'_, VoxelWorld, ProxyRegistry> {
        TankStructureManager::new(&mut self.world, &mut self.proxies, &self.config)
    }

    /// Apply a batch of commands and advance to `target_tick`.
    ///
    /// Commands must be sorted by tick. Commands with tick > `target_tick`
    /// are ignored (caller error).
    pub fn step(&mut self, commands: &[TankCommand], target_tick: u64) -> StepResult {
        let mut events = Vec::new();
        for command in commands.iter().filter(|c| c.tick <= target_tick) {
            self.tick = self.tick.max(command.tick);
            self.apply_command(command, &mut events);
        }
        self.tick = self.tick.max(target_tick);
        StepResult { events }
    }

    fn apply_command(&mut self, command: &TankCommand, events: &mut Vec<TankEvent>) {
        let tick = self.tick;
        let mut emit = |kind: TankEventKind| events.push(TankEvent { tick, kind });

        match &command.action {
            TankAction::PlaceBlock { coord, block } => {
                self.set_block(*coord, Voxel::new(*block), &mut emit);
            }
            TankAction::RemoveBlock { coord } => {
                self.set_block(*coord, Voxel::EMPTY, &mut emit);
            }
            TankAction::SetupMultiTank { valve, face } => {
                let mut manager = self.manager();
                if manager.setup_multi_tank(*valve, *face) {
                    let capacity = manager.capacity(*valve);
                    let render_coord = self
                        .world
                        .valve(*valve)
                        .and_then(|v| v.as_master())
                        .map_or(*valve, |m| m.render_coord);
                    emit(TankEventKind::StructureFormed {
                        master: *valve,
                        capacity,
                        render_coord,
                    });
                } else {
                    emit(TankEventKind::SetupRejected {
                        valve: *valve,
                        face: *face,
                    });
                }
            }
            TankAction::Fill { valve, face, fluid } => {
                let accepted = self.manager().fill(*valve, *face, fluid, false);
                if accepted > 0 {
                    emit(TankEventKind::FluidFilled {
                        valve: *valve,
                        fluid: fluid.with_amount(accepted),
                    });
                }
            }
            TankAction::Drain {
                valve,
                face,
                max_amount,
            } => {
                if let Some(fluid) = self.manager().drain(*valve, *face, *max_amount, false) {
                    emit(TankEventKind::FluidDrained {
                        valve: *valve,
                        fluid,
                    });
                }
            }
            TankAction::UseValve { valve, held } => {
                if let Some(held) = self.manager().use_valve(*valve, held) {
                    emit(TankEventKind::ContainerExchanged {
                        valve: *valve,
                        held,
                    });
                }
            }
        }
    }

    /// Replace the cell at `coord`, running the destruction hook and
    /// re-validating every master the edit could affect.
    fn set_block(&mut self, coord: VoxelCoord, voxel: Voxel, emit: &mut impl FnMut(TankEventKind)) {
        let affected: Vec<VoxelCoord> = self
            .world
            .valves()
            .filter_map(|(at, valve)| {
                let master = valve.as_master()?;
                master
                    .dimension
                    .footprint(at)
                    .expanded(1)
                    .contains(coord)
                    .then_some(at)
            })
            .collect();

        if !voxel.is_valve() && self.manager().valve_destroyed(coord) {
            emit(TankEventKind::StructureTornDown { master: coord });
        }

        self.world.set_voxel(coord, voxel);

        for master in affected {
            if self.manager().notify_structure_changed(master) == Revalidation::TornDown {
                emit(TankEventKind::StructureTornDown { master });
            }
        }
    }

    /// Serialize the whole site to JSON.
    pub fn to_json(&self) -> Result<String, TankError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a site saved with `to_json()`. The config is validated and
    /// every valve record is checked, including its extents against the
    /// saved `max_dimension`.
    pub fn from_json(json: &str) -> Result<Self, TankError> {
        let site: TankSite = serde_json::from_str(json)?;
        site.config.validate()?;
        for (coord, valve) in site.world.valves() {
            valve.check_extents(coord, site.config.max_dimension)?;
        }
        Ok(site)
    }
}
