// Tank structure manager: the per-valve state machine.
//
// `TankStructureManager` borrows a grid, a render proxy sink and the config
// for the duration of one host callback and runs every tank operation
// against them. Valves are addressed by coordinate; each valve cell's
// `ValveBlock` moves between `Unconfigured`, `Master` and `Slave`.
//
// ## Lifecycle
//
// - `setup_multi_tank()`: probe (`geometry.rs`), validate (`validator.rs`)
//   and only then commit. Commit builds the master's store, carries over
//   the origin's own fluid and that of every absorbed valve at the retention
//   percentage, marks every shell cell, turns the shell's other valves into
//   slaves, clears stale render proxies from the footprint and spawns the
//   new proxy. A failed validation leaves the grid untouched.
// - `notify_structure_changed()`: re-validates a master against its stored
//   dimension, tearing the tank down if it no longer holds.
// - `valve_destroyed()`: tears the tank down when its master is removed.
// - `teardown()`: destroys the render proxy first, then releases every
//   member cell. The former master keeps its fluid as residual content.
//   Tearing down a valve that is not a master does nothing.
//
// ## Fluid access
//
// Every fluid operation resolves the addressed valve to its master (at most
// one hop) and works on the master's store. Transfers are gated:
//
// - Face gate: only the two faces across the valve's own rotation axis
//   accept transfers (North/South for a rotated valve, West/East for an
//   unrotated one). Up and Down never do.
// - Level gate (drains only): the fluid column, `(height - 2) * fill_ratio`
//   rounded down, must reach the valve's own layer (`to_bottom - 1`).
//
// Committed transfers refresh the render proxy.
//
// See also: `valve.rs` for the state itself, `site.rs` which wires the
// manager into the command/event loop.

use crate::config::TankConfig;
use crate::fluid::{FluidContainer, FluidStack, FluidTank};
use crate::geometry::{Elevation, scan_dimensions};
use crate::render_proxy::RenderProxySync;
use crate::types::{BlockKind, Face, FluidId, Orientation, Voxel, VoxelCoord};
use crate::validator::check_structure;
use crate::valve::{MasterValve, SlaveValve, ValveBlock, ValveRole};
use crate::world::VoxelGrid;
use serde::{Deserialize, Serialize};

/// Outcome of a neighbor-change re-validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Revalidation {
    /// The notified valve is not a master; nothing was checked.
    NotMaster,
    /// The structure still holds.
    Intact,
    /// The structure failed validation and was torn down.
    TornDown,
}

/// Coarse fill state shown by the valve GUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertionStatus {
    NotSetUp,
    Empty,
    HasFluid,
}

impl InsertionStatus {
    /// Wire code: 0 not set up, 1 empty, 2 has fluid.
    pub fn code(self) -> i32 {
        match self {
            InsertionStatus::NotSetUp => 0,
            InsertionStatus::Empty => 1,
            InsertionStatus::HasFluid => 2,
        }
    }
}

/// Snapshot of a tank as seen through one valve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankInfo {
    pub capacity: u32,
    pub fluid: Option<FluidStack>,
}

/// Read-only GUI view of one valve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveStatus {
    pub role: ValveRole,
    pub capacity: u32,
    pub fluid_level: u32,
    pub fluid: Option<FluidId>,
    pub insertion: InsertionStatus,
}

/// Runs tank operations over a borrowed grid and proxy sink.
pub struct TankStructureManager<'a, G: VoxelGrid + ?Sized, R: RenderProxySync + ?Sized> {
    grid: &'a mut G,
    proxies: &'a mut R,
    config: &'a TankConfig,
}

impl<'a, G: VoxelGrid + ?Sized, R: RenderProxySync + ?Sized> TankStructureManager<'a, G, R> {
    pub fn new(grid: &'a mut G, proxies: &'a mut R, config: &'a TankConfig) -> Self {
        Self {
            grid,
            proxies,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Structure lifecycle
    // -----------------------------------------------------------------------

    /// Try to form a tank with the valve at `origin` as master, growing away
    /// from the clicked `face`. Returns true if the tank was committed.
    pub fn setup_multi_tank(&mut self, origin: VoxelCoord, face: Face) -> bool {
        if self.grid.valve(origin).is_none() {
            return false;
        }
        let Some(orientation) = Orientation::from_clicked_face(face) else {
            if self.config.logs_structure() {
                log::debug!("Valve at {origin} clicked on {face:?}; no tank grows that way");
            }
            return false;
        };

        let dimension = scan_dimensions(&*self.grid, self.config, origin, orientation);
        if !check_structure(&*self.grid, self.config, origin, &dimension, true) {
            if self.config.logs_structure() {
                log::debug!("Tank setup at {origin} rejected");
            }
            return false;
        }

        // Validated; from here on nothing can fail.
        let mut tank = FluidTank::new(self.config.tank_capacity(&dimension));
        if let Some(fluid) = self.grid.valve_mut(origin).and_then(ValveBlock::take_fluid) {
            tank.fill(&fluid.with_amount(self.config.retain(fluid.amount)), false);
        }

        let range = dimension.footprint(origin);
        for coord in range.cells() {
            if range.is_member(coord) {
                self.grid.set_part(coord, true);
                if coord != origin {
                    let elevation = dimension.elevation_at(coord.y - origin.y);
                    self.absorb_valve(coord, origin, elevation, &mut tank);
                }
            }
            if self.grid.voxel(coord).kind == BlockKind::RenderProxy {
                self.proxies.destroy(coord);
                self.grid.set_voxel(coord, Voxel::EMPTY);
            }
        }

        let render_coord = dimension.render_coord(origin);
        if let Some(valve) = self.grid.valve_mut(origin) {
            *valve = ValveBlock::Master(MasterValve {
                dimension,
                render_coord,
                tank,
            });
        }

        self.grid.set_voxel(render_coord, Voxel::new(BlockKind::RenderProxy));
        self.proxies.spawn(render_coord, range);
        if self.config.logs_structure() {
            log::debug!("Render spawned: {render_coord}");
        }
        self.refresh_proxy(origin);
        self.print_debug(origin);
        true
    }

    /// Turn the valve at `coord`, if any, into a slave of `master`, moving
    /// whatever fluid it held into the new store.
    fn absorb_valve(
        &mut self,
        coord: VoxelCoord,
        master: VoxelCoord,
        elevation: Elevation,
        tank: &mut FluidTank,
    ) {
        let Some(valve) = self.grid.valve_mut(coord) else {
            return;
        };
        if let Some(fluid) = valve.take_fluid() {
            tank.fill(&fluid.with_amount(self.config.retain(fluid.amount)), false);
        }
        *valve = ValveBlock::Slave(SlaveValve {
            master,
            elevation,
        });
    }

    /// Re-check the tank mastered at `valve` after a nearby grid change.
    pub fn notify_structure_changed(&mut self, valve: VoxelCoord) -> Revalidation {
        let Some(dimension) = self
            .grid
            .valve(valve)
            .and_then(ValveBlock::as_master)
            .map(|m| m.dimension)
        else {
            return Revalidation::NotMaster;
        };

        if check_structure(&*self.grid, self.config, valve, &dimension, false) {
            if self.config.logs_structure() {
                log::debug!("Tank structure at {valve}: GOOD");
            }
            Revalidation::Intact
        } else {
            if self.config.logs_structure() {
                log::debug!("Tank structure at {valve}: BAD");
            }
            self.teardown(valve);
            Revalidation::TornDown
        }
    }

    /// Hook for a valve block about to be removed. Tears the tank down if the
    /// valve is its master; returns whether it did.
    pub fn valve_destroyed(&mut self, valve: VoxelCoord) -> bool {
        let is_master = self.grid.valve(valve).and_then(ValveBlock::as_master).is_some();
        if is_master && self.config.logs_structure() {
            log::debug!("Tank valve at {valve} destroyed");
        }
        is_master && self.teardown(valve)
    }

    /// Dissolve the tank mastered at `master`. Returns false, changing
    /// nothing, if `master` is not a master valve.
    pub fn teardown(&mut self, master: VoxelCoord) -> bool {
        let Some((dimension, render_coord)) = self
            .grid
            .valve(master)
            .and_then(ValveBlock::as_master)
            .map(|m| (m.dimension, m.render_coord))
        else {
            return false;
        };

        self.proxies.destroy(render_coord);
        if self.grid.voxel(render_coord).kind == BlockKind::RenderProxy {
            self.grid.set_voxel(render_coord, Voxel::EMPTY);
        }
        if self.config.logs_structure() {
            log::debug!("Render destroyed: {render_coord}");
        }

        for coord in dimension.footprint(master).members() {
            self.grid.set_part(coord, false);
            if let Some(valve) = self.grid.valve_mut(coord) {
                valve.release();
            }
        }

        if self.config.logs_structure() {
            log::debug!("Tank structure at {master} has been reset");
        }
        true
    }

    // -----------------------------------------------------------------------
    // Fluid access
    // -----------------------------------------------------------------------

    /// Master coordinate of a set-up valve, if its master is still there.
    fn resolve_master(&self, valve: VoxelCoord) -> Option<VoxelCoord> {
        let master = self.grid.valve(valve)?.master_coord(valve)?;
        self.grid.valve(master)?.as_master()?;
        Some(master)
    }

    fn master(&self, valve: VoxelCoord) -> Option<&MasterValve> {
        let master = self.resolve_master(valve)?;
        self.grid.valve(master)?.as_master()
    }

    fn master_mut(&mut self, valve: VoxelCoord) -> Option<&mut MasterValve> {
        let master = self.resolve_master(valve)?;
        self.grid.valve_mut(master)?.as_master_mut()
    }

    /// Does `face` of the valve at `valve` accept transfers?
    fn face_open(&self, valve: VoxelCoord, face: Face) -> bool {
        let Some(rotated) = self.grid.voxel(valve).valve_rotation() else {
            return false;
        };
        match face {
            Face::North | Face::South => rotated,
            Face::West | Face::East => !rotated,
            Face::Up | Face::Down => false,
        }
    }

    /// Face gate plus a live master.
    fn accessible(&self, valve: VoxelCoord, face: Face) -> bool {
        self.face_open(valve, face) && self.resolve_master(valve).is_some()
    }

    /// Does the fluid column reach the valve's own layer?
    fn level_reaches(&self, valve: VoxelCoord) -> bool {
        let (Some(elevation), Some(master)) = (
            self.grid.valve(valve).and_then(ValveBlock::elevation),
            self.master(valve),
        ) else {
            return false;
        };
        if master.tank.capacity() == 0 || master.tank.amount() == 0 {
            return false;
        }
        let interior = elevation.height().saturating_sub(2);
        let column = (interior as f32 * master.tank.fill_ratio()) as i32;
        column >= elevation.to_bottom.saturating_sub(1)
    }

    pub fn can_fill(&self, valve: VoxelCoord, face: Face) -> bool {
        self.accessible(valve, face)
    }

    pub fn can_drain(&self, valve: VoxelCoord, face: Face) -> bool {
        self.accessible(valve, face) && self.level_reaches(valve)
    }

    /// Pump `resource` in through `face`. Returns the amount accepted (or
    /// that would be, when simulating).
    pub fn fill(
        &mut self,
        valve: VoxelCoord,
        face: Face,
        resource: &FluidStack,
        simulate: bool,
    ) -> u32 {
        if !self.can_fill(valve, face) {
            return 0;
        }
        let Some(master) = self.master_mut(valve) else {
            return 0;
        };
        let filled = master.tank.fill(resource, simulate);
        if !simulate && filled > 0 {
            self.refresh_proxy(valve);
        }
        filled
    }

    /// Drain up to `max_amount` of whatever the tank holds through `face`.
    pub fn drain(
        &mut self,
        valve: VoxelCoord,
        face: Face,
        max_amount: u32,
        simulate: bool,
    ) -> Option<FluidStack> {
        if !self.can_drain(valve, face) {
            return None;
        }
        let drained = self.master_mut(valve)?.tank.drain(max_amount, simulate);
        if !simulate && drained.is_some() {
            self.refresh_proxy(valve);
        }
        drained
    }

    /// Drain up to `request.amount` through `face`, only if the tank holds
    /// `request`'s fluid.
    pub fn drain_fluid(
        &mut self,
        valve: VoxelCoord,
        face: Face,
        request: &FluidStack,
        simulate: bool,
    ) -> Option<FluidStack> {
        if self.master(valve)?.tank.fluid_id() != Some(&request.fluid) {
            return None;
        }
        self.drain(valve, face, request.amount, simulate)
    }

    /// Capacity and contents of the tank behind `face`.
    pub fn tank_info(&self, valve: VoxelCoord, face: Face) -> Option<TankInfo> {
        if !self.accessible(valve, face) {
            return None;
        }
        let master = self.master(valve)?;
        Some(TankInfo {
            capacity: master.tank.capacity(),
            fluid: master.tank.fluid().cloned(),
        })
    }

    /// A player uses `held` on the valve. A filled container is poured in if
    /// all of it fits; an empty one is filled to its capacity if the level
    /// gate passes and the tank can supply all of it. Returns the container
    /// the player ends up holding, or `None` if nothing was exchanged.
    pub fn use_valve(
        &mut self,
        valve: VoxelCoord,
        held: &FluidContainer,
    ) -> Option<FluidContainer> {
        if !self.grid.valve(valve)?.is_setup() {
            return None;
        }

        let result = match &held.contents {
            Some(contents) if contents.amount > 0 => {
                let tank = &mut self.master_mut(valve)?.tank;
                if tank.fill(contents, true) != contents.amount {
                    return None;
                }
                tank.fill(contents, false);
                held.emptied()
            }
            _ => {
                if !self.level_reaches(valve) {
                    return None;
                }
                let wanted = held.capacity;
                let tank = &mut self.master_mut(valve)?.tank;
                if tank.drain(wanted, true).map(|f| f.amount) != Some(wanted) {
                    return None;
                }
                let drained = tank.drain(wanted, false)?;
                held.filled_with(drained)
            }
        };
        self.refresh_proxy(valve);
        Some(result)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Capacity of the tank behind `valve`; 0 when not set up.
    pub fn capacity(&self, valve: VoxelCoord) -> u32 {
        self.master(valve).map_or(0, |m| m.tank.capacity())
    }

    /// Stored amount behind `valve`. An unconfigured valve reports its own
    /// residual fluid.
    pub fn fluid_level(&self, valve: VoxelCoord) -> u32 {
        self.stored_fluid(valve).map_or(0, |f| f.amount)
    }

    pub fn fluid_type_id(&self, valve: VoxelCoord) -> Option<FluidId> {
        self.stored_fluid(valve).map(|f| f.fluid.clone())
    }

    pub fn insertion_status(&self, valve: VoxelCoord) -> InsertionStatus {
        match self.master(valve) {
            None => InsertionStatus::NotSetUp,
            Some(m) if m.tank.fluid().is_some() => InsertionStatus::HasFluid,
            Some(_) => InsertionStatus::Empty,
        }
    }

    /// Everything the valve GUI shows, in one read.
    pub fn valve_status(&self, valve: VoxelCoord) -> Option<ValveStatus> {
        let role = self.grid.valve(valve)?.role();
        Some(ValveStatus {
            role,
            capacity: self.capacity(valve),
            fluid_level: self.fluid_level(valve),
            fluid: self.fluid_type_id(valve),
            insertion: self.insertion_status(valve),
        })
    }

    fn stored_fluid(&self, valve: VoxelCoord) -> Option<&FluidStack> {
        match self.grid.valve(valve)? {
            ValveBlock::Unconfigured { residual } => residual.as_ref(),
            _ => self.master(valve)?.tank.fluid(),
        }
    }

    /// Push the master's fluid state to its render proxy.
    pub fn refresh_proxy(&mut self, valve: VoxelCoord) {
        let Some(master) = self.master(valve) else {
            return;
        };
        let coord = master.render_coord;
        let amount = master.tank.amount();
        let capacity = master.tank.capacity();
        let fluid = master.tank.fluid_id().cloned();
        self.proxies.update(coord, amount, capacity, fluid.as_ref());
    }

    /// Dump a valve's state to the debug log.
    pub fn print_debug(&self, valve: VoxelCoord) {
        if !self.config.logs_structure() {
            return;
        }
        match self.grid.valve(valve) {
            Some(block) => log::debug!(
                "Valve data: at {valve}, role {:?}, master {:?}",
                block.role(),
                block.master_coord(valve)
            ),
            None => log::debug!("No valve at {valve}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CoordRange, Dimension};
    use crate::render_proxy::ProxyRegistry;
    use crate::world::VoxelWorld;

    fn water(amount: u32) -> FluidStack {
        FluidStack::new(FluidId::new("water"), amount)
    }

    /// 5x4x5 glass chamber, valve at (0,1,2) on the -X end, unrotated.
    /// Clicking West grows it along +X.
    fn chamber() -> (VoxelWorld, VoxelCoord) {
        let mut world = VoxelWorld::new();
        let origin = VoxelCoord::new(0, 1, 2);
        let dimension = Dimension::new(Orientation::XPos, 2, 2, 5, 3, 1);
        for coord in dimension.footprint(origin).members() {
            world.set_voxel(coord, Voxel::new(BlockKind::GlassWall));
        }
        world.set_voxel(origin, Voxel::valve(false));
        (world, origin)
    }

    /// Records every proxy call.
    #[derive(Default)]
    struct RecordingSync {
        spawned: Vec<VoxelCoord>,
        destroyed: Vec<VoxelCoord>,
        updates: usize,
    }

    impl RenderProxySync for RecordingSync {
        fn spawn(&mut self, coord: VoxelCoord, _footprint: CoordRange) {
            self.spawned.push(coord);
        }

        fn destroy(&mut self, coord: VoxelCoord) {
            self.destroyed.push(coord);
        }

        fn update(
            &mut self,
            _coord: VoxelCoord,
            _current: u32,
            _max: u32,
            _fluid: Option<&FluidId>,
        ) {
            self.updates += 1;
        }
    }

    #[test]
    fn setup_commits_master_and_proxy() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);

        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(manager.capacity(origin), 16 * 1000 * 3 * 2 * 3);
        assert_eq!(manager.insertion_status(origin), InsertionStatus::Empty);
        assert_eq!(manager.insertion_status(origin).code(), 1);

        let render = VoxelCoord::new(2, 1, 2);
        assert_eq!(world.voxel(render).kind, BlockKind::RenderProxy);
        assert_eq!(proxies.get(render).unwrap().max_volume, 16 * 1000 * 18);
        assert!(world.voxel(VoxelCoord::new(4, 3, 4)).is_part);
        assert!(world.voxel(origin).is_part);
        assert!(!world.voxel(VoxelCoord::new(2, 2, 2)).is_part);
    }

    #[test]
    fn setup_from_wrong_face_fails_cleanly() {
        let (mut world, origin) = chamber();
        let before = world.clone();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);

        for face in [Face::Up, Face::Down, Face::East, Face::North, Face::South] {
            assert!(!manager.setup_multi_tank(origin, face));
        }
        assert_eq!(world, before);
        assert!(proxies.is_empty());
    }

    #[test]
    fn setup_on_non_valve_fails() {
        let (mut world, _) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(!manager.setup_multi_tank(VoxelCoord::new(0, 2, 2), Face::West));
    }

    #[test]
    fn second_setup_on_same_valve_fails() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        // Its own cells are now claimed.
        assert!(!manager.setup_multi_tank(origin, Face::West));
        assert_eq!(proxies.len(), 1);
    }

    #[test]
    fn revalidation_of_untouched_tank_is_intact() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(manager.notify_structure_changed(origin), Revalidation::Intact);
        assert_eq!(
            manager.notify_structure_changed(VoxelCoord::new(4, 1, 2)),
            Revalidation::NotMaster
        );
    }

    #[test]
    fn broken_wall_tears_down() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        {
            let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
            assert!(manager.setup_multi_tank(origin, Face::West));
        }
        world.set_voxel(VoxelCoord::new(2, 3, 2), Voxel::EMPTY);
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert_eq!(manager.notify_structure_changed(origin), Revalidation::TornDown);
        assert_eq!(manager.insertion_status(origin), InsertionStatus::NotSetUp);
        assert!(proxies.is_empty());
        assert!(!world.voxel(VoxelCoord::new(4, 1, 0)).is_part);
        assert_eq!(world.voxel(VoxelCoord::new(2, 1, 2)), Voxel::EMPTY);
    }

    #[test]
    fn teardown_is_idempotent() {
        let (mut world, origin) = chamber();
        let mut sync = RecordingSync::default();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut sync, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert!(manager.teardown(origin));
        assert!(!manager.teardown(origin));
        assert_eq!(manager.capacity(origin), 0);
        assert_eq!(sync.spawned, vec![VoxelCoord::new(2, 1, 2)]);
        assert_eq!(sync.destroyed, vec![VoxelCoord::new(2, 1, 2)]);
    }

    #[test]
    fn fill_and_drain_through_open_faces() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));

        // An unrotated valve takes fluid from West/East only.
        for face in [Face::North, Face::South, Face::Up, Face::Down] {
            assert_eq!(manager.fill(origin, face, &water(1000), false), 0);
            assert!(manager.drain(origin, face, 1000, false).is_none());
            assert!(manager.tank_info(origin, face).is_none());
        }
        assert_eq!(manager.fill(origin, Face::East, &water(1000), true), 1000);
        assert_eq!(manager.fluid_level(origin), 0);
        assert_eq!(manager.fill(origin, Face::West, &water(5000), false), 5000);
        assert_eq!(manager.fluid_level(origin), 5000);

        let drained = manager.drain(origin, Face::East, 2000, false).unwrap();
        assert_eq!(drained, water(2000));
        assert_eq!(manager.fluid_level(origin), 3000);
        assert_eq!(
            manager.tank_info(origin, Face::West),
            Some(TankInfo {
                capacity: 288_000,
                fluid: Some(water(3000)),
            })
        );
        assert_eq!(proxies.get(VoxelCoord::new(2, 1, 2)).unwrap().current_volume, 3000);
    }

    #[test]
    fn typed_drain_checks_fluid() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        manager.fill(origin, Face::West, &water(1000), false);

        let lava = FluidStack::new(FluidId::new("lava"), 100);
        assert!(manager.drain_fluid(origin, Face::West, &lava, false).is_none());
        assert_eq!(
            manager.drain_fluid(origin, Face::West, &water(100), false),
            Some(water(100))
        );
    }

    #[test]
    fn high_slave_drains_only_when_fluid_reaches_it() {
        let (mut world, origin) = chamber();
        // Slave on the far end wall, one layer above the master.
        let slave = VoxelCoord::new(4, 2, 2);
        world.set_voxel(slave, Voxel::valve(false));
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(manager.valve_status(slave).unwrap().role, ValveRole::Slave);

        let capacity = manager.capacity(slave);
        assert_eq!(manager.fill(slave, Face::East, &water(capacity / 4), false), capacity / 4);
        // Column of 2 * 0.25 rounds to 0; the slave sits at to_bottom 2.
        assert!(!manager.can_drain(slave, Face::East));
        assert!(manager.drain(slave, Face::East, 100, false).is_none());
        // The master at the bottom can still drain.
        assert!(manager.can_drain(origin, Face::East));

        manager.fill(slave, Face::East, &water(capacity / 4), false);
        assert!(manager.drain(slave, Face::East, 100, false).is_some());
    }

    #[test]
    fn teardown_releases_slaves_and_keeps_residual() {
        let (mut world, origin) = chamber();
        let slave = VoxelCoord::new(4, 2, 2);
        world.set_voxel(slave, Voxel::valve(false));
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        manager.fill(origin, Face::West, &water(4000), false);

        assert!(manager.valve_destroyed(origin));
        assert!(!manager.valve_destroyed(slave));
        assert_eq!(manager.valve_status(slave).unwrap().role, ValveRole::Unconfigured);
        let status = manager.valve_status(origin).unwrap();
        assert_eq!(status.role, ValveRole::Unconfigured);
        assert_eq!(status.capacity, 0);
        assert_eq!(status.fluid_level, 4000);
        assert_eq!(status.insertion, InsertionStatus::NotSetUp);
    }

    #[test]
    fn rebuilt_tank_keeps_retained_residual() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        manager.fill(origin, Face::West, &water(4000), false);
        assert!(manager.teardown(origin));
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(manager.fluid_level(origin), 3000);
        assert_eq!(manager.insertion_status(origin), InsertionStatus::HasFluid);
    }

    #[test]
    fn absorbed_valve_residual_is_retained() {
        let (mut world, origin) = chamber();
        let other = VoxelCoord::new(4, 2, 2);
        world.set_voxel(other, Voxel::valve(false));
        if let Some(valve) = world.valve_mut(other) {
            *valve = ValveBlock::Unconfigured {
                residual: Some(water(1000)),
            };
        }
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(manager.fluid_level(origin), 750);
        assert_eq!(manager.fluid_level(other), 750);
        assert_eq!(
            world.valve(other).and_then(ValveBlock::elevation),
            Some(Elevation { to_bottom: 2, to_top: 2 })
        );
    }

    #[test]
    fn absorbed_fluid_of_another_type_is_discarded() {
        let (mut world, origin) = chamber();
        let other = VoxelCoord::new(4, 2, 2);
        world.set_voxel(other, Voxel::valve(false));
        if let Some(valve) = world.valve_mut(origin) {
            *valve = ValveBlock::Unconfigured {
                residual: Some(water(4000)),
            };
        }
        if let Some(valve) = world.valve_mut(other) {
            *valve = ValveBlock::Unconfigured {
                residual: Some(FluidStack::new(FluidId::new("lava"), 2000)),
            };
        }
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(manager.fluid_level(origin), 3000);
        assert_eq!(manager.fluid_type_id(origin), Some(FluidId::new("water")));
        assert_eq!(manager.fluid_type_id(other), Some(FluidId::new("water")));

        // The lava is gone, not parked on the absorbed valve.
        let mut absorbed = world.valve(other).cloned();
        assert_eq!(absorbed.as_ref().map(ValveBlock::role), Some(ValveRole::Slave));
        assert_eq!(absorbed.as_mut().and_then(ValveBlock::take_fluid), None);
    }

    #[test]
    fn setup_clears_stale_proxies() {
        let (mut world, origin) = chamber();
        let stale = VoxelCoord::new(3, 2, 3);
        world.set_voxel(stale, Voxel::new(BlockKind::RenderProxy));
        let mut sync = RecordingSync::default();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut sync, &config);
        assert!(manager.setup_multi_tank(origin, Face::West));
        assert_eq!(sync.destroyed, vec![stale]);
        assert_eq!(world.voxel(stale), Voxel::EMPTY);
    }

    #[test]
    fn bucket_exchange() {
        let (mut world, origin) = chamber();
        let mut proxies = ProxyRegistry::new();
        let config = TankConfig::default();
        let mut manager = TankStructureManager::new(&mut world, &mut proxies, &config);

        let full = FluidContainer::full(1000, FluidId::new("water"));
        assert!(manager.use_valve(origin, &full).is_none());

        assert!(manager.setup_multi_tank(origin, Face::West));
        let empty = manager.use_valve(origin, &full).unwrap();
        assert!(empty.is_empty());
        assert_eq!(manager.fluid_level(origin), 1000);

        // Lava does not mix with water.
        let lava = FluidContainer::full(1000, FluidId::new("lava"));
        assert!(manager.use_valve(origin, &lava).is_none());

        let refilled = manager.use_valve(origin, &empty).unwrap();
        assert_eq!(refilled, full);
        assert_eq!(manager.fluid_level(origin), 0);
        // Nothing left to scoop.
        assert!(manager.use_valve(origin, &empty).is_none());
    }
}
