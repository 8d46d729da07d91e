// hextank_sim: pure Rust multi-block fluid tank library.
//
// This crate contains all tank logic: structure discovery, validation,
// the master/slave valve state machine, fluid storage, render-proxy sync,
// and a command/event site that hosts drive. It has no engine dependencies
// and can be tested and run headless.
//
// Module overview:
// - `site.rs`:         TankSite, command loop, block-edit re-validation, save/load.
// - `manager.rs`:      TankStructureManager: setup, teardown, fluid access, GUI queries.
// - `geometry.rs`:     Dimension, Elevation, CoordRange, and the outward probe.
// - `validator.rs`:    Material, rotation and membership rules for a candidate tank.
// - `valve.rs`:        Per-valve state (Unconfigured / Master / Slave) and its save record.
// - `fluid.rs`:        FluidStack, FluidTank, FluidContainer.
// - `render_proxy.rs`: RenderProxySync contract and the bundled ProxyRegistry.
// - `world.rs`:        VoxelGrid trait and the sparse VoxelWorld.
// - `command.rs`:      TankCommand and TankAction, all site mutations.
// - `event.rs`:        TankEvent outputs.
// - `config.rs`:       TankConfig, all tunable parameters.
// - `error.rs`:        TankError for config and save decoding.
// - `types.rs`:        VoxelCoord, Face, Orientation, BlockKind, Voxel, FluidId.
//
// **Critical constraint: determinism.** Tank operations are pure functions of
// the grid. No `HashMap`, no system time. Use `BTreeMap` for ordered
// collections.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod fluid;
pub mod geometry;
pub mod manager;
pub mod render_proxy;
pub mod site;
pub mod types;
pub mod validator;
pub mod valve;
pub mod world;
