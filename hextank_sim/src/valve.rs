// Per-valve state and its persisted record.
//
// Every valve cell in the grid carries a `ValveBlock`:
// - `Master` owns the tank's `FluidTank`, its `Dimension` and the render
//   proxy coordinate.
// - `Slave` stores only the master's coordinate and its own `Elevation`
//   inside the tank. Every fluid operation on a slave is redirected to its
//   master, one hop away.
// - `Unconfigured` is not part of any tank. A former master keeps the fluid
//   it held as `residual` content (zero capacity) so a later setup can carry
//   it over.
//
// The grid is the arena and coordinates are the indices: no valve holds a
// reference to another, only a coordinate to look up.
//
// `ValveRecord` is the flat save format for one valve. Conversion back to a
// `ValveBlock` validates the record and reports a `TankError` for anything
// inconsistent.
//
// See also: `world.rs` which stores one `ValveBlock` per valve cell,
// `manager.rs` which drives the state transitions.

use crate::config::MAX_DIMENSION_LIMIT;
use crate::error::TankError;
use crate::fluid::{FluidStack, FluidTank};
use crate::geometry::{Dimension, Elevation};
use crate::types::{FluidId, Orientation, VoxelCoord};
use serde::{Deserialize, Serialize};

/// Fluid-owning head of a tank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterValve {
    pub dimension: Dimension,
    pub render_coord: VoxelCoord,
    pub tank: FluidTank,
}

/// Member valve that redirects to its master.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlaveValve {
    pub master: VoxelCoord,
    pub elevation: Elevation,
}

/// The role a valve currently plays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValveBlock {
    Unconfigured { residual: Option<FluidStack> },
    Master(MasterValve),
    Slave(SlaveValve),
}

impl Default for ValveBlock {
    fn default() -> Self {
        ValveBlock::Unconfigured { residual: None }
    }
}

/// Fieldless view of a valve's role, for queries and events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValveRole {
    Unconfigured,
    Master,
    Slave,
}

impl ValveBlock {
    pub fn role(&self) -> ValveRole {
        match self {
            ValveBlock::Unconfigured { .. } => ValveRole::Unconfigured,
            ValveBlock::Master(_) => ValveRole::Master,
            ValveBlock::Slave(_) => ValveRole::Slave,
        }
    }

    /// True for masters and slaves.
    pub fn is_setup(&self) -> bool {
        !matches!(self, ValveBlock::Unconfigured { .. })
    }

    pub fn as_master(&self) -> Option<&MasterValve> {
        match self {
            ValveBlock::Master(master) => Some(master),
            _ => None,
        }
    }

    pub fn as_master_mut(&mut self) -> Option<&mut MasterValve> {
        match self {
            ValveBlock::Master(master) => Some(master),
            _ => None,
        }
    }

    /// Coordinate of the master that owns this valve's fluid. A master is its
    /// own master.
    pub fn master_coord(&self, own: VoxelCoord) -> Option<VoxelCoord> {
        match self {
            ValveBlock::Master(_) => Some(own),
            ValveBlock::Slave(slave) => Some(slave.master),
            ValveBlock::Unconfigured { .. } => None,
        }
    }

    /// This valve's elevation inside its tank.
    pub fn elevation(&self) -> Option<Elevation> {
        match self {
            ValveBlock::Master(master) => Some(master.dimension.elevation()),
            ValveBlock::Slave(slave) => Some(slave.elevation),
            ValveBlock::Unconfigured { .. } => None,
        }
    }

    /// Remove and return whatever fluid this valve holds itself: a master's
    /// tank contents or an unconfigured valve's residual. Slaves hold none.
    pub fn take_fluid(&mut self) -> Option<FluidStack> {
        match self {
            ValveBlock::Master(master) => master.tank.take(),
            ValveBlock::Unconfigured { residual } => residual.take(),
            ValveBlock::Slave(_) => None,
        }
    }

    /// Leave any tank, keeping whatever fluid this valve held itself.
    pub fn release(&mut self) {
        let residual = self.take_fluid();
        *self = ValveBlock::Unconfigured { residual };
    }

    /// Flatten into the persisted record.
    pub fn to_record(&self, own: VoxelCoord) -> ValveRecord {
        match self {
            ValveBlock::Master(master) => {
                let fluid = master.tank.fluid();
                ValveRecord {
                    is_master: true,
                    is_setup: true,
                    master_coord: own,
                    render_proxy_coord: master.render_coord,
                    dimension: DimensionRecord::from_dimension(&master.dimension),
                    capacity: master.tank.capacity(),
                    fluid_amount: master.tank.amount(),
                    fluid_type_id: fluid.map(|f| f.fluid.clone()),
                }
            }
            ValveBlock::Slave(slave) => ValveRecord {
                is_master: false,
                is_setup: true,
                master_coord: slave.master,
                render_proxy_coord: own,
                dimension: DimensionRecord::from_elevation(slave.elevation),
                capacity: 0,
                fluid_amount: 0,
                fluid_type_id: None,
            },
            ValveBlock::Unconfigured { residual } => ValveRecord {
                is_master: false,
                is_setup: false,
                master_coord: own,
                render_proxy_coord: own,
                dimension: DimensionRecord::default(),
                capacity: 0,
                fluid_amount: residual.as_ref().map_or(0, |f| f.amount),
                fluid_type_id: residual.as_ref().map(|f| f.fluid.clone()),
            },
        }
    }

    /// Reject extents no scan under `max_dimension` could have produced. A
    /// master's fields are each bounded by `max_dimension`; a slave's
    /// elevation by the tallest possible tank.
    pub fn check_extents(&self, own: VoxelCoord, max_dimension: u32) -> Result<(), TankError> {
        let max = i32::try_from(max_dimension).unwrap_or(i32::MAX);
        let fields: Vec<(&str, i32, i32)> = match self {
            ValveBlock::Master(master) => {
                let d = &master.dimension;
                vec![
                    ("negative_width", d.negative_width, max),
                    ("positive_width", d.positive_width, max),
                    ("depth", d.depth, max),
                    ("to_top", d.to_top, max),
                    ("to_bottom", d.to_bottom, max),
                ]
            }
            ValveBlock::Slave(slave) => {
                let tallest = max.saturating_mul(2);
                vec![
                    ("to_top", slave.elevation.to_top, tallest),
                    ("to_bottom", slave.elevation.to_bottom, tallest),
                ]
            }
            ValveBlock::Unconfigured { .. } => Vec::new(),
        };
        for (name, value, limit) in fields {
            if !(0..=limit).contains(&value) {
                return Err(TankError::InvalidRecord {
                    coord: own,
                    reason: format!("{name} {value} outside 0..={limit}"),
                });
            }
        }
        Ok(())
    }

    /// Rebuild a valve from its persisted record.
    pub fn from_record(own: VoxelCoord, record: &ValveRecord) -> Result<Self, TankError> {
        let stored = match (&record.fluid_type_id, record.fluid_amount) {
            (Some(fluid), amount) if amount > 0 => Some(FluidStack::new(fluid.clone(), amount)),
            (None, amount) if amount > 0 => {
                return Err(TankError::InvalidRecord {
                    coord: own,
                    reason: format!("{amount} units of fluid with no fluid type"),
                });
            }
            _ => None,
        };

        if !record.is_setup {
            return Ok(ValveBlock::Unconfigured { residual: stored });
        }

        if !record.is_master {
            let slave = ValveBlock::Slave(SlaveValve {
                master: record.master_coord,
                elevation: Elevation {
                    to_bottom: record.dimension.to_bottom,
                    to_top: record.dimension.to_top,
                },
            });
            slave.check_extents(own, MAX_DIMENSION_LIMIT)?;
            return Ok(slave);
        }

        if record.fluid_amount > record.capacity {
            return Err(TankError::InvalidRecord {
                coord: own,
                reason: format!(
                    "fluid amount {} exceeds capacity {}",
                    record.fluid_amount, record.capacity
                ),
            });
        }
        let master = ValveBlock::Master(MasterValve {
            dimension: record.dimension.to_dimension()?,
            render_coord: record.render_proxy_coord,
            tank: FluidTank::with_contents(record.capacity, stored),
        });
        master.check_extents(own, MAX_DIMENSION_LIMIT)?;
        if master.as_master().is_some_and(|m| !m.dimension.is_formable()) {
            return Err(TankError::InvalidRecord {
                coord: own,
                reason: "master dimension has no interior".into(),
            });
        }
        Ok(master)
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// Flat save format of a `Dimension`. Unused fields hold -1: slaves only
/// carry their elevation, unconfigured valves carry nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRecord {
    pub orientation: i32,
    pub negative_width: i32,
    pub positive_width: i32,
    pub width: i32,
    pub depth: i32,
    pub height: i32,
    pub to_top: i32,
    pub to_bottom: i32,
}

impl Default for DimensionRecord {
    fn default() -> Self {
        Self {
            orientation: -1,
            negative_width: -1,
            positive_width: -1,
            width: -1,
            depth: -1,
            height: -1,
            to_top: -1,
            to_bottom: -1,
        }
    }
}

impl DimensionRecord {
    pub fn from_dimension(dimension: &Dimension) -> Self {
        Self {
            orientation: dimension.orientation.code(),
            negative_width: dimension.negative_width,
            positive_width: dimension.positive_width,
            width: dimension.width(),
            depth: dimension.depth,
            height: dimension.height(),
            to_top: dimension.to_top,
            to_bottom: dimension.to_bottom,
        }
    }

    pub fn from_elevation(elevation: Elevation) -> Self {
        Self {
            to_top: elevation.to_top,
            to_bottom: elevation.to_bottom,
            height: elevation.height(),
            ..Self::default()
        }
    }

    /// Rebuild the dimension. `width` and `height` are derived values and
    /// are recomputed rather than trusted.
    pub fn to_dimension(&self) -> Result<Dimension, TankError> {
        let orientation = Orientation::from_code(self.orientation)
            .ok_or(TankError::InvalidOrientation(self.orientation))?;
        Ok(Dimension::new(
            orientation,
            self.negative_width,
            self.positive_width,
            self.depth,
            self.to_top,
            self.to_bottom,
        ))
    }
}

/// Save format of one valve cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveRecord {
    pub is_master: bool,
    pub is_setup: bool,
    pub master_coord: VoxelCoord,
    pub render_proxy_coord: VoxelCoord,
    pub dimension: DimensionRecord,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub fluid_amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid_type_id: Option<FluidId>,
}

impl ValveRecord {
    pub fn to_json(&self) -> Result<String, TankError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TankError> {
        Ok(serde_json::from_str(json)?)
    }
}
