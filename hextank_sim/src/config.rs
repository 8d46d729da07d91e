// Data-driven tank configuration.
//
// All tunable tank parameters live here in `TankConfig`, loaded from JSON at
// startup. The structure code never hard-codes a size bound, a retention
// ratio or a bucket volume; it reads them from the config.
//
// See also: `geometry.rs` which bounds its probes by `max_dimension`,
// `manager.rs` which sizes tanks with `tank_capacity()` and carries fluid
// across restructures with `retain()`.

use crate::error::TankError;
use crate::geometry::Dimension;
use serde::{Deserialize, Serialize};

/// Volume of one bucket, in fluid units.
pub const BUCKET_VOLUME: u32 = 1000;

/// Hard ceiling on `max_dimension`. Bounds every probe and every persisted
/// extent, whatever the config says.
pub const MAX_DIMENSION_LIMIT: u32 = 256;

/// Tank tuning parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankConfig {
    /// Largest outer edge length a tank may have, walls included. Each
    /// outward probe runs at most `max_dimension - 2` steps.
    pub max_dimension: u32,
    /// Percentage (0–100) of previously held fluid kept when a valve's fluid
    /// moves into a newly formed tank. Rounded down.
    pub keep_fluid_percent: u32,
    /// Buckets of capacity per interior cell.
    pub capacity_multiplier: u32,
    /// Fluid units per bucket.
    pub unit_volume: u32,
    /// Log structure formation, rejection and teardown.
    pub debug: bool,
    /// Additionally log every probed and validated cell. Only honored when
    /// `debug` is also set.
    pub verbose_debug: bool,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            max_dimension: 32,
            keep_fluid_percent: 75,
            capacity_multiplier: 16,
            unit_volume: BUCKET_VOLUME,
            debug: false,
            verbose_debug: false,
        }
    }
}

impl TankConfig {
    /// Parse and validate a config from JSON. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self, TankError> {
        let config: TankConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that could never form a tank or that would create
    /// fluid out of nothing.
    pub fn validate(&self) -> Result<(), TankError> {
        if self.max_dimension < 3 {
            return Err(TankError::InvalidConfig(format!(
                "max_dimension must be at least 3, got {}",
                self.max_dimension
            )));
        }
        if self.max_dimension > MAX_DIMENSION_LIMIT {
            return Err(TankError::InvalidConfig(format!(
                "max_dimension must be at most {MAX_DIMENSION_LIMIT}, got {}",
                self.max_dimension
            )));
        }
        if self.keep_fluid_percent > 100 {
            return Err(TankError::InvalidConfig(format!(
                "keep_fluid_percent must be at most 100, got {}",
                self.keep_fluid_percent
            )));
        }
        if self.capacity_multiplier == 0 {
            return Err(TankError::InvalidConfig(
                "capacity_multiplier must be positive".into(),
            ));
        }
        if self.unit_volume == 0 {
            return Err(TankError::InvalidConfig("unit_volume must be positive".into()));
        }
        if self.largest_capacity() > u64::from(u32::MAX) {
            return Err(TankError::InvalidConfig(format!(
                "largest tank under max_dimension {} overflows capacity",
                self.max_dimension
            )));
        }
        Ok(())
    }

    /// Capacity of the largest tank a scan can find, unsaturated. Side probes
    /// reach `max_dimension - 1` cells each way, so width and height top out
    /// at `2 * max_dimension - 1` and depth at `max_dimension`.
    fn largest_capacity(&self) -> u64 {
        let max = u64::from(self.max_dimension);
        let side = (2 * max).saturating_sub(3);
        let depth = max.saturating_sub(2);
        u64::from(self.capacity_multiplier)
            .saturating_mul(u64::from(self.unit_volume))
            .saturating_mul(side * side * depth)
    }

    /// Capacity of a tank with the given dimension:
    /// `multiplier * unit_volume * (width-2) * (height-2) * (depth-2)`.
    /// Zero for a dimension with no interior. Saturates at `u32::MAX`.
    pub fn tank_capacity(&self, dimension: &Dimension) -> u32 {
        let interior = dimension.interior_volume();
        if interior == 0 {
            return 0;
        }
        let capacity = u64::from(self.capacity_multiplier)
            .saturating_mul(u64::from(self.unit_volume))
            .saturating_mul(interior);
        u32::try_from(capacity).unwrap_or(u32::MAX)
    }

    /// Amount kept out of `amount` under `keep_fluid_percent`, rounded down.
    pub fn retain(&self, amount: u32) -> u32 {
        let percent = u64::from(self.keep_fluid_percent.min(100));
        // Never exceeds `amount`, so the narrowing cannot fail.
        u32::try_from(u64::from(amount) * percent / 100).unwrap_or(amount)
    }

    pub(crate) fn logs_structure(&self) -> bool {
        self.debug
    }

    pub(crate) fn logs_cells(&self) -> bool {
        self.debug && self.verbose_debug
    }
}
