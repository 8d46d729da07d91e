// Render proxies: the visual mirror of a tank's fill state.
//
// Each committed tank has exactly one render proxy, a grid cell near the
// centre of its footprint that carries a copy of the tank's current volume,
// maximum volume and fluid type. A renderer draws the fluid from it without
// ever touching the master valve.
//
// `RenderProxySync` is the contract the manager drives: spawn on commit,
// update after every committed fluid change, destroy on teardown before the
// tank's cells are released. `ProxyRegistry` is the bundled implementation,
// a coordinate-keyed map that a host renderer can read.
//
// See also: `manager.rs` which owns the one-proxy-per-tank invariant.

use crate::geometry::CoordRange;
use crate::types::{FluidId, VoxelCoord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host-side lifecycle of render proxies.
pub trait RenderProxySync {
    /// Create a proxy at `coord` for a tank occupying `footprint`.
    fn spawn(&mut self, coord: VoxelCoord, footprint: CoordRange);

    /// Remove the proxy at `coord`. Removing a missing proxy does nothing.
    fn destroy(&mut self, coord: VoxelCoord);

    /// Mirror the tank's fluid state into the proxy at `coord`.
    fn update(
        &mut self,
        coord: VoxelCoord,
        current_volume: u32,
        max_volume: u32,
        fluid: Option<&FluidId>,
    );
}

/// Mirrored fill state of one tank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderProxy {
    pub coord: VoxelCoord,
    pub footprint: CoordRange,
    pub current_volume: u32,
    pub max_volume: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid: Option<FluidId>,
}

/// World-space box occupied by a tank's fluid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidVolume {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl RenderProxy {
    pub fn new(coord: VoxelCoord, footprint: CoordRange) -> Self {
        Self {
            coord,
            footprint,
            current_volume: 0,
            max_volume: 0,
            fluid: None,
        }
    }

    /// The box the fluid fills: the footprint's interior in x and z, rising
    /// from the interior floor in proportion to the fill level. `None` when
    /// there is nothing to draw.
    pub fn fluid_volume(&self) -> Option<FluidVolume> {
        self.fluid.as_ref()?;
        if self.max_volume == 0 || self.current_volume == 0 {
            return None;
        }
        let start = self.footprint.start;
        let end = self.footprint.end;
        let floor = (start.y + 1) as f32;
        let ratio = self.current_volume as f32 / self.max_volume as f32;
        let level = (end.y as f32 - floor) * ratio;
        Some(FluidVolume {
            min: [(start.x + 1) as f32, floor, (start.z + 1) as f32],
            max: [end.x as f32, floor + level, end.z as f32],
        })
    }
}

/// All live render proxies, keyed by coordinate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RenderProxy>", into = "Vec<RenderProxy>")]
pub struct ProxyRegistry {
    proxies: BTreeMap<VoxelCoord, RenderProxy>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: VoxelCoord) -> Option<&RenderProxy> {
        self.proxies.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

impl RenderProxySync for ProxyRegistry {
    fn spawn(&mut self, coord: VoxelCoord, footprint: CoordRange) {
        self.proxies.insert(coord, RenderProxy::new(coord, footprint));
    }

    fn destroy(&mut self, coord: VoxelCoord) {
        self.proxies.remove(&coord);
    }

    fn update(
        &mut self,
        coord: VoxelCoord,
        current_volume: u32,
        max_volume: u32,
        fluid: Option<&FluidId>,
    ) {
        if let Some(proxy) = self.proxies.get_mut(&coord) {
            proxy.current_volume = current_volume;
            proxy.max_volume = max_volume;
            proxy.fluid = fluid.cloned();
        }
    }
}

impl From<Vec<RenderProxy>> for ProxyRegistry {
    fn from(list: Vec<RenderProxy>) -> Self {
        Self {
            proxies: list.into_iter().map(|p| (p.coord, p)).collect(),
        }
    }
}

impl From<ProxyRegistry> for Vec<RenderProxy> {
    fn from(registry: ProxyRegistry) -> Self {
        registry.proxies.into_values().collect()
    }
}
