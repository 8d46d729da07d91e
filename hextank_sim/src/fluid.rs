// Fluid storage primitives.
//
// `FluidStack` is an amount of one fluid. `FluidTank` is a bounded store
// holding at most one fluid type at a time, with partial-transfer semantics:
// a fill accepts as much as fits, a drain hands out as much as is there,
// neither ever moves more than asked or a negative amount. Both take a
// `simulate` flag; a simulated transfer reports what would move without
// changing the store.
//
// `FluidContainer` is a hand-held vessel (a bucket) used by the valve's
// player interaction in `manager.rs`.

use crate::types::FluidId;
use serde::{Deserialize, Serialize};

/// An amount of a single fluid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidId,
    pub amount: u32,
}

impl FluidStack {
    pub fn new(fluid: FluidId, amount: u32) -> Self {
        Self { fluid, amount }
    }

    /// Same fluid, different amount.
    pub fn with_amount(&self, amount: u32) -> Self {
        Self {
            fluid: self.fluid.clone(),
            amount,
        }
    }

    pub fn is_same_fluid(&self, other: &FluidStack) -> bool {
        self.fluid == other.fluid
    }
}

/// A bounded single-fluid store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidTank {
    capacity: u32,
    fluid: Option<FluidStack>,
}

impl FluidTank {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            fluid: None,
        }
    }

    /// Rebuild a tank from saved contents. Contents larger than `capacity`
    /// are returned as an error by the caller; here they are taken as-is.
    pub fn with_contents(capacity: u32, fluid: Option<FluidStack>) -> Self {
        Self {
            capacity,
            fluid: fluid.filter(|f| f.amount > 0),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn fluid(&self) -> Option<&FluidStack> {
        self.fluid.as_ref()
    }

    pub fn fluid_id(&self) -> Option<&FluidId> {
        self.fluid.as_ref().map(|f| &f.fluid)
    }

    /// Stored amount; 0 when empty.
    pub fn amount(&self) -> u32 {
        self.fluid.as_ref().map_or(0, |f| f.amount)
    }

    /// Fraction of capacity in use, in `[0, 1]`. An uncapacitated tank is
    /// reported as empty.
    pub fn fill_ratio(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.amount() as f32 / self.capacity as f32
    }

    /// Accept up to `resource.amount` of `resource.fluid`. Returns the amount
    /// accepted (or that would be, when simulating). A tank holding a
    /// different fluid accepts nothing.
    pub fn fill(&mut self, resource: &FluidStack, simulate: bool) -> u32 {
        match &mut self.fluid {
            None => {
                let accepted = resource.amount.min(self.capacity);
                if !simulate && accepted > 0 {
                    self.fluid = Some(resource.with_amount(accepted));
                }
                accepted
            }
            Some(stored) if !stored.is_same_fluid(resource) => 0,
            Some(stored) => {
                let accepted = resource
                    .amount
                    .min(self.capacity.saturating_sub(stored.amount));
                if !simulate {
                    stored.amount += accepted;
                }
                accepted
            }
        }
    }

    /// Hand out up to `max_amount` of whatever is stored. `None` when nothing
    /// would move.
    pub fn drain(&mut self, max_amount: u32, simulate: bool) -> Option<FluidStack> {
        let stored = self.fluid.as_mut()?;
        let drained = max_amount.min(stored.amount);
        if drained == 0 {
            return None;
        }
        let out = stored.with_amount(drained);
        if !simulate {
            stored.amount -= drained;
            if stored.amount == 0 {
                self.fluid = None;
            }
        }
        Some(out)
    }

    /// Remove and return all contents.
    pub fn take(&mut self) -> Option<FluidStack> {
        self.fluid.take()
    }
}

/// A hand-held fluid container such as a bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidContainer {
    /// How much one full container holds.
    pub capacity: u32,
    pub contents: Option<FluidStack>,
}

impl FluidContainer {
    pub fn empty(capacity: u32) -> Self {
        Self {
            capacity,
            contents: None,
        }
    }

    /// A full container of `fluid`.
    pub fn full(capacity: u32, fluid: FluidId) -> Self {
        Self {
            capacity,
            contents: Some(FluidStack::new(fluid, capacity)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents.as_ref().is_none_or(|c| c.amount == 0)
    }

    /// The same container with its contents poured out.
    pub fn emptied(&self) -> Self {
        Self::empty(self.capacity)
    }

    /// The same container holding `stack`.
    pub fn filled_with(&self, stack: FluidStack) -> Self {
        Self {
            capacity: self.capacity,
            contents: Some(stack),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water(amount: u32) -> FluidStack {
        FluidStack::new(FluidId::new("water"), amount)
    }

    fn lava(amount: u32) -> FluidStack {
        FluidStack::new(FluidId::new("lava"), amount)
    }

    #[test]
    fn fill_empty_tank_caps_at_capacity() {
        let mut tank = FluidTank::new(1000);
        assert_eq!(tank.fill(&water(1500), false), 1000);
        assert_eq!(tank.amount(), 1000);
        assert_eq!(tank.fluid_id(), Some(&FluidId::new("water")));
    }

    #[test]
    fn simulated_fill_leaves_tank_unchanged() {
        let mut tank = FluidTank::new(1000);
        assert_eq!(tank.fill(&water(400), true), 400);
        assert_eq!(tank.amount(), 0);
        assert!(tank.fluid().is_none());
    }

    #[test]
    fn fill_rejects_other_fluid() {
        let mut tank = FluidTank::new(1000);
        tank.fill(&water(100), false);
        assert_eq!(tank.fill(&lava(100), false), 0);
        assert_eq!(tank.amount(), 100);
    }

    #[test]
    fn fill_tops_up_to_capacity() {
        let mut tank = FluidTank::new(1000);
        tank.fill(&water(900), false);
        assert_eq!(tank.fill(&water(500), false), 100);
        assert_eq!(tank.amount(), 1000);
        assert_eq!(tank.fill(&water(1), false), 0);
    }

    #[test]
    fn zero_capacity_tank_accepts_nothing() {
        let mut tank = FluidTank::new(0);
        assert_eq!(tank.fill(&water(10), false), 0);
        assert!(tank.fluid().is_none());
        assert_eq!(tank.fill_ratio(), 0.0);
    }

    #[test]
    fn drain_partial_and_full() {
        let mut tank = FluidTank::new(1000);
        tank.fill(&water(600), false);

        let drained = tank.drain(250, false).unwrap();
        assert_eq!(drained, water(250));
        assert_eq!(tank.amount(), 350);

        let rest = tank.drain(10_000, false).unwrap();
        assert_eq!(rest.amount, 350);
        assert!(tank.fluid().is_none());
        assert!(tank.drain(1, false).is_none());
    }

    #[test]
    fn simulated_drain_leaves_tank_unchanged() {
        let mut tank = FluidTank::new(1000);
        tank.fill(&water(600), false);
        assert_eq!(tank.drain(100, true).unwrap().amount, 100);
        assert_eq!(tank.amount(), 600);
    }

    #[test]
    fn drain_zero_moves_nothing() {
        let mut tank = FluidTank::new(1000);
        tank.fill(&water(600), false);
        assert!(tank.drain(0, false).is_none());
        assert_eq!(tank.amount(), 600);
    }

    #[test]
    fn with_contents_drops_empty_stack() {
        let tank = FluidTank::with_contents(500, Some(water(0)));
        assert!(tank.fluid().is_none());
        let tank = FluidTank::with_contents(500, Some(water(200)));
        assert_eq!(tank.amount(), 200);
        assert!((tank.fill_ratio() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn container_states() {
        let bucket = FluidContainer::full(1000, FluidId::new("water"));
        assert!(!bucket.is_empty());
        let empty = bucket.emptied();
        assert!(empty.is_empty());
        assert_eq!(empty.capacity, 1000);
        assert_eq!(empty.filled_with(water(1000)), bucket);
    }
}
