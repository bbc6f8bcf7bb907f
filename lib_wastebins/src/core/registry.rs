//! # Bin Registry
//!
//! Owns every `Bin` for the lifetime of the process. Bins are kept in creation
//! order and ids come from a monotonic counter that starts at 1 and is never
//! reused. Mutating lookups hand back a borrow of the updated bin, so no caller
//! can hold on to an entity past the operation that produced it.
//!
//! The registry itself has no internal synchronization. Request handlers share
//! it as a [`SharedRegistry`] and hold the lock for the whole operation.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::bin::{Bin, BinId, WasteType};

/// The registry as shared between connection tasks.
pub type SharedRegistry = Arc<Mutex<Registry>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("bin {0} does not exist")]
    NotFound(BinId),
}

#[derive(Debug)]
pub struct Registry {
    bins: Vec<Bin>,
    next_id: BinId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            bins: Vec::new(),
            next_id: 1,
        }
    }

    /// Wraps a fresh registry for sharing across tasks.
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Creates a bin with the next id. Always succeeds.
    pub fn create(&mut self, location: impl Into<String>, waste_type: WasteType, fill_level: f64) -> &Bin {
        let id = self.next_id;
        self.next_id += 1;
        self.bins.push(Bin::new(id, location, waste_type, fill_level));
        tracing::debug!(bin_id = id, "bin created");
        &self.bins[self.bins.len() - 1]
    }

    /// All bins in creation order.
    pub fn list_all(&self) -> &[Bin] {
        &self.bins
    }

    pub fn find_by_id(&self, id: BinId) -> Result<&Bin, RegistryError> {
        self.bins
            .iter()
            .find(|bin| bin.id() == id)
            .ok_or(RegistryError::NotFound(id))
    }

    fn find_mut(&mut self, id: BinId) -> Result<&mut Bin, RegistryError> {
        self.bins
            .iter_mut()
            .find(|bin| bin.id() == id)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Adds `delta` to the bin's fill level (clamped) and refreshes its
    /// collection flag.
    pub fn increase_fill(&mut self, id: BinId, delta: f64) -> Result<&Bin, RegistryError> {
        let bin = self.find_mut(id)?;
        bin.increase_fill(delta);
        Ok(&*bin)
    }

    /// Overwrites the bin's fill level (clamped).
    pub fn set_fill(&mut self, id: BinId, level: f64) -> Result<&Bin, RegistryError> {
        let bin = self.find_mut(id)?;
        bin.set_fill_level(level);
        Ok(&*bin)
    }

    /// Runs waste classification on the bin's current fill level.
    pub fn classify(&mut self, id: BinId) -> Result<&Bin, RegistryError> {
        let bin = self.find_mut(id)?;
        bin.sort_waste();
        Ok(&*bin)
    }

    pub fn relocate(&mut self, id: BinId, location: impl Into<String>) -> Result<&Bin, RegistryError> {
        let bin = self.find_mut(id)?;
        bin.set_location(location);
        Ok(&*bin)
    }

    pub fn retype(&mut self, id: BinId, waste_type: WasteType) -> Result<&Bin, RegistryError> {
        let bin = self.find_mut(id)?;
        bin.set_waste_type(waste_type);
        Ok(&*bin)
    }

    /// # Generate Route
    ///
    /// Ids of every bin that currently needs collection, ascending. Depends only
    /// on the bins' present state.
    pub fn generate_route(&self) -> Vec<BinId> {
        let mut route: Vec<BinId> = self
            .bins
            .iter()
            .filter(|bin| bin.needs_collection())
            .map(Bin::id)
            .collect();
        route.sort_unstable();
        route
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_from_one() {
        let mut registry = Registry::new();
        let ids: Vec<BinId> = (0..5)
            .map(|i| registry.create(format!("site-{}", i), WasteType::Mixed, 10.0).id())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        registry.increase_fill(2, 50.0).unwrap();
        registry.classify(4).unwrap();
        assert_eq!(registry.create("late", WasteType::Food, 0.0).id(), 6);
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_ids_stay_unique_past_u32_range() {
        let mut registry = Registry::new();
        registry.next_id = BinId::from(u32::MAX);
        let first = registry.create("edge", WasteType::Mixed, 0.0).id();
        let second = registry.create("edge", WasteType::Mixed, 0.0).id();
        assert_eq!(first, 4_294_967_295);
        assert_eq!(second, 4_294_967_296);
        assert_eq!(registry.find_by_id(second).unwrap().location(), "edge");
    }

    #[test]
    fn test_food_bin_with_fractional_fill_sums_exactly() {
        let mut registry = Registry::new();
        let id = registry.create("Canteen", WasteType::Food, 0.11).id();
        let bin = registry.classify(id).unwrap();
        assert_eq!(bin.recyclable_amount() + bin.non_recyclable_amount(), 0.11);
        assert_eq!((bin.recyclable_amount(), bin.non_recyclable_amount()), (0.044, 0.066));
    }

    #[test]
    fn test_list_all_keeps_creation_order() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.create("A", WasteType::Plastic, 0.0);
        registry.create("B", WasteType::Food, 0.0);
        registry.create("C", WasteType::Metal, 0.0);
        let locations: Vec<&str> = registry.list_all().iter().map(Bin::location).collect();
        assert_eq!(locations, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_create_clamps_fill_level() {
        let mut registry = Registry::new();
        for (input, stored) in [(-20.0, 0.0), (0.0, 0.0), (55.5, 55.5), (100.0, 100.0), (140.0, 100.0)] {
            let bin = registry.create("x", WasteType::Mixed, input);
            assert_eq!(bin.fill_level(), stored);
            assert_eq!(bin.needs_collection(), stored >= 80.0);
        }
    }

    #[test]
    fn test_increase_fill_clamps_both_ways() {
        let mut registry = Registry::new();
        let id = registry.create("Gate", WasteType::Plastic, 95.0).id();

        let bin = registry.increase_fill(id, 10.0).unwrap();
        assert_eq!(bin.fill_level(), 100.0);
        assert!(bin.needs_collection());

        let bin = registry.increase_fill(id, -150.0).unwrap();
        assert_eq!(bin.fill_level(), 0.0);
        assert!(!bin.needs_collection());
    }

    #[test]
    fn test_missing_bin_is_not_found() {
        let mut registry = Registry::new();
        registry.create("Gate", WasteType::Plastic, 40.0);
        assert_eq!(registry.find_by_id(9).unwrap_err(), RegistryError::NotFound(9));
        assert_eq!(registry.increase_fill(9, 10.0).unwrap_err(), RegistryError::NotFound(9));
        assert_eq!(registry.classify(0).unwrap_err(), RegistryError::NotFound(0));
        assert_eq!(registry.relocate(2, "x").unwrap_err(), RegistryError::NotFound(2));
        assert_eq!(
            registry.retype(2, WasteType::Food).unwrap_err().to_string(),
            "bin 2 does not exist"
        );
    }

    #[test]
    fn test_classify_is_idempotent() {
        let mut registry = Registry::new();
        let id = registry.create("Canteen", WasteType::Food, 70.0).id();
        let first = {
            let bin = registry.classify(id).unwrap();
            (bin.recyclable_amount(), bin.non_recyclable_amount())
        };
        let bin = registry.classify(id).unwrap();
        assert_eq!(first, (bin.recyclable_amount(), bin.non_recyclable_amount()));
        assert_eq!(first.0 + first.1, bin.fill_level());
    }

    #[test]
    fn test_relocate_retype_and_set_fill() {
        let mut registry = Registry::new();
        let id = registry.create("Old", WasteType::Mixed, 10.0).id();
        registry.relocate(id, "New").unwrap();
        registry.retype(id, WasteType::Metal).unwrap();
        let bin = registry.set_fill(id, 88.0).unwrap();
        assert_eq!(bin.location(), "New");
        assert_eq!(bin.waste_type(), WasteType::Metal);
        assert!(bin.needs_collection());
        assert_eq!(registry.find_by_id(id).unwrap().fill_level(), 88.0);
    }

    #[test]
    fn test_generate_route_matches_flagged_bins() {
        let mut registry = Registry::new();
        assert!(registry.generate_route().is_empty());

        for fill in [85.0, 10.0, 80.0, 79.0, 100.0] {
            registry.create("stop", WasteType::Mixed, fill);
        }
        assert_eq!(registry.generate_route(), vec![1, 3, 5]);

        registry.increase_fill(4, 1.0).unwrap();
        registry.increase_fill(1, -10.0).unwrap();
        assert_eq!(registry.generate_route(), vec![3, 4, 5]);

        let route = registry.generate_route();
        let flagged: Vec<BinId> = registry
            .list_all()
            .iter()
            .filter(|bin| bin.needs_collection())
            .map(Bin::id)
            .collect();
        assert_eq!(route, flagged);
        assert!(route.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_shared_registry_serializes_writers() {
        let registry = Registry::shared();
        let id = registry.lock().await.create("Gate", WasteType::Plastic, 0.0).id();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.lock().await.increase_fill(id, 1.0).map(|bin| bin.fill_level())
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(registry.lock().await.find_by_id(id).unwrap().fill_level(), 8.0);
    }
}
