// Ordered store of regions; derived state changes only through `apply`
use crate::domain::region::{Region, RegionUpdate};

#[derive(Debug, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a region with the same id already exists
    pub fn insert(&mut self, region: Region) -> bool {
        if self.regions.iter().any(|r| r.id == region.id) {
            return false;
        }
        self.regions.push(region);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Region> {
        let index = self.regions.iter().position(|r| r.id == id)?;
        Some(self.regions.remove(index))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.regions.len();
        self.regions.clear();
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn snapshot(&self) -> Vec<Region> {
        self.regions.clone()
    }

    /// Write derived state; updates for regions no longer present are dropped
    pub fn apply(&mut self, updates: Vec<RegionUpdate>) -> usize {
        let mut applied = 0;
        for update in updates {
            if let Some(region) = self.regions.iter_mut().find(|r| r.id == update.id) {
                if let Some(selection) = &update.derived.selection {
                    region.time_selection = selection.clone();
                }
                region.derived = update.derived;
                applied += 1;
            }
        }
        applied
    }
}
