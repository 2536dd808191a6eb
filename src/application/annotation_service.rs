// Annotation service - Owns regions, rules and selection; runs reconciliation passes
use crate::application::reconciler::reconcile;
use crate::application::region_store::RegionStore;
use crate::application::series_cache::{CacheStats, SeriesCache};
use crate::domain::error::AnnotationError;
use crate::domain::region::{NewRegion, Region};
use crate::domain::rules::{default_rules, ColorRule};
use crate::domain::selection::TimeSelection;
use crate::domain::series::{FetchWindow, WindowPolicy};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub window: WindowPolicy,
    pub max_concurrent_fetches: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            window: WindowPolicy::default(),
            max_concurrent_fetches: 4,
        }
    }
}

/// Result of one `refresh` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Updates were written to the store
    Applied { generation: u64, updated: usize },
    /// Inputs changed while the pass ran; its results were dropped
    Superseded { generation: u64 },
    /// A newer trigger was already queued, so this one did not run
    Coalesced { generation: u64 },
}

struct Inputs {
    store: RegionStore,
    rules: Vec<ColorRule>,
    selection: TimeSelection,
}

pub struct AnnotationService {
    cache: Arc<SeriesCache>,
    settings: EngineSettings,
    inputs: RwLock<Inputs>,
    generation: AtomicU64,
    pass_lock: tokio::sync::Mutex<()>,
}

impl AnnotationService {
    pub fn new(cache: Arc<SeriesCache>, settings: EngineSettings) -> Self {
        Self {
            cache,
            settings,
            inputs: RwLock::new(Inputs {
                store: RegionStore::new(),
                rules: default_rules(),
                selection: TimeSelection::current_hour(Utc::now().naive_utc()),
            }),
            generation: AtomicU64::new(0),
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inputs> {
        self.inputs.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutate inputs and bump the generation under the same lock
    fn mutate<T>(&self, f: impl FnOnce(&mut Inputs) -> T) -> T {
        let mut inputs: RwLockWriteGuard<'_, Inputs> =
            self.inputs.write().unwrap_or_else(|e| e.into_inner());
        let out = f(&mut inputs);
        self.generation.fetch_add(1, Ordering::SeqCst);
        out
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn add_region(&self, input: NewRegion) -> Result<Region, AnnotationError> {
        let selection = self.read().selection.clone();
        let region = Region::create(Uuid::new_v4().to_string(), input, selection)?;
        self.mutate(|inputs| inputs.store.insert(region.clone()));
        tracing::info!(
            "Region {} created at ({:.4}, {:.4})",
            region.id, region.centroid.lat, region.centroid.lng
        );
        Ok(region)
    }

    pub fn remove_region(&self, id: &str) -> Result<(), AnnotationError> {
        if self.read().store.get(id).is_none() {
            return Err(AnnotationError::RegionNotFound(id.to_string()));
        }
        self.mutate(|inputs| inputs.store.remove(id))
            .map(|_| tracing::info!("Region {} deleted", id))
            .ok_or_else(|| AnnotationError::RegionNotFound(id.to_string()))
    }

    pub fn clear_regions(&self) -> usize {
        let removed = self.mutate(|inputs| inputs.store.clear());
        tracing::info!("Cleared {} regions", removed);
        removed
    }

    pub fn regions(&self) -> Vec<Region> {
        self.read().store.snapshot()
    }

    pub fn region(&self, id: &str) -> Option<Region> {
        self.read().store.get(id).cloned()
    }

    pub fn selection(&self) -> TimeSelection {
        self.read().selection.clone()
    }

    pub fn set_selection(&self, selection: TimeSelection) {
        tracing::debug!("Time selection changed to {:?}", selection);
        self.mutate(|inputs| inputs.selection = selection);
    }

    pub fn rules(&self) -> Vec<ColorRule> {
        self.read().rules.clone()
    }

    pub fn set_rules(&self, rules: Vec<ColorRule>) {
        tracing::debug!("Rule set replaced with {} rules", rules.len());
        self.mutate(|inputs| inputs.rules = rules);
    }

    pub fn set_rule_color(&self, index: usize, color: String) -> Result<(), AnnotationError> {
        if index >= self.read().rules.len() {
            return Err(AnnotationError::RuleNotFound(index));
        }
        self.mutate(|inputs| match inputs.rules.get_mut(index) {
            Some(rule) => {
                rule.color = color;
                Ok(())
            }
            None => Err(AnnotationError::RuleNotFound(index)),
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Run one reconciliation pass against the latest inputs.
    ///
    /// Passes are serialized. A pass whose inputs change before it finishes
    /// discards its results instead of writing stale state.
    pub async fn refresh(&self) -> PassOutcome {
        let requested = self.generation();
        let _pass = self.pass_lock.lock().await;

        let (generation, regions, rules, selection) = {
            let inputs = self.read();
            let generation = self.generation();
            if generation != requested {
                tracing::debug!(
                    "Pass for generation {} coalesced into {}",
                    requested, generation
                );
                return PassOutcome::Coalesced { generation: requested };
            }
            (
                generation,
                inputs.store.snapshot(),
                inputs.rules.clone(),
                inputs.selection.clone(),
            )
        };

        let window = FetchWindow::around(Utc::now().date_naive(), self.settings.window);
        let updates = reconcile(
            &regions,
            &rules,
            &selection,
            &self.cache,
            &window,
            self.settings.max_concurrent_fetches,
        )
        .await;

        let mut inputs = self.inputs.write().unwrap_or_else(|e| e.into_inner());
        if self.generation() != generation {
            tracing::info!(
                "Discarding {} updates from superseded generation {}",
                updates.len(),
                generation
            );
            return PassOutcome::Superseded { generation };
        }
        let updated = inputs.store.apply(updates);
        tracing::info!(
            "Reconciled {} regions (generation {}): {} updated",
            regions.len(),
            generation,
            updated
        );
        PassOutcome::Applied { generation, updated }
    }
}
