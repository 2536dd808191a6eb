// Change-gated reconciliation of region derived state
use crate::application::series_cache::SeriesCache;
use crate::domain::region::{DerivedState, Region, RegionUpdate};
use crate::domain::rules::{evaluate, ColorRule};
use crate::domain::selection::{resolve, TimeSelection};
use crate::domain::series::{FetchWindow, HourlySeries};
use futures::stream::{self, StreamExt};

/// Derived state the region should hold for this series and selection.
///
/// Returns `None` when the selection has no samples in the series.
pub fn candidate_state(
    series: &HourlySeries,
    rules: &[ColorRule],
    selection: &TimeSelection,
) -> Option<DerivedState> {
    let resolved = resolve(series, selection);
    let value = resolved.scalar?;
    tracing::debug!("Resolved {} from {} samples", value, resolved.sample_count);
    Some(DerivedState {
        value: Some(value),
        color: Some(evaluate(rules, Some(value))),
        series: Some(series.to_points()),
        selection: Some(selection.clone()),
    })
}

/// Compute the updates needed for `regions` without applying them.
///
/// Regions whose data is unavailable, or whose selection has no samples,
/// are skipped and keep their last derived state. Regions whose candidate
/// state equals the stored state are omitted.
pub async fn reconcile(
    regions: &[Region],
    rules: &[ColorRule],
    selection: &TimeSelection,
    cache: &SeriesCache,
    window: &FetchWindow,
    max_concurrent: usize,
) -> Vec<RegionUpdate> {
    stream::iter(regions.to_vec())
        .map(|region| async move {
            let series = match cache
                .get_or_fetch(region.centroid.lat, region.centroid.lng, window)
                .await
            {
                Ok(series) => series,
                Err(e) => {
                    tracing::debug!("Skipping region {}: {}", region.id, e);
                    return None;
                }
            };

            let Some(candidate) = candidate_state(&series, rules, selection) else {
                tracing::debug!("No sample for region {} at {:?}", region.id, selection);
                return None;
            };

            region.derived.differs_from(&candidate).then(|| RegionUpdate {
                id: region.id.clone(),
                derived: candidate,
            })
        })
        .buffered(max_concurrent.max(1))
        .filter_map(|update| async move { update })
        .collect()
        .await
}
