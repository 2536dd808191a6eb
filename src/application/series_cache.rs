//! Process-lifetime cache of per-location hourly series.
//!
//! Entries are keyed by `(lat, lng, window start, window end)` and are
//! immutable once stored. Failed or empty fetches are never cached, so the
//! next lookup for the same key tries again. Concurrent first lookups of one
//! key are collapsed onto a single fetch.

use crate::application::series_fetcher::SeriesFetcher;
use crate::domain::error::AnnotationError;
use crate::domain::series::{FetchWindow, HourlySeries, SeriesKey};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time view of cache activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub failures: u64,
    pub entries: usize,
}

pub struct SeriesCache {
    fetcher: SeriesFetcher,
    entries: RwLock<HashMap<SeriesKey, Arc<HourlySeries>>>,
    in_flight: Gates,
    counters: CacheCounters,
}

impl SeriesCache {
    pub fn new(fetcher: SeriesFetcher) -> Self {
        Self {
            fetcher,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            counters: CacheCounters::default(),
        }
    }

    pub fn get(&self, key: &SeriesKey) -> Option<Arc<HourlySeries>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub async fn get_or_fetch(
        &self,
        lat: f64,
        lng: f64,
        window: &FetchWindow,
    ) -> Result<Arc<HourlySeries>, AnnotationError> {
        let key = SeriesKey::new(lat, lng, window);
        if let Some(entry) = self.get(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Series cache hit for {}", key);
            return Ok(entry);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let gate = GateRelease {
            in_flight: &self.in_flight,
            key,
            gate: self.gate_for(key),
        };
        let _permit = gate.gate.lock().await;

        // another task may have filled the key while we waited
        if let Some(entry) = self.get(&key) {
            return Ok(entry);
        }

        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        let result = self.fetcher.fetch(lat, lng, window).await;

        match result {
            Ok(series) => {
                let entry = Arc::new(series);
                self.entries
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(key, entry.clone());
                tracing::debug!("Cached {} samples for {}", entry.len(), key);
                Ok(entry)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Series fetch failed for {}: {}", key, e);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            entries: self.entries.read().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }

    fn gate_for(&self, key: SeriesKey) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_default()
            .clone()
    }
}

type Gates = Mutex<HashMap<SeriesKey, Arc<tokio::sync::Mutex<()>>>>;

/// Drops the key's gate once no other caller holds it, including when the
/// owning lookup is cancelled.
struct GateRelease<'a> {
    in_flight: &'a Gates,
    key: SeriesKey,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for GateRelease<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let ours = std::mem::take(&mut self.gate);
        let Some(current) = in_flight.get(&self.key) else {
            return;
        };
        if !Arc::ptr_eq(current, &ours) {
            return;
        }
        drop(ours);
        // clones are only handed out under this lock, so a lone map reference means no waiters
        if Arc::strong_count(current) == 1 {
            in_flight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::series_source::testing::StubSource;
    use crate::application::series_source::{Endpoint, HourlySource, SourceError};
    use crate::domain::series::WindowPolicy;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn window() -> FetchWindow {
        FetchWindow::around(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            WindowPolicy::default(),
        )
    }

    fn cache_over(source: Arc<StubSource>) -> SeriesCache {
        SeriesCache::new(SeriesFetcher::new(source, Duration::from_secs(5)))
    }

    fn sample_source() -> Arc<StubSource> {
        Arc::new(StubSource::forecast_only(&[
            ("2024-06-01T00:00".to_string(), 20.0),
            ("2024-06-01T01:00".to_string(), 21.0),
        ]))
    }

    #[tokio::test]
    async fn test_second_lookup_does_not_fetch() {
        let source = sample_source();
        let cache = cache_over(source.clone());

        let first = cache.get_or_fetch(28.6139, 77.209, &window()).await.unwrap();
        let calls = source.calls();
        let second = cache.get_or_fetch(28.6139, 77.209, &window()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), calls);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_distinct_coordinates_miss() {
        let source = sample_source();
        let cache = cache_over(source.clone());

        cache.get_or_fetch(10.0, 10.0, &window()).await.unwrap();
        cache.get_or_fetch(10.0 + 1e-10, 10.0, &window()).await.unwrap();
        assert_eq!(cache.stats().entries, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = sample_source();
        source.set_unreachable(10.0);
        let cache = cache_over(source.clone());

        assert!(cache.get_or_fetch(10.0, 10.0, &window()).await.is_err());
        assert_eq!(cache.stats().entries, 0);

        source.set_reachable(10.0);
        assert!(cache.get_or_fetch(10.0, 10.0, &window()).await.is_ok());
        assert_eq!(cache.stats().failures, 1);
        assert_eq!(cache.stats().fetches, 2);
    }

    #[tokio::test]
    async fn test_empty_series_not_cached() {
        let source = Arc::new(StubSource::new(
            Err(SourceError::Rejected("bad".into())),
            Ok(HourlySeries::default()),
        ));
        let cache = cache_over(source);
        assert!(cache.get_or_fetch(1.0, 1.0, &window()).await.is_err());
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let source = sample_source();
        let cache = cache_over(source.clone());
        let w = window();

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(5.0, 5.0, &w),
            cache.get_or_fetch(5.0, 5.0, &w),
            cache.get_or_fetch(5.0, 5.0, &w),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(cache.stats().fetches, 1);
        // one archive + one forecast request
        assert_eq!(source.calls(), 2);
    }

    fn gates(cache: &SeriesCache) -> usize {
        cache.in_flight.lock().unwrap().len()
    }

    struct Stalled;

    #[async_trait]
    impl HourlySource for Stalled {
        async fn hourly(
            &self,
            _endpoint: Endpoint,
            _lat: f64,
            _lng: f64,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<HourlySeries, SourceError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_gates_are_released() {
        let cache = cache_over(sample_source());
        let w = window();
        let _ = tokio::join!(
            cache.get_or_fetch(5.0, 5.0, &w),
            cache.get_or_fetch(5.0, 5.0, &w),
        );
        assert_eq!(gates(&cache), 0);
    }

    #[tokio::test]
    async fn test_cancelled_lookup_releases_gate() {
        let cache = SeriesCache::new(SeriesFetcher::new(Arc::new(Stalled), Duration::from_secs(30)));
        let win = window();
        let lookup = cache.get_or_fetch(5.0, 5.0, &win);
        assert!(tokio::time::timeout(Duration::from_millis(20), lookup).await.is_err());
        assert_eq!(gates(&cache), 0);
    }

    #[test]
    fn test_release_keeps_a_newer_gate() {
        let cache = cache_over(sample_source());
        let key = SeriesKey::new(5.0, 5.0, &window());
        let current = cache.gate_for(key);

        drop(GateRelease {
            in_flight: &cache.in_flight,
            key,
            gate: Arc::default(),
        });
        assert!(Arc::ptr_eq(&cache.gate_for(key), &current));
    }
}
