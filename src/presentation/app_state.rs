// Application state for HTTP handlers
use crate::application::annotation_service::{AnnotationService, PassOutcome};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AppState {
    pub annotation_service: Arc<AnnotationService>,
}

impl AppState {
    /// Run a reconciliation pass in the background
    pub fn trigger_refresh(&self) -> JoinHandle<PassOutcome> {
        let service = self.annotation_service.clone();
        tokio::spawn(async move {
            let outcome = service.refresh().await;
            tracing::debug!("Background refresh finished: {:?}", outcome);
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::annotation_service::EngineSettings;
    use crate::application::series_cache::SeriesCache;
    use crate::application::series_fetcher::SeriesFetcher;
    use crate::application::series_source::testing::StubSource;
    use crate::domain::geo::LatLng;
    use crate::domain::region::NewRegion;
    use crate::domain::selection::TimeSelection;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_background_refresh_applies_updates() {
        let hour = format!("{}T09:00", Utc::now().date_naive().format("%Y-%m-%d"));
        let source = Arc::new(StubSource::forecast_only(&[(hour.clone(), 21.5)]));
        let cache = Arc::new(SeriesCache::new(SeriesFetcher::new(
            source,
            Duration::from_secs(5),
        )));
        let state = AppState {
            annotation_service: Arc::new(AnnotationService::new(cache, EngineSettings::default())),
        };
        state.annotation_service.set_selection(TimeSelection::Instant(hour));
        let region = state
            .annotation_service
            .add_region(NewRegion {
                coordinates: vec![
                    LatLng::new(0.0, 0.0),
                    LatLng::new(0.0, 3.0),
                    LatLng::new(3.0, 0.0),
                ],
                data_source: None,
                variable: None,
            })
            .unwrap();

        let outcome = state.trigger_refresh().await.unwrap();
        assert!(matches!(outcome, PassOutcome::Applied { updated: 1, .. }));
        let stored = state.annotation_service.region(&region.id).unwrap();
        assert_eq!(stored.derived.value, Some(21.5));
    }
}
