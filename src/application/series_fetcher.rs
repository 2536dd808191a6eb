// Remote series fetcher - archive + forecast merged into one series
use crate::application::series_source::{Endpoint, HourlySource, SourceError};
use crate::domain::error::AnnotationError;
use crate::domain::series::{FetchWindow, HourlySeries};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct SeriesFetcher {
    source: Arc<dyn HourlySource>,
    timeout: Duration,
}

impl SeriesFetcher {
    pub fn new(source: Arc<dyn HourlySource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Fetch both halves of the window concurrently and concatenate them.
    ///
    /// A transport failure on either side makes the location unavailable.
    /// A rejected or empty side contributes nothing.
    pub async fn fetch(
        &self,
        lat: f64,
        lng: f64,
        window: &FetchWindow,
    ) -> Result<HourlySeries, AnnotationError> {
        let (past, future) = futures::join!(
            self.request(Endpoint::Archive, lat, lng, window.past_start, window.past_end),
            self.request(Endpoint::Forecast, lat, lng, window.future_start, window.future_end),
        );

        let mut series = HourlySeries::default();
        for (endpoint, result) in [(Endpoint::Archive, past), (Endpoint::Forecast, future)] {
            match result {
                Ok(block) => series.extend(block),
                Err(SourceError::Rejected(reason)) => {
                    tracing::warn!(
                        "{:?} data rejected for ({}, {}): {}",
                        endpoint, lat, lng, reason
                    );
                }
                Err(e @ SourceError::Transport(_)) => {
                    return Err(AnnotationError::DataUnavailable(e.to_string()));
                }
            }
        }

        if series.is_empty() {
            return Err(AnnotationError::DataUnavailable(format!(
                "no hourly samples for ({}, {})",
                lat, lng
            )));
        }

        tracing::debug!("Fetched {} hourly samples for ({}, {})", series.len(), lat, lng);
        Ok(series)
    }

    async fn request(
        &self,
        endpoint: Endpoint,
        lat: f64,
        lng: f64,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<HourlySeries, SourceError> {
        tokio::time::timeout(self.timeout, self.source.hourly(endpoint, lat, lng, start, end))
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Transport(format!(
                    "{:?} request timed out after {:?}",
                    endpoint, self.timeout
                )))
            })
    }
}
