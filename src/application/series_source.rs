// Port for the remote hourly data source
use crate::domain::series::HourlySeries;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Which upstream endpoint to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Archive,
    Forecast,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// The request never produced a response (connect error, timeout)
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response arrived but carried no usable hourly data
    #[error("upstream rejected request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait HourlySource: Send + Sync {
    /// Hourly samples for the inclusive date span at one location
    async fn hourly(
        &self,
        endpoint: Endpoint,
        lat: f64,
        lng: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlySeries, SourceError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source with canned per-endpoint responses
    pub struct StubSource {
        responses: HashMap<Endpoint, Result<HourlySeries, SourceError>>,
        unreachable_lats: Mutex<Vec<f64>>,
        calls: AtomicUsize,
    }

    impl StubSource {
        pub fn new(
            archive: Result<HourlySeries, SourceError>,
            forecast: Result<HourlySeries, SourceError>,
        ) -> Self {
            let mut responses = HashMap::new();
            responses.insert(Endpoint::Archive, archive);
            responses.insert(Endpoint::Forecast, forecast);
            Self {
                responses,
                unreachable_lats: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        /// Forecast-only source returning the given points
        pub fn forecast_only(points: &[(String, f64)]) -> Self {
            Self::new(
                Ok(HourlySeries::default()),
                Ok(HourlySeries::new(
                    points.iter().map(|(t, _)| t.clone()).collect(),
                    points.iter().map(|(_, v)| *v).collect(),
                )),
            )
        }

        /// Fail every request at this latitude with a transport error
        pub fn set_unreachable(&self, lat: f64) {
            self.unreachable_lats.lock().unwrap().push(lat);
        }

        pub fn set_reachable(&self, lat: f64) {
            self.unreachable_lats.lock().unwrap().retain(|l| *l != lat);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HourlySource for StubSource {
        async fn hourly(
            &self,
            endpoint: Endpoint,
            lat: f64,
            _lng: f64,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<HourlySeries, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.unreachable_lats.lock().unwrap().contains(&lat) {
                return Err(SourceError::Transport("unreachable".to_string()));
            }
            self.responses
                .get(&endpoint)
                .cloned()
                .unwrap_or_else(|| Ok(HourlySeries::default()))
        }
    }
}
