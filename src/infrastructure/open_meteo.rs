// Open-Meteo hourly data source (archive + forecast endpoints)
use crate::application::series_source::{Endpoint, HourlySource, SourceError};
use crate::domain::series::HourlySeries;
use crate::infrastructure::config::SourceSettings;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    client: reqwest::Client,
    archive_url: String,
    forecast_url: String,
    variable: String,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    hourly: Option<HashMap<String, Value>>,
    #[serde(default)]
    reason: Option<String>,
}

impl OpenMeteoSource {
    pub fn new(settings: &SourceSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            client,
            archive_url: settings.archive_url.trim_end_matches('/').to_string(),
            forecast_url: settings.forecast_url.trim_end_matches('/').to_string(),
            variable: settings.variable.clone(),
            timezone: settings.timezone.clone(),
        })
    }

    fn build_url(
        &self,
        endpoint: Endpoint,
        lat: f64,
        lng: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> String {
        let base = match endpoint {
            Endpoint::Archive => &self.archive_url,
            Endpoint::Forecast => &self.forecast_url,
        };
        let mut url = format!(
            "{}?latitude={}&longitude={}&start_date={}&end_date={}&hourly={}&timezone={}",
            base,
            lat,
            lng,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            urlencoding::encode(&self.variable),
            urlencoding::encode(&self.timezone),
        );
        if endpoint == Endpoint::Archive {
            url.push_str("&models=best_match");
        }
        url
    }
}

/// Pull the parallel time/value arrays out of an hourly block.
///
/// Missing fields yield `Rejected`; null samples are dropped pairwise.
fn parse_hourly(body: OpenMeteoResponse, variable: &str) -> Result<HourlySeries, SourceError> {
    let Some(hourly) = body.hourly else {
        let reason = body.reason.unwrap_or_else(|| "missing hourly block".to_string());
        return Err(SourceError::Rejected(reason));
    };
    let (Some(Value::Array(times)), Some(Value::Array(values))) =
        (hourly.get("time"), hourly.get(variable))
    else {
        return Err(SourceError::Rejected(format!(
            "hourly block lacks time or {}",
            variable
        )));
    };

    let (time, value) = times
        .iter()
        .zip(values)
        .filter_map(|(t, v)| Some((t.as_str()?.to_string(), v.as_f64()?)))
        .unzip();
    Ok(HourlySeries::new(time, value))
}

#[async_trait]
impl HourlySource for OpenMeteoSource {
    async fn hourly(
        &self,
        endpoint: Endpoint,
        lat: f64,
        lng: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlySeries, SourceError> {
        let url = self.build_url(endpoint, lat, lng, start, end);
        tracing::debug!("Requesting {:?} series: {}", endpoint, url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .json::<OpenMeteoResponse>()
            .await
            .map_err(|e| SourceError::Rejected(format!("unreadable payload ({}): {}", status, e)))?;

        if !status.is_success() {
            let reason = body.reason.unwrap_or_default();
            return Err(SourceError::Rejected(format!("status {}: {}", status, reason)));
        }

        parse_hourly(body, &self.variable)
    }
}
