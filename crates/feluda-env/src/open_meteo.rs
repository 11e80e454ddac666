//! Open-Meteo historical weather archive client.
//!
//! Requests daily mean 2 m temperature and daily precipitation totals for the
//! analysis window. Missing days come back as JSON `null`.

use chrono::NaiveDate;
use feluda_core::entities::{AnalysisWindow, EnvSample, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;

use crate::{EnvironmentalSource, error::EnvError, http::check_response};

pub const SOURCE_LABEL: &str = "open-meteo";

#[derive(serde::Deserialize)]
struct ArchiveResponse {
    daily: Option<ArchiveDaily>,
}

#[derive(serde::Deserialize)]
struct ArchiveDaily {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

/// Client for `archive-api.open-meteo.com`.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoSource {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn request_url(&self, location: GeoPoint, window: &AnalysisWindow) -> String {
        format!(
            "{}?latitude={:.5}&longitude={:.5}&start_date={}&end_date={}&daily=temperature_2m_mean,precipitation_sum&timezone=UTC",
            self.base_url,
            location.lat,
            location.lon,
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d"),
        )
    }
}

impl EnvironmentalSource for OpenMeteoSource {
    fn name(&self) -> &str {
        SOURCE_LABEL
    }

    async fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        let url = self.request_url(location, &window);
        tracing::debug!(%url, "requesting open-meteo archive");
        let resp = check_response(self.http.get(&url).send().await?).await?;
        let body = resp.text().await?;
        parse_archive(&body)
    }
}

/// Map an archive response body to a snapshot.
///
/// # Errors
///
/// Returns [`EnvError::Parse`] for malformed JSON or dates and
/// [`EnvError::Empty`] when the `daily` block has no days.
pub fn parse_archive(body: &str) -> Result<EnvironmentalSnapshot, EnvError> {
    let data: ArchiveResponse =
        serde_json::from_str(body).map_err(|e| EnvError::Parse(e.to_string()))?;
    let daily = data.daily.ok_or(EnvError::Empty)?;
    if daily.time.is_empty() {
        return Err(EnvError::Empty);
    }

    let mut samples = Vec::with_capacity(daily.time.len());
    for (idx, day) in daily.time.iter().enumerate() {
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| EnvError::Parse(format!("bad date '{day}': {e}")))?;
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| EnvError::Parse(format!("bad date '{day}'")))?;
        samples.push(EnvSample {
            timestamp,
            ndvi: None,
            temperature_c: daily.temperature_2m_mean.get(idx).copied().flatten(),
            precipitation_mm: daily.precipitation_sum.get(idx).copied().flatten(),
        });
    }

    Ok(EnvironmentalSnapshot {
        samples,
        source: SOURCE_LABEL.to_string(),
        ..EnvironmentalSnapshot::default()
    })
}
