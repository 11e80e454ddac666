//! NASA POWER daily point API client.
//!
//! Requests `T2M` (2 m air temperature, °C) and `PRECTOTCORR` (corrected
//! precipitation, mm/day). The API marks missing days with a fill value,
//! `-999` unless the response header says otherwise.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use feluda_core::entities::{AnalysisWindow, EnvSample, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;

use crate::{EnvironmentalSource, error::EnvError, http::check_response};

pub const SOURCE_LABEL: &str = "nasa-power";

const DEFAULT_FILL_VALUE: f64 = -999.0;

#[derive(serde::Deserialize)]
struct PowerResponse {
    header: Option<PowerHeader>,
    properties: PowerProperties,
}

#[derive(serde::Deserialize)]
struct PowerHeader {
    fill_value: Option<f64>,
}

#[derive(serde::Deserialize)]
struct PowerProperties {
    parameter: PowerParameters,
}

#[derive(serde::Deserialize)]
struct PowerParameters {
    #[serde(rename = "T2M", default)]
    t2m: BTreeMap<String, f64>,
    #[serde(rename = "PRECTOTCORR", default)]
    precipitation: BTreeMap<String, f64>,
}

/// Client for `power.larc.nasa.gov`.
#[derive(Debug, Clone)]
pub struct NasaPowerSource {
    http: reqwest::Client,
    base_url: String,
}

impl NasaPowerSource {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn request_url(&self, location: GeoPoint, window: &AnalysisWindow) -> String {
        format!(
            "{}?parameters=T2M,PRECTOTCORR&community=AG&longitude={:.5}&latitude={:.5}&start={}&end={}&format=JSON",
            self.base_url,
            location.lon,
            location.lat,
            window.start.format("%Y%m%d"),
            window.end.format("%Y%m%d"),
        )
    }
}

impl EnvironmentalSource for NasaPowerSource {
    fn name(&self) -> &str {
        SOURCE_LABEL
    }

    async fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        let url = self.request_url(location, &window);
        tracing::debug!(%url, "requesting nasa power daily point");
        let resp = check_response(self.http.get(&url).send().await?).await?;
        let body = resp.text().await?;
        parse_daily_point(&body)
    }
}

/// Map a daily point response body to a snapshot.
///
/// # Errors
///
/// Returns [`EnvError::Parse`] for malformed JSON or date keys and
/// [`EnvError::Empty`] when neither parameter has any day.
pub fn parse_daily_point(body: &str) -> Result<EnvironmentalSnapshot, EnvError> {
    let data: PowerResponse =
        serde_json::from_str(body).map_err(|e| EnvError::Parse(e.to_string()))?;
    let fill = data
        .header
        .and_then(|h| h.fill_value)
        .unwrap_or(DEFAULT_FILL_VALUE);
    let params = data.properties.parameter;

    let days: BTreeSet<&String> = params.t2m.keys().chain(params.precipitation.keys()).collect();
    if days.is_empty() {
        return Err(EnvError::Empty);
    }

    let present = |v: Option<&f64>| v.copied().filter(|x| (x - fill).abs() > f64::EPSILON);

    let mut samples = Vec::with_capacity(days.len());
    for day in days {
        let date = NaiveDate::parse_from_str(day, "%Y%m%d")
            .map_err(|e| EnvError::Parse(format!("bad date key '{day}': {e}")))?;
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| EnvError::Parse(format!("bad date key '{day}'")))?;
        samples.push(EnvSample {
            timestamp,
            ndvi: None,
            temperature_c: present(params.t2m.get(day)),
            precipitation_mm: present(params.precipitation.get(day)),
        });
    }

    Ok(EnvironmentalSnapshot {
        samples,
        source: SOURCE_LABEL.to_string(),
        ..EnvironmentalSnapshot::default()
    })
}
