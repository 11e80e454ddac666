//! Site descriptors from SoilGrids (topsoil pH, clay) and OpenTopoData
//! (elevation, used as a slope proxy).
//!
//! Site lookups never fail an estimate. Each lookup that errors is logged and
//! its fields stay `None`.

use std::future::Future;

use feluda_core::entities::{AnalysisWindow, EnvironmentalSnapshot, SiteContext};
use feluda_core::geo::GeoPoint;

use crate::{EnvironmentalSource, error::EnvError, http::check_response};

/// Depth over which SoilGrids layers are averaged.
pub const TOPSOIL_DEPTH_CM: f64 = 30.0;

/// Slope proxy cap, in percent.
const MAX_SLOPE_PCT: f64 = 45.0;

#[derive(serde::Deserialize)]
struct SoilGridsResponse {
    properties: Option<SoilGridsProperties>,
}

#[derive(serde::Deserialize)]
struct SoilGridsProperties {
    #[serde(default)]
    layers: Vec<SoilLayer>,
}

#[derive(serde::Deserialize)]
struct SoilLayer {
    name: String,
    #[serde(default)]
    depths: Vec<SoilDepth>,
}

#[derive(serde::Deserialize)]
struct SoilDepth {
    range: DepthRange,
    values: DepthValues,
}

#[derive(serde::Deserialize)]
struct DepthRange {
    top_depth: f64,
    bottom_depth: f64,
}

#[derive(serde::Deserialize)]
struct DepthValues {
    mean: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    results: Vec<ElevationResult>,
}

#[derive(serde::Deserialize)]
struct ElevationResult {
    elevation: Option<f64>,
}

/// Soil properties parsed from a SoilGrids point query.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SoilProperties {
    pub ph: Option<f64>,
    pub clay_pct: Option<f64>,
}

/// Parse a SoilGrids `properties/query` body.
///
/// Layer means are thickness-weighted down to [`TOPSOIL_DEPTH_CM`]. SoilGrids
/// reports `phh2o` as pH×10 and `clay` as g/kg, so both are divided by ten.
///
/// # Errors
///
/// Returns [`EnvError::Parse`] for malformed JSON and [`EnvError::Empty`]
/// when the body has no `properties` block.
pub fn parse_soilgrids(body: &str) -> Result<SoilProperties, EnvError> {
    let data: SoilGridsResponse =
        serde_json::from_str(body).map_err(|e| EnvError::Parse(e.to_string()))?;
    let properties = data.properties.ok_or(EnvError::Empty)?;

    let mut soil = SoilProperties::default();
    for layer in &properties.layers {
        let value = topsoil_mean(&layer.depths).map(|raw| raw / 10.0);
        match layer.name.as_str() {
            "phh2o" => soil.ph = value,
            "clay" => soil.clay_pct = value,
            _ => {}
        }
    }
    Ok(soil)
}

/// Thickness-weighted mean of the depth intervals above the topsoil cutoff.
/// Intervals with no mean are skipped.
fn topsoil_mean(depths: &[SoilDepth]) -> Option<f64> {
    let mut covered = 0.0;
    let mut weighted = 0.0;
    for depth in depths {
        if covered >= TOPSOIL_DEPTH_CM {
            break;
        }
        let Some(mean) = depth.values.mean else {
            continue;
        };
        let thickness = depth.range.bottom_depth - depth.range.top_depth;
        let used = thickness.min(TOPSOIL_DEPTH_CM - covered);
        if used <= 0.0 {
            continue;
        }
        weighted += mean * used;
        covered += used;
    }
    (covered > 0.0).then(|| weighted / covered)
}

/// Parse an OpenTopoData single-location body into metres above sea level.
///
/// # Errors
///
/// Returns [`EnvError::Parse`] for malformed JSON and [`EnvError::Empty`]
/// when there is no result or the dataset has no value at the point.
pub fn parse_elevation(body: &str) -> Result<f64, EnvError> {
    let data: ElevationResponse =
        serde_json::from_str(body).map_err(|e| EnvError::Parse(e.to_string()))?;
    data.results
        .first()
        .and_then(|r| r.elevation)
        .ok_or(EnvError::Empty)
}

/// Coarse slope proxy: 5 % per 1000 m of elevation, clamped to `[0, 45]`.
#[must_use]
pub fn slope_from_elevation(elevation_m: f64) -> f64 {
    (elevation_m / 1000.0 * 5.0).clamp(0.0, MAX_SLOPE_PCT)
}

// ── Lookup capability ──────────────────────────────────────────────

/// Something that can describe the site at a location.
pub trait SiteLookup: Send + Sync {
    fn lookup(&self, location: GeoPoint) -> impl Future<Output = SiteContext> + Send;
}

/// A fixed site, for tests and offline runs.
impl SiteLookup for SiteContext {
    async fn lookup(&self, _location: GeoPoint) -> SiteContext {
        self.clone()
    }
}

/// `None` disables site lookups.
impl<L: SiteLookup> SiteLookup for Option<L> {
    async fn lookup(&self, location: GeoPoint) -> SiteContext {
        match self {
            Some(inner) => inner.lookup(location).await,
            None => SiteContext::default(),
        }
    }
}

/// HTTP client for SoilGrids and OpenTopoData.
#[derive(Debug, Clone)]
pub struct SiteClient {
    http: reqwest::Client,
    soilgrids_url: String,
    elevation_url: String,
}

impl SiteClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        soilgrids_url: impl Into<String>,
        elevation_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            soilgrids_url: soilgrids_url.into(),
            elevation_url: elevation_url.into(),
        }
    }

    fn soilgrids_request_url(&self, location: GeoPoint) -> String {
        format!(
            "{}?lon={:.5}&lat={:.5}&property=phh2o&property=clay&value=mean",
            self.soilgrids_url, location.lon, location.lat
        )
    }

    fn elevation_request_url(&self, location: GeoPoint) -> String {
        format!(
            "{}?locations={:.5},{:.5}",
            self.elevation_url, location.lat, location.lon
        )
    }

    async fn get(&self, url: &str) -> Result<String, EnvError> {
        let resp = check_response(self.http.get(url).send().await?).await?;
        Ok(resp.text().await?)
    }

    async fn soil(&self, location: GeoPoint) -> Result<SoilProperties, EnvError> {
        let url = self.soilgrids_request_url(location);
        tracing::debug!(%url, "requesting soilgrids");
        parse_soilgrids(&self.get(&url).await?)
    }

    async fn elevation(&self, location: GeoPoint) -> Result<f64, EnvError> {
        let url = self.elevation_request_url(location);
        tracing::debug!(%url, "requesting elevation");
        parse_elevation(&self.get(&url).await?)
    }
}

impl SiteLookup for SiteClient {
    async fn lookup(&self, location: GeoPoint) -> SiteContext {
        let (soil, elevation) = tokio::join!(self.soil(location), self.elevation(location));
        let soil = soil.unwrap_or_else(|error| {
            tracing::warn!(%error, "soilgrids lookup failed, soil fields left unset");
            SoilProperties::default()
        });
        let slope_pct = match elevation {
            Ok(metres) => Some(slope_from_elevation(metres)),
            Err(error) => {
                tracing::warn!(%error, "elevation lookup failed, slope left unset");
                None
            }
        };
        SiteContext {
            soil_ph: soil.ph,
            clay_pct: soil.clay_pct,
            slope_pct,
        }
    }
}

// ── Enrichment ─────────────────────────────────────────────────────

/// Fetches weather from `inner`, then fills any unset site fields from
/// `site`. Site fields already present on the snapshot are kept.
#[derive(Debug, Clone)]
pub struct SiteEnrichedSource<S, L> {
    inner: S,
    site: L,
}

impl<S, L> SiteEnrichedSource<S, L> {
    pub const fn new(inner: S, site: L) -> Self {
        Self { inner, site }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub const fn site(&self) -> &L {
        &self.site
    }
}

impl<S, L> EnvironmentalSource for SiteEnrichedSource<S, L>
where
    S: EnvironmentalSource,
    L: SiteLookup,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        let mut snapshot = self.inner.fetch_snapshot(location, window).await?;
        let found = self.site.lookup(location).await;
        let site = &mut snapshot.site;
        site.soil_ph = site.soil_ph.or(found.soil_ph);
        site.clay_pct = site.clay_pct.or(found.clay_pct);
        site.slope_pct = site.slope_pct.or(found.slope_pct);
        Ok(snapshot)
    }
}
