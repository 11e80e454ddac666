//! # feluda-env
//!
//! Environmental data acquisition for Feluda.
//!
//! The estimation engine consumes already-fetched [`EnvironmentalSnapshot`]s
//! through the [`EnvironmentalSource`] capability and never depends on a
//! provider's transport. This crate supplies:
//! - NASA POWER daily point client
//! - Open-Meteo historical archive client
//! - SoilGrids and OpenTopoData site lookups (soil pH, clay, slope)
//! - primary/fallback chaining, bounded per-(location, window) caching
//! - bounded-timeout retry with exponential backoff
//! - in-memory fixture sources for tests and offline runs

pub mod cache;
pub mod fallback;
pub mod nasa_power;
pub mod open_meteo;
pub mod retry;
pub mod site;

mod error;
mod fixture;
mod http;

pub use cache::CachedSource;
pub use error::EnvError;
pub use fallback::FallbackSource;
pub use fixture::{StaticSource, UnavailableSource};
pub use nasa_power::NasaPowerSource;
pub use open_meteo::OpenMeteoSource;
pub use retry::{RetryPolicy, fetch_with_retry};
pub use site::{SiteClient, SiteEnrichedSource, SiteLookup};

use std::future::Future;

use feluda_config::{ProviderConfig, ProviderKind};
use feluda_core::entities::{AnalysisWindow, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;

// ── Capability ─────────────────────────────────────────────────────

/// Something that can produce an environmental snapshot for a location and
/// analysis window.
pub trait EnvironmentalSource: Send + Sync {
    /// Short label recorded on snapshots and in logs.
    fn name(&self) -> &str;

    /// Fetch samples covering `window` at `location`.
    fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> impl Future<Output = Result<EnvironmentalSnapshot, EnvError>> + Send;
}

// ── Configured providers ───────────────────────────────────────────

/// One HTTP provider selected by configuration.
#[derive(Debug, Clone)]
pub enum HttpSource {
    OpenMeteo(OpenMeteoSource),
    NasaPower(NasaPowerSource),
    Disabled,
}

impl HttpSource {
    fn from_kind(kind: ProviderKind, http: &reqwest::Client, config: &ProviderConfig) -> Self {
        match kind {
            ProviderKind::OpenMeteo => {
                Self::OpenMeteo(OpenMeteoSource::new(http.clone(), &config.open_meteo_url))
            }
            ProviderKind::NasaPower => {
                Self::NasaPower(NasaPowerSource::new(http.clone(), &config.nasa_power_url))
            }
            ProviderKind::None => Self::Disabled,
        }
    }
}

impl EnvironmentalSource for HttpSource {
    fn name(&self) -> &str {
        match self {
            Self::OpenMeteo(s) => s.name(),
            Self::NasaPower(s) => s.name(),
            Self::Disabled => "disabled",
        }
    }

    async fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        match self {
            Self::OpenMeteo(s) => s.fetch_snapshot(location, window).await,
            Self::NasaPower(s) => s.fetch_snapshot(location, window).await,
            Self::Disabled => Err(EnvError::Disabled),
        }
    }
}

/// The provider stack assembled from [`ProviderConfig`].
pub type ConfiguredSource =
    CachedSource<SiteEnrichedSource<FallbackSource<HttpSource, HttpSource>, Option<SiteClient>>>;

/// Build the primary → fallback chain, enrich it with site lookups when
/// enabled, and wrap it in a cache when enabled.
///
/// # Errors
///
/// Returns [`EnvError::Http`] if the HTTP client cannot be built.
pub fn configured_source(config: &ProviderConfig) -> Result<ConfiguredSource, EnvError> {
    let http = http::build_client(&config.user_agent)?;
    let primary = HttpSource::from_kind(config.primary, &http, config);
    let fallback = HttpSource::from_kind(config.fallback, &http, config);
    let site = config
        .site_lookup
        .then(|| SiteClient::new(http.clone(), &config.soilgrids_url, &config.elevation_url));
    let chain = SiteEnrichedSource::new(FallbackSource::new(primary, fallback), site);
    Ok(if config.cache {
        CachedSource::with_capacity(chain, config.cache_capacity)
    } else {
        CachedSource::passthrough(chain)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn disabled_source_reports_disabled() {
        let window = AnalysisWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        );
        let err = HttpSource::Disabled
            .fetch_snapshot(GeoPoint::new(0.0, 0.0), window)
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Disabled));
    }

    #[test]
    fn configured_source_follows_config() {
        let config = ProviderConfig {
            primary: ProviderKind::OpenMeteo,
            fallback: ProviderKind::None,
            ..ProviderConfig::default()
        };
        let source = configured_source(&config).unwrap();
        let chain = source.inner().inner();
        assert_eq!(chain.primary().name(), "open-meteo");
        assert_eq!(chain.secondary().name(), "disabled");
        assert!(source.inner().site().is_some());
    }

    #[test]
    fn site_lookup_can_be_disabled() {
        let config = ProviderConfig {
            site_lookup: false,
            ..ProviderConfig::default()
        };
        let source = configured_source(&config).unwrap();
        assert!(source.inner().site().is_none());
    }
}
