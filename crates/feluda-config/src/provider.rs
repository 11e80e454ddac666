//! Environmental data provider selection.

use serde::{Deserialize, Serialize};

/// Which upstream service supplies weather samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenMeteo,
    NasaPower,
    /// No provider; estimation always runs on defaults.
    None,
}

fn default_open_meteo_url() -> String {
    "https://archive-api.open-meteo.com/v1/archive".to_string()
}

fn default_nasa_power_url() -> String {
    "https://power.larc.nasa.gov/api/temporal/daily/point".to_string()
}

fn default_soilgrids_url() -> String {
    "https://rest.isric.org/soilgrids/v2.0/properties/query".to_string()
}

fn default_elevation_url() -> String {
    "https://api.opentopodata.org/v1/eudem25m".to_string()
}

fn default_user_agent() -> String {
    "feluda/0.1".to_string()
}

const fn default_primary() -> ProviderKind {
    ProviderKind::NasaPower
}

const fn default_fallback() -> ProviderKind {
    ProviderKind::OpenMeteo
}

const fn default_cache_capacity() -> usize {
    256
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_primary")]
    pub primary: ProviderKind,

    /// Tried when the primary is unavailable. `none` disables fallback.
    #[serde(default = "default_fallback")]
    pub fallback: ProviderKind,

    #[serde(default = "default_open_meteo_url")]
    pub open_meteo_url: String,

    #[serde(default = "default_nasa_power_url")]
    pub nasa_power_url: String,

    /// Look up soil pH, clay and slope for fetched snapshots.
    #[serde(default = "default_true")]
    pub site_lookup: bool,

    #[serde(default = "default_soilgrids_url")]
    pub soilgrids_url: String,

    #[serde(default = "default_elevation_url")]
    pub elevation_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cache snapshots per (location, window) for the process lifetime.
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Most snapshots the cache holds before evicting the oldest.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            fallback: default_fallback(),
            open_meteo_url: default_open_meteo_url(),
            nasa_power_url: default_nasa_power_url(),
            site_lookup: default_true(),
            soilgrids_url: default_soilgrids_url(),
            elevation_url: default_elevation_url(),
            user_agent: default_user_agent(),
            cache: default_true(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl ProviderConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.primary != ProviderKind::None
    }
}
