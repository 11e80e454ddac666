//! # feluda-config
//!
//! Layered configuration loading for Feluda using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`FELUDA_*` prefix, `__` as separator)
//! 2. Project-level `.feluda/config.toml`
//! 3. User-level `~/.config/feluda/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `FELUDA_FETCH__TIMEOUT_SECS` -> `fetch.timeout_secs`,
//! `FELUDA_PROVIDER__PRIMARY` -> `provider.primary`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use feluda_config::FeludaConfig;
//!
//! let config = FeludaConfig::load_with_dotenv().expect("config");
//! println!("fetch timeout: {}s", config.fetch.timeout_secs);
//! ```

mod error;
mod fetch;
mod general;
mod provider;
mod scenario;

pub use error::ConfigError;
pub use fetch::FetchConfig;
pub use general::GeneralConfig;
pub use provider::{ProviderConfig, ProviderKind};
pub use scenario::{ScenarioPreset, default_scenarios};

use std::collections::BTreeMap;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeludaConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default = "default_scenarios")]
    pub scenarios: BTreeMap<String, ScenarioPreset>,
}

impl Default for FeludaConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            provider: ProviderConfig::default(),
            general: GeneralConfig::default(),
            scenarios: default_scenarios(),
        }
    }
}

impl FeludaConfig {
    /// Load configuration from all sources (TOML files + environment variables)
    /// and validate it.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Extract and validate from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of range.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".feluda/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("FELUDA_").split("__"))
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(invalid("fetch.timeout_secs", "must be at least 1 second"));
        }
        if self.provider.cache && self.provider.cache_capacity == 0 {
            return Err(invalid("provider.cache_capacity", "must be at least 1 when caching"));
        }
        if self.general.model_version.trim().is_empty() {
            return Err(invalid("general.model_version", "must not be empty"));
        }
        for (name, preset) in &self.scenarios {
            if !(preset.particle_size_mm.is_finite() && preset.particle_size_mm > 0.0) {
                return Err(invalid(
                    &format!("scenarios.{name}.particle_size_mm"),
                    "must be a positive number",
                ));
            }
            if !(preset.mass_per_ha_kg.is_finite() && preset.mass_per_ha_kg > 0.0) {
                return Err(invalid(
                    &format!("scenarios.{name}.mass_per_ha_kg"),
                    "must be a positive number",
                ));
            }
        }
        Ok(())
    }

    /// Look up a scenario preset by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownScenario`] if no preset has that name.
    pub fn scenario(&self, name: &str) -> Result<&ScenarioPreset, ConfigError> {
        self.scenarios
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScenario(name.to_string()))
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("feluda").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) or current dir looking
    /// for a `.env` file. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
