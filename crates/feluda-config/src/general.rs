//! General engine configuration.

use feluda_core::params::MODEL_VERSION_V1;
use serde::{Deserialize, Serialize};

fn default_model_version() -> String {
    MODEL_VERSION_V1.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Model parameter set used for new estimations.
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_version: default_model_version(),
        }
    }
}
