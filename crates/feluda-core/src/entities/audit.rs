use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{ApplicationRecord, ConfidencePenalty, EnvironmentalSnapshot, Farm};
use crate::enums::{LocationFlag, Permanence};
use crate::geo::GeoPoint;
use crate::params::ModelParameters;

/// The complete input set behind one estimate, plus the outputs it produced.
///
/// This is what gets canonicalized and hashed. It deliberately excludes
/// `computed_at`, result IDs and record creation times.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditRecord {
    pub farm: AuditedFarm,
    pub application: AuditedApplication,
    /// End of the analysis window; elapsed time is measured up to here.
    pub as_of: DateTime<Utc>,
    pub elapsed_days: f64,
    /// The snapshot actually used, samples sorted by timestamp.
    pub snapshot: EnvironmentalSnapshot,
    /// Whether the provider failed and the snapshot was substituted.
    pub snapshot_unavailable: bool,
    pub effective: EffectiveInputs,
    pub penalties: Vec<ConfidencePenalty>,
    pub parameters: ModelParameters,
    pub outputs: AuditedOutputs,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditedFarm {
    pub id: String,
    pub boundary: Vec<GeoPoint>,
    pub area_ha: f64,
}

impl From<&Farm> for AuditedFarm {
    fn from(farm: &Farm) -> Self {
        Self {
            id: farm.id.clone(),
            boundary: farm.boundary.clone(),
            area_ha: farm.area_ha,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditedApplication {
    pub id: String,
    pub farm_id: String,
    pub applied_at: DateTime<Utc>,
    pub basalt_mass_kg: f64,
    pub particle_size_mm: f64,
    pub location: GeoPoint,
    pub location_flag: LocationFlag,
    pub photo_ref: Option<String>,
}

impl From<&ApplicationRecord> for AuditedApplication {
    fn from(app: &ApplicationRecord) -> Self {
        Self {
            id: app.id.clone(),
            farm_id: app.farm_id.clone(),
            applied_at: app.applied_at,
            basalt_mass_kg: app.basalt_mass_kg,
            particle_size_mm: app.particle_size_mm,
            location: app.location,
            location_flag: app.location_flag,
            photo_ref: app.photo_ref.clone(),
        }
    }
}

/// Values the model actually consumed after reductions and substitutions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EffectiveInputs {
    pub reactive_surface_factor: f64,
    pub mean_temperature_c: f64,
    pub temperature_defaulted: bool,
    pub temperature_response: f64,
    pub annual_rainfall_mm: Option<f64>,
    pub mean_ndvi: Option<f64>,
    pub moisture_defaulted: bool,
    pub moisture_response: f64,
    pub environmental_modifier: f64,
    pub soil_ph: f64,
    pub clay_pct: f64,
    pub slope_pct: f64,
    /// Names of site fields that fell back to model defaults.
    pub site_defaults: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditedOutputs {
    pub weathering_fraction: f64,
    pub central_co2_t: f64,
    pub low_co2_t: f64,
    pub high_co2_t: f64,
    pub dic_export_t: f64,
    pub permanence: Permanence,
}
