//! Versioned parameters of the weathering and uncertainty model.
//!
//! Every constant that influences an estimate lives here and is hashed into
//! the audit record. Any change to a value must ship under a new `version` tag.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MODEL_VERSION_V1: &str = "erw-saturating-v1";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ModelParameters {
    /// Model version tag carried on every result.
    pub version: String,

    // -- Weathering kinetics ------------------------------------------------
    /// Empirical first-order rate constant `k` (per day).
    pub rate_constant_per_day: f64,
    /// kg CO₂ sequestered per kg of fully weathered basalt (CaO + MgO driven).
    pub stoichiometric_factor: f64,
    /// Particle size at which the reactive-surface factor is 1.0.
    pub reference_particle_mm: f64,
    /// Sizes below this are treated as this size.
    pub min_particle_mm: f64,

    // -- Temperature response -----------------------------------------------
    /// Substituted when no temperature is available in the window.
    pub baseline_temperature_c: f64,
    pub temperature_offset_c: f64,
    pub temperature_span_c: f64,
    pub temperature_response_cap: f64,

    // -- Moisture response --------------------------------------------------
    pub reference_annual_rainfall_mm: f64,
    pub rainfall_response_cap: f64,
    pub reference_ndvi: f64,
    pub ndvi_response_cap: f64,
    /// Substituted when neither precipitation nor NDVI is available.
    pub default_moisture_response: f64,

    // -- Uncertainty --------------------------------------------------------
    /// Relative distance of the low bound below the central estimate.
    pub low_band: f64,
    /// Relative distance of the high bound above the central estimate.
    pub high_band: f64,
    /// Weight of a fully missing signal; partial coverage scales it.
    pub penalty_missing_signal: f64,
    pub penalty_snapshot_unavailable: f64,
    pub penalty_near_boundary: f64,
    pub penalty_outside_boundary: f64,
    /// Distance outside the ring still considered "near" the boundary.
    pub boundary_tolerance_m: f64,

    // -- Site context defaults (DIC export, permanence) ---------------------
    pub default_slope_pct: f64,
    pub default_clay_pct: f64,
    pub default_soil_ph: f64,
    pub runoff_reference_rainfall_mm: f64,
    pub runoff_reference_slope_pct: f64,
    /// Share of produced DIC exported per unit runoff index.
    pub dic_export_per_runoff: f64,
    pub dic_export_min: f64,
    pub dic_export_max: f64,
    pub permanence_high_max_slope_pct: f64,
    pub permanence_high_max_clay_pct: f64,
    pub permanence_medium_max_slope_pct: f64,
}

impl ModelParameters {
    /// The `erw-saturating-v1` parameter set.
    #[must_use]
    pub fn v1() -> Self {
        Self {
            version: MODEL_VERSION_V1.to_string(),
            rate_constant_per_day: 3.0e-4,
            stoichiometric_factor: 0.33,
            reference_particle_mm: 1.0,
            min_particle_mm: 0.05,
            baseline_temperature_c: 22.0,
            temperature_offset_c: 5.0,
            temperature_span_c: 30.0,
            temperature_response_cap: 1.4,
            reference_annual_rainfall_mm: 1500.0,
            rainfall_response_cap: 1.5,
            reference_ndvi: 0.6,
            ndvi_response_cap: 1.5,
            default_moisture_response: 1.0,
            low_band: 0.20,
            high_band: 0.15,
            penalty_missing_signal: 0.5,
            penalty_snapshot_unavailable: 0.25,
            penalty_near_boundary: 0.1,
            penalty_outside_boundary: 0.5,
            boundary_tolerance_m: 100.0,
            default_slope_pct: 5.0,
            default_clay_pct: 18.0,
            default_soil_ph: 6.8,
            runoff_reference_rainfall_mm: 2000.0,
            runoff_reference_slope_pct: 10.0,
            dic_export_per_runoff: 0.25,
            dic_export_min: 0.05,
            dic_export_max: 0.4,
            permanence_high_max_slope_pct: 3.0,
            permanence_high_max_clay_pct: 20.0,
            permanence_medium_max_slope_pct: 10.0,
        }
    }

    /// Look up a published parameter set by its version tag.
    #[must_use]
    pub fn for_version(version: &str) -> Option<Self> {
        match version {
            MODEL_VERSION_V1 => Some(Self::v1()),
            _ => None,
        }
    }
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self::v1()
    }
}
