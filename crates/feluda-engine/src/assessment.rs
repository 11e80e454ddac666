//! The pure evaluation step: one application's inputs in, a complete
//! [`AuditRecord`] out.
//!
//! Both the orchestrator and verification go through [`evaluate`], so a
//! record's inputs always reproduce its outputs.

use chrono::{DateTime, Utc};
use feluda_core::entities::{
    AnalysisWindow, AuditRecord, AuditedApplication, AuditedFarm, AuditedOutputs,
    ConfidencePenalty, EffectiveInputs, EnvironmentalSnapshot,
};
use feluda_core::enums::{LocationFlag, PenaltyKind};
use feluda_core::geo::GeoPoint;
use feluda_core::params::ModelParameters;

use crate::error::{EngineError, InvalidApplicationError};
use crate::estimator::{self, EstimateInputs};
use crate::geometry::Boundary;
use crate::site;
use crate::uncertainty;

/// Everything needed to evaluate one application.
#[derive(Debug, Clone)]
pub struct EvaluationInputs<'a> {
    pub farm_id: &'a str,
    pub boundary: &'a [GeoPoint],
    pub application: &'a AuditedApplication,
    pub as_of: DateTime<Utc>,
    pub snapshot: EnvironmentalSnapshot,
    pub snapshot_unavailable: bool,
    pub params: &'a ModelParameters,
}

/// Evaluate the model and assemble the audit record.
///
/// The snapshot is trimmed to `[applied_at, as_of]` and sorted before any
/// reduction. The application's location flag is re-derived from the
/// boundary.
///
/// # Errors
///
/// Returns [`EngineError`] for invalid geometry, invalid application inputs
/// (including an `as_of` before `applied_at`) or a computation failure.
pub fn evaluate(inputs: EvaluationInputs<'_>) -> Result<AuditRecord, EngineError> {
    let EvaluationInputs {
        farm_id,
        boundary,
        application,
        as_of,
        snapshot,
        snapshot_unavailable,
        params,
    } = inputs;

    estimator::validate_application(application.basalt_mass_kg, application.particle_size_mm)?;
    if !application.location.is_valid() {
        return Err(InvalidApplicationError::InvalidLocation {
            lat: application.location.lat,
            lon: application.location.lon,
        }
        .into());
    }

    let boundary = Boundary::new(boundary)?;
    let window = AnalysisWindow::new(application.applied_at, as_of);
    let elapsed_days = window.days();
    if elapsed_days < 0.0 {
        return Err(InvalidApplicationError::FutureDated {
            days_ahead: -elapsed_days,
        }
        .into());
    }
    let snapshot = snapshot.within(&window).normalized();

    let estimate = estimator::estimate(
        params,
        &EstimateInputs {
            basalt_mass_kg: application.basalt_mass_kg,
            particle_size_mm: application.particle_size_mm,
            elapsed_days,
            snapshot: &snapshot,
        },
    )?;

    let location_flag = boundary.classify(application.location, params.boundary_tolerance_m);
    let mut penalties = estimate.penalties;
    match location_flag {
        LocationFlag::Inside => {}
        LocationFlag::NearBoundary => penalties.push(ConfidencePenalty::new(
            PenaltyKind::LocationNearBoundary,
            params.penalty_near_boundary,
        )),
        LocationFlag::Outside => penalties.push(ConfidencePenalty::new(
            PenaltyKind::LocationOutsideBoundary,
            params.penalty_outside_boundary,
        )),
    }
    if snapshot_unavailable {
        penalties.push(ConfidencePenalty::new(
            PenaltyKind::SnapshotUnavailable,
            params.penalty_snapshot_unavailable,
        ));
    }
    penalties.sort_by_key(|p| p.kind);

    let bounds = uncertainty::bound_range(
        params,
        estimate.central_co2_t,
        estimate.central_range,
        &penalties,
    )?;
    let site = site::assess(
        params,
        &snapshot.site,
        estimate.factors.annual_rainfall_mm,
        estimate.central_co2_t,
    );

    let factors = estimate.factors;
    Ok(AuditRecord {
        farm: AuditedFarm {
            id: farm_id.to_string(),
            area_ha: boundary.area_ha(),
            boundary: boundary.into_ring(),
        },
        application: AuditedApplication {
            location_flag,
            ..application.clone()
        },
        as_of,
        elapsed_days,
        snapshot,
        snapshot_unavailable,
        effective: EffectiveInputs {
            reactive_surface_factor: factors.reactive_surface_factor,
            mean_temperature_c: factors.mean_temperature_c,
            temperature_defaulted: factors.temperature_defaulted,
            temperature_response: factors.temperature_response,
            annual_rainfall_mm: factors.annual_rainfall_mm,
            mean_ndvi: factors.mean_ndvi,
            moisture_defaulted: factors.moisture_defaulted,
            moisture_response: factors.moisture_response,
            environmental_modifier: factors.environmental_modifier,
            soil_ph: site.soil_ph,
            clay_pct: site.clay_pct,
            slope_pct: site.slope_pct,
            site_defaults: site.site_defaults,
        },
        penalties,
        parameters: params.clone(),
        outputs: AuditedOutputs {
            weathering_fraction: estimate.weathering_fraction,
            central_co2_t: estimate.central_co2_t,
            low_co2_t: bounds.low,
            high_co2_t: bounds.high,
            dic_export_t: site.dic_export_t,
            permanence: site.permanence,
        },
    })
}

/// Re-evaluate a record from its own inputs.
///
/// # Errors
///
/// Same as [`evaluate`].
pub fn reevaluate(record: &AuditRecord) -> Result<AuditRecord, EngineError> {
    evaluate(EvaluationInputs {
        farm_id: &record.farm.id,
        boundary: &record.farm.boundary,
        application: &record.application,
        as_of: record.as_of,
        snapshot: record.snapshot.clone(),
        snapshot_unavailable: record.snapshot_unavailable,
        params: &record.parameters,
    })
}
