//! Saturating first-order weathering model.
//!
//! `wf = 1 − exp(−k · days · surface · env)` where `surface` scales with
//! inverse square-root particle size and `env` is the product of the
//! temperature and moisture responses reduced from the snapshot. Missing
//! signals fall back to model defaults and emit confidence penalties instead
//! of failing. A defaulted signal also spans its whole response range in
//! [`WeatheringEstimate::central_range`], which the uncertainty model bounds.

use feluda_core::entities::{ConfidencePenalty, EnvSample, EnvironmentalSnapshot};
use feluda_core::enums::PenaltyKind;
use feluda_core::params::ModelParameters;

use crate::error::{ComputationError, EngineError, InvalidApplicationError};

const DAYS_PER_YEAR: f64 = 365.0;
const KG_PER_TONNE: f64 = 1000.0;

/// Application-level inputs to one estimate.
#[derive(Debug, Clone, Copy)]
pub struct EstimateInputs<'a> {
    pub basalt_mass_kg: f64,
    pub particle_size_mm: f64,
    pub elapsed_days: f64,
    /// Samples must already be restricted to the analysis window.
    pub snapshot: &'a EnvironmentalSnapshot,
}

/// Factors the model consumed after reduction and substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFactors {
    pub reactive_surface_factor: f64,
    pub mean_temperature_c: f64,
    pub temperature_defaulted: bool,
    pub temperature_response: f64,
    pub annual_rainfall_mm: Option<f64>,
    pub mean_ndvi: Option<f64>,
    pub moisture_defaulted: bool,
    pub moisture_response: f64,
    pub environmental_modifier: f64,
}

/// Central CO₂ at the lowest and highest environmental modifier the
/// defaulted signals allow. Collapses to the central value when nothing was
/// defaulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralRange {
    pub min_co2_t: f64,
    pub max_co2_t: f64,
}

impl CentralRange {
    #[must_use]
    pub const fn point(central_co2_t: f64) -> Self {
        Self {
            min_co2_t: central_co2_t,
            max_co2_t: central_co2_t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatheringEstimate {
    pub weathering_fraction: f64,
    pub central_co2_t: f64,
    pub central_range: CentralRange,
    pub factors: ModelFactors,
    pub penalties: Vec<ConfidencePenalty>,
}

/// Reject masses and particle sizes the model cannot use.
///
/// # Errors
///
/// Returns [`InvalidApplicationError`] naming the offending field.
pub fn validate_application(
    basalt_mass_kg: f64,
    particle_size_mm: f64,
) -> Result<(), InvalidApplicationError> {
    if !(basalt_mass_kg.is_finite() && basalt_mass_kg > 0.0) {
        return Err(InvalidApplicationError::NonPositiveMass {
            value: basalt_mass_kg,
        });
    }
    if !(particle_size_mm.is_finite() && particle_size_mm > 0.0) {
        return Err(InvalidApplicationError::NonPositiveParticleSize {
            value: particle_size_mm,
        });
    }
    Ok(())
}

/// Run the weathering model.
///
/// # Errors
///
/// - [`InvalidApplicationError`] for invalid mass, particle size, or a
///   negative elapsed time
/// - [`ComputationError`] if any intermediate is non-finite or out of range
pub fn estimate(
    params: &ModelParameters,
    inputs: &EstimateInputs<'_>,
) -> Result<WeatheringEstimate, EngineError> {
    validate_application(inputs.basalt_mass_kg, inputs.particle_size_mm)?;
    if !inputs.elapsed_days.is_finite() {
        return Err(ComputationError::new("elapsed days is not finite").into());
    }
    if inputs.elapsed_days < 0.0 {
        return Err(InvalidApplicationError::FutureDated {
            days_ahead: -inputs.elapsed_days,
        }
        .into());
    }

    let mut penalties = Vec::new();
    let surface = reactive_surface_factor(params, inputs.particle_size_mm);
    let temperature = temperature(params, &inputs.snapshot.samples, &mut penalties);
    let moisture = moisture(params, &inputs.snapshot.samples, &mut penalties);
    let env = temperature.response * moisture.response;

    let (weathering_fraction, central_co2_t) = evaluate(params, inputs, surface, env)?;
    let central_range = if temperature.defaulted || moisture.defaulted {
        let (_, min_co2_t) = evaluate(
            params,
            inputs,
            surface,
            temperature.range.0 * moisture.range.0,
        )?;
        let (_, max_co2_t) = evaluate(
            params,
            inputs,
            surface,
            temperature.range.1 * moisture.range.1,
        )?;
        CentralRange {
            min_co2_t: min_co2_t.min(central_co2_t),
            max_co2_t: max_co2_t.max(central_co2_t),
        }
    } else {
        CentralRange::point(central_co2_t)
    };

    Ok(WeatheringEstimate {
        weathering_fraction,
        central_co2_t,
        central_range,
        factors: ModelFactors {
            reactive_surface_factor: surface,
            mean_temperature_c: temperature.mean_c,
            temperature_defaulted: temperature.defaulted,
            temperature_response: temperature.response,
            annual_rainfall_mm: moisture.annual_rainfall_mm,
            mean_ndvi: moisture.mean_ndvi,
            moisture_defaulted: moisture.defaulted,
            moisture_response: moisture.response,
            environmental_modifier: env,
        },
        penalties,
    })
}

/// Weathering fraction and central CO₂ for one environmental modifier.
fn evaluate(
    params: &ModelParameters,
    inputs: &EstimateInputs<'_>,
    surface: f64,
    env: f64,
) -> Result<(f64, f64), ComputationError> {
    let exponent = params.rate_constant_per_day * inputs.elapsed_days * surface * env;
    if !exponent.is_finite() || exponent < 0.0 {
        return Err(ComputationError::new(format!(
            "rate exponent out of range: {exponent}"
        )));
    }
    let weathering_fraction = -(-exponent).exp_m1();
    if !(0.0..=1.0).contains(&weathering_fraction) {
        return Err(ComputationError::new(format!(
            "weathering fraction out of range: {weathering_fraction}"
        )));
    }

    let central_co2_t =
        weathering_fraction * inputs.basalt_mass_kg * params.stoichiometric_factor / KG_PER_TONNE;
    if !central_co2_t.is_finite() || central_co2_t < 0.0 {
        return Err(ComputationError::new(format!(
            "central estimate out of range: {central_co2_t}"
        )));
    }
    Ok((weathering_fraction, central_co2_t))
}

/// `sqrt(reference / max(size, min))`: 1.0 at the reference size, growing
/// as particles get finer.
#[must_use]
pub fn reactive_surface_factor(params: &ModelParameters, particle_size_mm: f64) -> f64 {
    (params.reference_particle_mm / particle_size_mm.max(params.min_particle_mm)).sqrt()
}

/// Temperature response `clamp((T + offset) / span, 0, cap)`.
#[must_use]
pub fn temperature_response(params: &ModelParameters, temperature_c: f64) -> f64 {
    ((temperature_c + params.temperature_offset_c) / params.temperature_span_c)
        .clamp(0.0, params.temperature_response_cap)
}

// ── Signal reduction ───────────────────────────────────────────────

struct Summary {
    mean: Option<f64>,
    present: usize,
    total: usize,
}

impl Summary {
    fn of(samples: &[EnvSample], signal: impl Fn(&EnvSample) -> Option<f64>) -> Self {
        let mut sum = 0.0;
        let mut present = 0_usize;
        for value in samples.iter().filter_map(&signal).filter(|v| v.is_finite()) {
            sum += value;
            present += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = (present > 0).then(|| sum / present as f64);
        Self {
            mean,
            present,
            total: samples.len(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn missing_share(present: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (total - present) as f64 / total as f64
    }
}

struct Temperature {
    mean_c: f64,
    defaulted: bool,
    response: f64,
    /// Response interval the true value may occupy.
    range: (f64, f64),
}

fn temperature(
    params: &ModelParameters,
    samples: &[EnvSample],
    penalties: &mut Vec<ConfidencePenalty>,
) -> Temperature {
    let summary = Summary::of(samples, |s| s.temperature_c);
    let (mean_c, defaulted) = match summary.mean {
        Some(mean) => {
            if summary.present < summary.total {
                penalties.push(ConfidencePenalty::new(
                    PenaltyKind::PartialTemperature,
                    params.penalty_missing_signal * missing_share(summary.present, summary.total),
                ));
            }
            (mean, false)
        }
        None => {
            penalties.push(ConfidencePenalty::new(
                PenaltyKind::MissingTemperature,
                params.penalty_missing_signal,
            ));
            (params.baseline_temperature_c, true)
        }
    };
    let response = temperature_response(params, mean_c);
    Temperature {
        mean_c,
        defaulted,
        response,
        range: if defaulted {
            (0.0, params.temperature_response_cap)
        } else {
            (response, response)
        },
    }
}

struct Moisture {
    annual_rainfall_mm: Option<f64>,
    mean_ndvi: Option<f64>,
    defaulted: bool,
    response: f64,
    range: (f64, f64),
}

fn moisture(
    params: &ModelParameters,
    samples: &[EnvSample],
    penalties: &mut Vec<ConfidencePenalty>,
) -> Moisture {
    let rain = Summary::of(samples, |s| s.precipitation_mm.filter(|p| *p >= 0.0));
    let ndvi = Summary::of(samples, |s| s.ndvi);

    let annual_rainfall_mm = rain.mean.map(|daily| daily * DAYS_PER_YEAR);
    let rain_response = annual_rainfall_mm
        .map(|annual| (annual / params.reference_annual_rainfall_mm).min(params.rainfall_response_cap));
    let ndvi_response = ndvi
        .mean
        .map(|v| (v / params.reference_ndvi).clamp(0.0, params.ndvi_response_cap));

    let (response, defaulted) = match (rain_response, ndvi_response) {
        (Some(r), Some(n)) => ((r + n) / 2.0, false),
        (Some(only), None) | (None, Some(only)) => (only, false),
        (None, None) => (params.default_moisture_response, true),
    };

    if defaulted {
        penalties.push(ConfidencePenalty::new(
            PenaltyKind::MissingMoisture,
            params.penalty_missing_signal,
        ));
    } else {
        let covered = samples
            .iter()
            .filter(|s| {
                s.precipitation_mm.is_some_and(|p| p.is_finite() && p >= 0.0)
                    || s.ndvi.is_some_and(f64::is_finite)
            })
            .count();
        if covered < samples.len() {
            penalties.push(ConfidencePenalty::new(
                PenaltyKind::PartialMoisture,
                params.penalty_missing_signal * missing_share(covered, samples.len()),
            ));
        }
    }

    let range = if defaulted {
        (0.0, params.rainfall_response_cap.max(params.ndvi_response_cap))
    } else {
        (response, response)
    };
    Moisture {
        annual_rainfall_mm,
        mean_ndvi: ndvi.mean,
        defaulted,
        response,
        range,
    }
}
