//! Confidence bounds around the central estimate.

use feluda_core::entities::ConfidencePenalty;
use feluda_core::params::ModelParameters;

use crate::error::ComputationError;
use crate::estimator::CentralRange;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

/// `W = Π (1 + weight)`; 1.0 with no penalties.
///
/// # Errors
///
/// Returns [`ComputationError`] for a negative or non-finite weight.
pub fn widening_factor(penalties: &[ConfidencePenalty]) -> Result<f64, ComputationError> {
    penalties.iter().try_fold(1.0, |w, p| {
        if p.weight.is_finite() && p.weight >= 0.0 {
            Ok(w * (1.0 + p.weight))
        } else {
            Err(ComputationError::new(format!(
                "penalty {} has invalid weight {}",
                p.kind, p.weight
            )))
        }
    })
}

/// Asymmetric band around `central`, widened by the penalties.
///
/// # Errors
///
/// Returns [`ComputationError`] if `central` is negative or non-finite, or
/// the resulting bounds break `0 ≤ low ≤ central ≤ high`.
pub fn bound(
    params: &ModelParameters,
    central: f64,
    penalties: &[ConfidencePenalty],
) -> Result<Bounds, ComputationError> {
    bound_range(params, central, CentralRange::point(central), penalties)
}

/// Like [`bound`], but the band is anchored on the range of central values
/// that defaulted signals leave open: the low band applies to
/// `range.min_co2_t` and the high band to `range.max_co2_t`.
///
/// # Errors
///
/// Returns [`ComputationError`] if `central` or the range is negative or
/// non-finite, the range does not contain `central`, or the resulting
/// bounds break `0 ≤ low ≤ central ≤ high`.
pub fn bound_range(
    params: &ModelParameters,
    central: f64,
    range: CentralRange,
    penalties: &[ConfidencePenalty],
) -> Result<Bounds, ComputationError> {
    if !central.is_finite() || central < 0.0 {
        return Err(ComputationError::new(format!(
            "central estimate out of range: {central}"
        )));
    }
    let CentralRange {
        min_co2_t,
        max_co2_t,
    } = range;
    if !(min_co2_t.is_finite() && max_co2_t.is_finite() && 0.0 <= min_co2_t)
        || !(min_co2_t <= central && central <= max_co2_t)
    {
        return Err(ComputationError::new(format!(
            "central range [{min_co2_t}, {max_co2_t}] does not contain {central}"
        )));
    }
    let w = widening_factor(penalties)?;
    let low = min_co2_t * params.low_band.mul_add(-w, 1.0).max(0.0);
    let high = max_co2_t * params.high_band.mul_add(w, 1.0);

    if !(low.is_finite() && high.is_finite() && 0.0 <= low && low <= central && central <= high) {
        return Err(ComputationError::new(format!(
            "bounds violate ordering: {low} ≤ {central} ≤ {high}"
        )));
    }
    Ok(Bounds { low, high })
}
