//! Site-context outputs: dissolved inorganic carbon export and permanence.

use feluda_core::entities::SiteContext;
use feluda_core::enums::Permanence;
use feluda_core::params::ModelParameters;

#[derive(Debug, Clone, PartialEq)]
pub struct SiteAssessment {
    pub soil_ph: f64,
    pub clay_pct: f64,
    pub slope_pct: f64,
    /// Fields that fell back to model defaults, in field order.
    pub site_defaults: Vec<String>,
    pub runoff_index: f64,
    pub dic_export_t: f64,
    pub permanence: Permanence,
}

/// Resolve site defaults and derive DIC export and permanence.
///
/// `annual_rainfall_mm` is the rainfall reduced from the snapshot, if any;
/// the reference rainfall is used otherwise.
#[must_use]
pub fn assess(
    params: &ModelParameters,
    site: &SiteContext,
    annual_rainfall_mm: Option<f64>,
    central_co2_t: f64,
) -> SiteAssessment {
    let mut site_defaults = Vec::new();
    let mut resolve = |name: &str, value: Option<f64>, default: f64| match value {
        Some(v) if v.is_finite() => v,
        _ => {
            site_defaults.push(name.to_string());
            default
        }
    };
    let soil_ph = resolve("soil_ph", site.soil_ph, params.default_soil_ph);
    let clay_pct = resolve("clay_pct", site.clay_pct, params.default_clay_pct);
    let slope_pct = resolve("slope_pct", site.slope_pct, params.default_slope_pct);

    let rain = annual_rainfall_mm.unwrap_or(params.reference_annual_rainfall_mm);
    let runoff_index = ((rain / params.runoff_reference_rainfall_mm)
        * (slope_pct / params.runoff_reference_slope_pct))
        .clamp(0.0, 1.0);
    let export_share = (runoff_index * params.dic_export_per_runoff)
        .clamp(params.dic_export_min, params.dic_export_max);

    SiteAssessment {
        soil_ph,
        clay_pct,
        slope_pct,
        site_defaults,
        runoff_index,
        dic_export_t: central_co2_t * export_share,
        permanence: permanence(params, slope_pct, clay_pct),
    }
}

#[must_use]
pub fn permanence(params: &ModelParameters, slope_pct: f64, clay_pct: f64) -> Permanence {
    if slope_pct < params.permanence_high_max_slope_pct
        && clay_pct < params.permanence_high_max_clay_pct
    {
        Permanence::High
    } else if slope_pct < params.permanence_medium_max_slope_pct {
        Permanence::Medium
    } else {
        Permanence::Low
    }
}
