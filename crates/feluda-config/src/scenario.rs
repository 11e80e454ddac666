//! Named application presets.
//!
//! A preset maps a scenario name (as offered by the field UI) to the particle
//! size and per-hectare dose used when submitting an application.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScenarioPreset {
    pub particle_size_mm: f64,
    pub mass_per_ha_kg: f64,
    #[serde(default)]
    pub description: String,
}

impl ScenarioPreset {
    /// Total basalt mass for a parcel of `area_ha`.
    #[must_use]
    pub fn mass_for_area(&self, area_ha: f64) -> f64 {
        self.mass_per_ha_kg * area_ha
    }
}

/// Built-in presets, overridable per name from TOML.
#[must_use]
pub fn default_scenarios() -> BTreeMap<String, ScenarioPreset> {
    let mut presets = BTreeMap::new();
    presets.insert(
        "fine".to_string(),
        ScenarioPreset {
            particle_size_mm: 0.1,
            mass_per_ha_kg: 20_000.0,
            description: "Finely milled basalt, high dose".to_string(),
        },
    );
    presets.insert(
        "standard".to_string(),
        ScenarioPreset {
            particle_size_mm: 0.25,
            mass_per_ha_kg: 10_000.0,
            description: "Quarry fines at a typical field dose".to_string(),
        },
    );
    presets.insert(
        "coarse".to_string(),
        ScenarioPreset {
            particle_size_mm: 1.0,
            mass_per_ha_kg: 5_000.0,
            description: "Coarse crusher dust, low dose".to_string(),
        },
    );
    presets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_present() {
        let presets = default_scenarios();
        assert_eq!(presets.len(), 3);
        assert!((presets["standard"].particle_size_mm - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn mass_scales_with_area() {
        let preset = &default_scenarios()["standard"];
        assert!((preset.mass_for_area(2.5) - 25_000.0).abs() < 1e-9);
    }
}
