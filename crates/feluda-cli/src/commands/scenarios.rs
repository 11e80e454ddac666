use feluda_config::FeludaConfig;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ScenarioRow<'a> {
    name: &'a str,
    particle_size_mm: f64,
    mass_per_ha_kg: f64,
    description: &'a str,
}

/// Handle `feluda scenarios`.
pub fn handle(config: &FeludaConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let rows = config
        .scenarios
        .iter()
        .map(|(name, preset)| ScenarioRow {
            name,
            particle_size_mm: preset.particle_size_mm,
            mass_per_ha_kg: preset.mass_per_ha_kg,
            description: &preset.description,
        })
        .collect::<Vec<_>>();
    output(&rows, flags.format)
}
