//! JSON input files accepted by the CLI.

use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use feluda_core::entities::EnvironmentalSnapshot;
use feluda_core::geo::GeoPoint;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// A boundary file: either a bare ring or `{"boundary": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BoundaryFile {
    Ring(Vec<GeoPoint>),
    Wrapped { boundary: Vec<GeoPoint> },
}

impl BoundaryFile {
    pub fn into_ring(self) -> Vec<GeoPoint> {
        match self {
            Self::Ring(ring) | Self::Wrapped { boundary: ring } => ring,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub farm: FarmSpec,
    pub application: ApplicationSpec,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snapshot: Option<EnvironmentalSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct FarmSpec {
    pub name: String,
    pub boundary: Vec<GeoPoint>,
}

/// Either explicit mass and particle size, or a named scenario.
#[derive(Debug, Deserialize)]
pub struct ApplicationSpec {
    pub applied_at: DateTime<Utc>,
    pub location: GeoPoint,
    #[serde(default)]
    pub basalt_mass_kg: Option<f64>,
    #[serde(default)]
    pub particle_size_mm: Option<f64>,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub photo_ref: Option<String>,
}

/// How an application's dose is specified.
#[derive(Debug, PartialEq)]
pub enum Dose<'a> {
    Explicit {
        basalt_mass_kg: f64,
        particle_size_mm: f64,
    },
    Scenario(&'a str),
}

impl ApplicationSpec {
    pub fn dose(&self) -> anyhow::Result<Dose<'_>> {
        match (&self.scenario, self.basalt_mass_kg, self.particle_size_mm) {
            (Some(name), None, None) => Ok(Dose::Scenario(name)),
            (None, Some(basalt_mass_kg), Some(particle_size_mm)) => Ok(Dose::Explicit {
                basalt_mass_kg,
                particle_size_mm,
            }),
            (Some(_), _, _) => {
                bail!("application: 'scenario' cannot be combined with mass or particle size")
            }
            (None, _, _) => bail!(
                "application: give both 'basalt_mass_kg' and 'particle_size_mm', or a 'scenario'"
            ),
        }
    }
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
