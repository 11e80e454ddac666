use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::LocationFlag;
use crate::geo::GeoPoint;

/// One basalt application on a farm. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ApplicationRecord {
    pub id: String,
    pub farm_id: String,
    pub applied_at: DateTime<Utc>,
    pub basalt_mass_kg: f64,
    pub particle_size_mm: f64,
    pub location: GeoPoint,
    pub location_flag: LocationFlag,
    /// Opaque reference to an uploaded photo. Never interpreted by the engine.
    pub photo_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}
