use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// A registered farm parcel. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Farm {
    pub id: String,
    pub name: String,
    /// Closed ring: the first vertex is repeated as the last.
    pub boundary: Vec<GeoPoint>,
    pub area_ha: f64,
    pub created_at: DateTime<Utc>,
}
