use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::AuditRecord;
use crate::enums::{PenaltyKind, Permanence};

/// A single reduction in confidence, consumed by the uncertainty model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConfidencePenalty {
    pub kind: PenaltyKind,
    /// Relative widening contributed by this penalty (`W *= 1 + weight`).
    pub weight: f64,
}

impl ConfidencePenalty {
    #[must_use]
    pub const fn new(kind: PenaltyKind, weight: f64) -> Self {
        Self { kind, weight }
    }
}

/// Outcome of one estimation run for an application.
///
/// Results are append-only: a re-run produces a new result and the previous
/// one is superseded, never edited. Everything except `id` and `computed_at`
/// is reproducible from `audit_record`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EstimationResult {
    pub id: String,
    pub application_id: String,
    pub weathering_fraction: f64,
    pub central_co2_t: f64,
    pub low_co2_t: f64,
    pub high_co2_t: f64,
    pub central_co2_t_per_ha: f64,
    pub dic_export_t: f64,
    pub permanence: Permanence,
    pub penalties: Vec<ConfidencePenalty>,
    pub audit_hash: String,
    pub model_version: String,
    pub computed_at: DateTime<Utc>,
    pub audit_record: AuditRecord,
}
