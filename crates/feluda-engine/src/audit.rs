//! Audit digests and verification.
//!
//! The digest is SHA-256 over a domain tag followed by the canonical JSON of
//! the [`AuditRecord`]. It binds every input the model saw, every parameter,
//! and the outputs. Result ids and `computed_at` are not part of the record.

use feluda_core::entities::{AuditRecord, EstimationResult};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::assessment;
use crate::canonical::{FLOAT_DECIMALS, format_float, to_canonical_string};
use crate::error::{AuditMismatchError, ComputationError};

/// Domain separation tag prepended to the canonical bytes.
pub const AUDIT_DOMAIN: &[u8] = b"feluda.audit.v1\n";

/// Lowercase hex SHA-256 of the record's canonical form.
///
/// # Errors
///
/// Returns [`ComputationError`] if the record cannot be canonicalized.
pub fn digest(record: &AuditRecord) -> Result<String, ComputationError> {
    let canonical = to_canonical_string(record)?;
    let mut hasher = Sha256::new();
    hasher.update(AUDIT_DOMAIN);
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of re-deriving a record's digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub matches: bool,
    pub expected: String,
    /// Digest of the record exactly as supplied, outputs included.
    pub stored: String,
    /// Digest after re-running the model on the record's inputs. `None` when
    /// the inputs no longer evaluate.
    pub recomputed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verification {
    fn reject(&mut self, reason: &str) {
        self.matches = false;
        self.reason = Some(match self.reason.take() {
            Some(earlier) => format!("{earlier}; {reason}"),
            None => reason.to_string(),
        });
    }

    /// # Errors
    ///
    /// Returns [`AuditMismatchError`] unless the verification matched.
    pub fn into_result(self) -> Result<(), AuditMismatchError> {
        if self.matches {
            return Ok(());
        }
        let reason = self.reason.unwrap_or_default();
        let actual = match self.recomputed {
            None => format!("unreproducible: {reason}"),
            Some(hash) if hash != self.expected => hash,
            Some(_) if self.stored != self.expected => self.stored,
            Some(_) => format!("inconsistent: {reason}"),
        };
        Err(AuditMismatchError {
            expected: self.expected,
            actual,
        })
    }
}

/// Check a record against `expected_hash`.
///
/// The record matches only if its own digest, the digest of its
/// re-evaluation and `expected_hash` all agree, so neither altered inputs
/// nor altered outputs pass. The comparison ignores ASCII case and
/// surrounding whitespace in `expected_hash`. Inputs that no longer evaluate
/// produce a non-matching verification carrying the reason.
///
/// # Errors
///
/// Returns [`ComputationError`] only if canonicalization itself fails.
pub fn verify(record: &AuditRecord, expected_hash: &str) -> Result<Verification, ComputationError> {
    let expected = expected_hash.trim().to_ascii_lowercase();
    let stored = digest(record)?;
    let mut verification = Verification {
        matches: true,
        expected,
        stored,
        recomputed: None,
        reason: None,
    };

    match assessment::reevaluate(record) {
        Ok(rebuilt) => verification.recomputed = Some(digest(&rebuilt)?),
        Err(err) => {
            tracing::warn!(error = %err, "audit record inputs no longer evaluate");
            verification.reject(&err.to_string());
            return Ok(verification);
        }
    }

    if verification.recomputed.as_deref() != Some(verification.stored.as_str()) {
        verification.reject("stored outputs differ from recomputed");
    }
    if verification.recomputed.as_deref() != Some(verification.expected.as_str()) {
        verification.reject("hash does not match the recomputed digest");
    }
    if !verification.matches {
        tracing::warn!(
            expected = %verification.expected,
            stored = %verification.stored,
            reason = verification.reason.as_deref().unwrap_or_default(),
            "audit verification failed"
        );
    }
    Ok(verification)
}

/// [`verify`] an exported result, also requiring its summary fields to
/// agree with the audit record they were copied from.
///
/// # Errors
///
/// Returns [`ComputationError`] only if canonicalization itself fails.
pub fn verify_result(
    result: &EstimationResult,
    expected_hash: &str,
) -> Result<Verification, ComputationError> {
    let mut verification = verify(&result.audit_record, expected_hash)?;
    let differing = summary_differences(result);
    if !differing.is_empty() {
        verification.reject(&format!(
            "result fields differ from audit record: {}",
            differing.join(", ")
        ));
    }
    Ok(verification)
}

fn summary_differences(result: &EstimationResult) -> Vec<&'static str> {
    let record = &result.audit_record;
    let outputs = &record.outputs;
    let same = |a: f64, b: f64| format_float(a, FLOAT_DECIMALS) == format_float(b, FLOAT_DECIMALS);

    let mut differing = Vec::new();
    if !same(result.weathering_fraction, outputs.weathering_fraction) {
        differing.push("weathering_fraction");
    }
    if !same(result.central_co2_t, outputs.central_co2_t) {
        differing.push("central_co2_t");
    }
    if !same(result.low_co2_t, outputs.low_co2_t) {
        differing.push("low_co2_t");
    }
    if !same(result.high_co2_t, outputs.high_co2_t) {
        differing.push("high_co2_t");
    }
    if record.farm.area_ha > 0.0
        && !same(result.central_co2_t_per_ha, outputs.central_co2_t / record.farm.area_ha)
    {
        differing.push("central_co2_t_per_ha");
    }
    if !same(result.dic_export_t, outputs.dic_export_t) {
        differing.push("dic_export_t");
    }
    if result.permanence != outputs.permanence {
        differing.push("permanence");
    }
    if result.penalties != record.penalties {
        differing.push("penalties");
    }
    if result.model_version != record.parameters.version {
        differing.push("model_version");
    }
    if result.application_id != record.application.id {
        differing.push("application_id");
    }
    differing
}
