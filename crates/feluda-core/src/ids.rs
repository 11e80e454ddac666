//! ID prefix constants and generation.
//!
//! Every entity ID is `{prefix}-{8 lowercase hex chars}`, e.g. `frm-a3f8b2c1`.

use crate::errors::CoreError;

pub const PREFIX_FARM: &str = "frm";
pub const PREFIX_APPLICATION: &str = "app";
pub const PREFIX_ESTIMATION: &str = "est";

pub const ALL_PREFIXES: &[&str] = &[PREFIX_FARM, PREFIX_APPLICATION, PREFIX_ESTIMATION];

/// Generate a new random ID with the given prefix.
///
/// # Errors
///
/// Returns [`CoreError::IdGeneration`] if the OS random source is unavailable.
pub fn generate_id(prefix: &str) -> Result<String, CoreError> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes).map_err(|e| CoreError::IdGeneration(e.to_string()))?;
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{prefix}-{suffix}"))
}

/// Check that `id` has the `{prefix}-{8 hex}` shape.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
