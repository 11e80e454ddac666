//! Stage, flag and classification enums for Feluda.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! [`EstimationStage`] provides `allowed_next_states()` to enforce valid
//! transitions in the orchestrator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EstimationStage
// ---------------------------------------------------------------------------

/// Stage of one application's estimation run.
///
/// ```text
/// submitted → data_assembled → estimated → audited
///     ↘             ↘              ↘
///                  failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EstimationStage {
    Submitted,
    DataAssembled,
    Estimated,
    Audited,
    Failed,
}

impl EstimationStage {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Submitted => &[Self::DataAssembled, Self::Failed],
            Self::DataAssembled => &[Self::Estimated, Self::Failed],
            Self::Estimated => &[Self::Audited, Self::Failed],
            Self::Audited | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Audited | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::DataAssembled => "data_assembled",
            Self::Estimated => "estimated",
            Self::Audited => "audited",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EstimationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LocationFlag
// ---------------------------------------------------------------------------

/// Where an application's recorded location sits relative to its farm boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LocationFlag {
    Inside,
    /// Outside the ring but within the boundary tolerance.
    NearBoundary,
    Outside,
}

impl LocationFlag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::NearBoundary => "near_boundary",
            Self::Outside => "outside",
        }
    }
}

impl fmt::Display for LocationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PenaltyKind
// ---------------------------------------------------------------------------

/// Reason an estimate's confidence was reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    /// No temperature value anywhere in the window; baseline substituted.
    MissingTemperature,
    /// Some samples lack temperature.
    PartialTemperature,
    /// Neither precipitation nor vegetation index available; default substituted.
    MissingMoisture,
    /// Some samples lack both precipitation and vegetation index.
    PartialMoisture,
    /// The environmental provider failed after retries.
    SnapshotUnavailable,
    LocationNearBoundary,
    LocationOutsideBoundary,
}

impl PenaltyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingTemperature => "missing_temperature",
            Self::PartialTemperature => "partial_temperature",
            Self::MissingMoisture => "missing_moisture",
            Self::PartialMoisture => "partial_moisture",
            Self::SnapshotUnavailable => "snapshot_unavailable",
            Self::LocationNearBoundary => "location_near_boundary",
            Self::LocationOutsideBoundary => "location_outside_boundary",
        }
    }
}

impl fmt::Display for PenaltyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Permanence
// ---------------------------------------------------------------------------

/// Qualitative permanence of the captured carbon given site slope and clay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permanence {
    High,
    Medium,
    Low,
}

impl Permanence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Permanence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_happy_path_transitions() {
        use EstimationStage::*;
        assert!(Submitted.can_transition_to(DataAssembled));
        assert!(DataAssembled.can_transition_to(Estimated));
        assert!(Estimated.can_transition_to(Audited));
        assert!(!Submitted.can_transition_to(Estimated));
        assert!(!Estimated.can_transition_to(DataAssembled));
    }

    #[test]
    fn failed_reachable_from_every_non_terminal_stage() {
        use EstimationStage::*;
        for stage in [Submitted, DataAssembled, Estimated] {
            assert!(stage.can_transition_to(Failed), "{stage} -> failed");
        }
        assert!(!Audited.can_transition_to(Failed));
        assert!(Failed.allowed_next_states().is_empty());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&EstimationStage::DataAssembled).unwrap();
        assert_eq!(json, "\"data_assembled\"");
        let json = serde_json::to_string(&PenaltyKind::LocationOutsideBoundary).unwrap();
        assert_eq!(json, "\"location_outside_boundary\"");
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(LocationFlag::NearBoundary.to_string(), "near_boundary");
        assert_eq!(Permanence::Medium.to_string(), "medium");
    }
}
