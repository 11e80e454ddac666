//! Entity structs for all Feluda domain objects.
//!
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` so the
//! surrounding API layer can exchange and validate them as JSON.

mod application;
mod audit;
mod estimation;
mod farm;
mod snapshot;

pub use application::ApplicationRecord;
pub use audit::{AuditRecord, AuditedApplication, AuditedFarm, AuditedOutputs, EffectiveInputs};
pub use estimation::{ConfidencePenalty, EstimationResult};
pub use farm::Farm;
pub use snapshot::{AnalysisWindow, EnvSample, EnvironmentalSnapshot, SiteContext};
