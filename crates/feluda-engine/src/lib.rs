//! # feluda-engine
//!
//! Estimation engine for enhanced rock weathering MRV.
//!
//! - [`geometry`]: boundary validation and planar area
//! - [`estimator`]: saturating first-order weathering model
//! - [`uncertainty`]: penalty-widened confidence bounds
//! - [`site`]: DIC export and permanence from site context
//! - [`audit`]: canonical SHA-256 digests and verification
//! - [`orchestrator`]: the per-application estimation state machine
//! - [`service`]: [`MrvService`], the entry point for callers
//!
//! Everything except the orchestrator's data fetch is synchronous and pure.

pub mod assessment;
pub mod audit;
pub mod canonical;
pub mod clock;
pub mod estimator;
pub mod geometry;
pub mod orchestrator;
pub mod service;
pub mod site;
pub mod store;
pub mod uncertainty;

mod error;

pub use audit::Verification;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{
    AuditMismatchError, ComputationError, EngineError, GeometryError, InvalidApplicationError,
};
pub use orchestrator::{EstimateOptions, Orchestrator, StageTracker};
pub use service::{FarmRegistration, MrvService, SubmitApplication, VerifyTarget};
pub use store::{InMemoryStore, RecordStore};
