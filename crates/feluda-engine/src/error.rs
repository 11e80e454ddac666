//! Engine error types.

use feluda_config::ConfigError;
use feluda_core::errors::CoreError;
use thiserror::Error;

/// A farm boundary that cannot be measured.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A vertex is non-finite or outside WGS84 bounds.
    #[error("vertex {index} is not a valid coordinate ({lat}, {lon})")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },

    /// Fewer than three distinct vertices.
    #[error("boundary needs at least 3 distinct vertices, got {distinct}")]
    TooFewVertices { distinct: usize },

    /// Two non-adjacent edges cross, touch, or an edge doubles back.
    #[error("boundary edges {first_edge} and {second_edge} intersect")]
    SelfIntersecting {
        first_edge: usize,
        second_edge: usize,
    },

    /// Vertices are collinear or enclose a negligible area.
    #[error("boundary encloses no measurable area")]
    Degenerate,
}

/// Application inputs that cannot be estimated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidApplicationError {
    #[error("basalt mass must be a positive number of kg, got {value}")]
    NonPositiveMass { value: f64 },

    #[error("particle size must be a positive number of mm, got {value}")]
    NonPositiveParticleSize { value: f64 },

    #[error("application location ({lat}, {lon}) is not a valid coordinate")]
    InvalidLocation { lat: f64, lon: f64 },

    /// The application date lies after the evaluation time.
    #[error("application is dated {days_ahead:.3} days after the evaluation time")]
    FutureDated { days_ahead: f64 },
}

/// A numeric invariant was violated while computing an estimate.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("computation failed: {0}")]
pub struct ComputationError(pub String);

impl ComputationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An audit record failed verification against the expected digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audit hash mismatch: expected {expected}, got {actual}")]
pub struct AuditMismatchError {
    pub expected: String,
    /// The first digest that disagreed, `unreproducible: <reason>` when the
    /// inputs no longer evaluate, or `inconsistent: <reason>` when only the
    /// result's summary fields were altered.
    pub actual: String,
}

/// Everything the engine and service can fail with.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    InvalidApplication(#[from] InvalidApplicationError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error(transparent)]
    AuditMismatch(#[from] AuditMismatchError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
