//! # feluda-core
//!
//! Core types, ID generation, and error types for the Feluda MRV engine.
//!
//! This crate provides the foundational types shared across all Feluda crates:
//! - Entity structs for farms, basalt applications, environmental snapshots,
//!   estimation results and audit records
//! - Stage and flag enums, including the estimation state machine
//! - Versioned model parameters for the weathering model
//! - ID prefix constants and generation helpers
//! - Geographic point type
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod geo;
pub mod ids;
pub mod params;
