use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Validate a boundary and measure its area.
    Area(AreaArgs),
    /// Register a farm and application from a request file and estimate CO₂ removal.
    Estimate(EstimateArgs),
    /// Re-derive an exported result's audit hash.
    Verify(VerifyArgs),
    /// List configured application scenarios.
    Scenarios,
}

#[derive(Clone, Debug, Args)]
pub struct AreaArgs {
    /// JSON file with a boundary ring (array of {lat, lon}, or {"boundary": [...]})
    pub boundary: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct EstimateArgs {
    /// JSON estimate request (farm, application, optional snapshot)
    pub request: PathBuf,

    /// Fetch environmental data from the configured providers
    #[arg(long)]
    pub fetch: bool,

    /// End of the analysis window (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Args)]
pub struct VerifyArgs {
    /// JSON file holding an exported estimation result
    pub result: PathBuf,

    /// Expected hash; defaults to the hash stored in the result
    #[arg(long)]
    pub hash: Option<String>,
}
