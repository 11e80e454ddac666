//! In-memory sources for tests, offline runs and caller-supplied data.

use feluda_core::entities::{AnalysisWindow, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;

use crate::{EnvironmentalSource, error::EnvError};

/// Always returns the same snapshot, restricted to the requested window.
#[derive(Debug, Clone)]
pub struct StaticSource {
    snapshot: EnvironmentalSnapshot,
}

impl StaticSource {
    #[must_use]
    pub const fn new(snapshot: EnvironmentalSnapshot) -> Self {
        Self { snapshot }
    }
}

impl EnvironmentalSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_snapshot(
        &self,
        _location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        let snapshot = self.snapshot.clone().within(&window);
        if snapshot.is_empty() {
            return Err(EnvError::Empty);
        }
        Ok(snapshot)
    }
}

/// Never has data. Models a provider outage.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

impl EnvironmentalSource for UnavailableSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn fetch_snapshot(
        &self,
        _location: GeoPoint,
        _window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        Err(EnvError::Disabled)
    }
}
