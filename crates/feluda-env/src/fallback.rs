//! Primary → secondary provider chaining.

use feluda_core::entities::{AnalysisWindow, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;

use crate::{EnvironmentalSource, error::EnvError};

/// Try `primary`; on any error try `secondary`.
///
/// If both fail the primary's error is returned, since it is usually the
/// more informative one.
#[derive(Debug, Clone)]
pub struct FallbackSource<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> FallbackSource<A, B> {
    pub const fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub const fn primary(&self) -> &A {
        &self.primary
    }

    pub const fn secondary(&self) -> &B {
        &self.secondary
    }
}

impl<A, B> EnvironmentalSource for FallbackSource<A, B>
where
    A: EnvironmentalSource,
    B: EnvironmentalSource,
{
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        match self.primary.fetch_snapshot(location, window).await {
            Ok(snapshot) => Ok(snapshot),
            Err(primary_err) => {
                tracing::warn!(
                    provider = self.primary.name(),
                    fallback = self.secondary.name(),
                    %primary_err,
                    "primary environmental provider failed, trying fallback"
                );
                match self.secondary.fetch_snapshot(location, window).await {
                    Ok(snapshot) => Ok(snapshot),
                    Err(secondary_err) => {
                        tracing::warn!(provider = self.secondary.name(), %secondary_err, "fallback provider failed");
                        Err(primary_err)
                    }
                }
            }
        }
    }
}
