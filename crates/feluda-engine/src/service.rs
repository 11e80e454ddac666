//! The MRV service: farm and application intake, estimation, verification.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use feluda_config::{ConfigError, FeludaConfig, ScenarioPreset};
use feluda_core::entities::{ApplicationRecord, AuditRecord, EstimationResult, Farm};
use feluda_core::errors::CoreError;
use feluda_core::geo::GeoPoint;
use feluda_core::ids::{PREFIX_APPLICATION, PREFIX_FARM, generate_id};
use feluda_core::params::ModelParameters;
use feluda_env::{EnvironmentalSource, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::audit::{self, Verification};
use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, InvalidApplicationError};
use crate::estimator;
use crate::geometry::Boundary;
use crate::orchestrator::{EstimateOptions, Orchestrator};
use crate::store::{InMemoryStore, RecordStore};

/// Outcome of registering a farm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmRegistration {
    pub farm_id: String,
    pub area_ha: f64,
}

/// A basalt application as submitted by a field operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub farm_id: String,
    pub applied_at: DateTime<Utc>,
    pub basalt_mass_kg: f64,
    pub particle_size_mm: f64,
    pub location: GeoPoint,
    #[serde(default)]
    pub photo_ref: Option<String>,
}

/// What to verify a hash against.
#[derive(Debug, Clone)]
pub enum VerifyTarget {
    /// The application's current result.
    Application(String),
    /// A record supplied by the caller, e.g. an exported result.
    Record(Box<AuditRecord>),
}

pub struct MrvService<S, St = InMemoryStore> {
    orchestrator: Orchestrator<S>,
    store: St,
    scenarios: BTreeMap<String, ScenarioPreset>,
    clock: Arc<dyn Clock>,
}

impl<S: EnvironmentalSource> MrvService<S, InMemoryStore> {
    /// Service with the v1 model, built-in scenarios and an in-memory store.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            orchestrator: Orchestrator::new(source, ModelParameters::v1()),
            store: InMemoryStore::new(),
            scenarios: feluda_config::default_scenarios(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Service configured from a loaded [`FeludaConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the configured model version
    /// is unknown.
    pub fn from_config(config: &FeludaConfig, source: S) -> Result<Self, EngineError> {
        let params = ModelParameters::for_version(&config.general.model_version).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "general.model_version".to_string(),
                reason: format!("unknown model version {}", config.general.model_version),
            }
        })?;
        Ok(Self {
            orchestrator: Orchestrator::new(source, params)
                .with_policy(RetryPolicy::from(&config.fetch)),
            store: InMemoryStore::new(),
            scenarios: config.scenarios.clone(),
            clock: Arc::new(SystemClock),
        })
    }
}

impl<S, St> MrvService<S, St>
where
    S: EnvironmentalSource,
    St: RecordStore,
{
    #[must_use]
    pub fn with_store<T: RecordStore>(self, store: T) -> MrvService<S, T> {
        MrvService {
            orchestrator: self.orchestrator,
            store,
            scenarios: self.scenarios,
            clock: self.clock,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.orchestrator = self.orchestrator.with_clock(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.orchestrator = self.orchestrator.with_policy(policy);
        self
    }

    #[must_use]
    pub const fn params(&self) -> &ModelParameters {
        self.orchestrator.params()
    }

    #[must_use]
    pub const fn scenarios(&self) -> &BTreeMap<String, ScenarioPreset> {
        &self.scenarios
    }

    /// Validate and measure a boundary, then store the farm.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Geometry`] for an invalid boundary; nothing is
    /// stored.
    pub fn register_farm(
        &self,
        name: &str,
        boundary: &[GeoPoint],
    ) -> Result<FarmRegistration, EngineError> {
        let boundary = Boundary::new(boundary)?;
        let area_ha = boundary.area_ha();
        let farm = Farm {
            id: generate_id(PREFIX_FARM)?,
            name: name.to_string(),
            boundary: boundary.into_ring(),
            area_ha,
            created_at: self.clock.now(),
        };
        let farm_id = farm.id.clone();
        self.store.insert_farm(farm)?;
        tracing::info!(%farm_id, area_ha, "farm registered");
        Ok(FarmRegistration { farm_id, area_ha })
    }

    /// Record a basalt application against a registered farm.
    ///
    /// A location outside the boundary is flagged, not rejected.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] for an unknown farm
    /// - [`InvalidApplicationError`] for invalid mass, particle size,
    ///   location, or an application date in the future
    pub fn submit_application(&self, request: SubmitApplication) -> Result<String, EngineError> {
        let farm = self.store.farm(&request.farm_id)?;
        estimator::validate_application(request.basalt_mass_kg, request.particle_size_mm)?;
        if !request.location.is_valid() {
            return Err(InvalidApplicationError::InvalidLocation {
                lat: request.location.lat,
                lon: request.location.lon,
            }
            .into());
        }
        let now = self.clock.now();
        if request.applied_at > now {
            #[allow(clippy::cast_precision_loss)]
            let days_ahead = (request.applied_at - now).num_seconds() as f64 / 86_400.0;
            return Err(InvalidApplicationError::FutureDated { days_ahead }.into());
        }

        let location_flag = Boundary::new(&farm.boundary)?
            .classify(request.location, self.params().boundary_tolerance_m);
        let application = ApplicationRecord {
            id: generate_id(PREFIX_APPLICATION)?,
            farm_id: request.farm_id,
            applied_at: request.applied_at,
            basalt_mass_kg: request.basalt_mass_kg,
            particle_size_mm: request.particle_size_mm,
            location: request.location,
            location_flag,
            photo_ref: request.photo_ref,
            created_at: now,
        };
        let application_id = application.id.clone();
        self.store.insert_application(application)?;
        tracing::info!(%application_id, %location_flag, "application submitted");
        Ok(application_id)
    }

    /// Submit an application sized by a named scenario preset.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownScenario`] for an unknown preset, otherwise as
    /// [`Self::submit_application`].
    pub fn submit_scenario(
        &self,
        farm_id: &str,
        scenario: &str,
        applied_at: DateTime<Utc>,
        location: GeoPoint,
    ) -> Result<String, EngineError> {
        let preset = self
            .scenarios
            .get(scenario)
            .ok_or_else(|| ConfigError::UnknownScenario(scenario.to_string()))?;
        let farm = self.store.farm(farm_id)?;
        self.submit_application(SubmitApplication {
            farm_id: farm_id.to_string(),
            applied_at,
            basalt_mass_kg: preset.mass_for_area(farm.area_ha),
            particle_size_mm: preset.particle_size_mm,
            location,
            photo_ref: None,
        })
    }

    /// Estimate sequestration for an application and make it current.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the application is unknown or the run fails.
    /// A failed run stores nothing.
    pub async fn estimate(
        &self,
        application_id: &str,
        options: EstimateOptions,
    ) -> Result<EstimationResult, EngineError> {
        let application = self.store.application(application_id)?;
        let farm = self.store.farm(&application.farm_id)?;
        let result = self.orchestrator.run(&farm, &application, options).await?;
        self.store.append_result(result.clone())?;
        tracing::info!(
            %application_id,
            result_id = %result.id,
            audit_hash = %result.audit_hash,
            "estimation stored"
        );
        Ok(result)
    }

    /// Re-derive a digest and compare it with `expected_hash`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the application has no result.
    pub fn verify(
        &self,
        target: VerifyTarget,
        expected_hash: &str,
    ) -> Result<Verification, EngineError> {
        let verification = match target {
            VerifyTarget::Application(id) => {
                let result = self
                    .store
                    .current_result(&id)?
                    .ok_or_else(|| CoreError::not_found("estimation", &id))?;
                audit::verify_result(&result, expected_hash)?
            }
            VerifyTarget::Record(record) => audit::verify(&record, expected_hash)?,
        };
        Ok(verification)
    }

    /// # Errors
    ///
    /// Store failures only.
    pub fn history(&self, application_id: &str) -> Result<Vec<EstimationResult>, EngineError> {
        Ok(self.store.results(application_id)?)
    }

    /// # Errors
    ///
    /// Store failures only.
    pub fn current(&self, application_id: &str) -> Result<Option<EstimationResult>, EngineError> {
        Ok(self.store.current_result(application_id)?)
    }

    /// # Errors
    ///
    /// [`CoreError::NotFound`] for an unknown id.
    pub fn farm(&self, farm_id: &str) -> Result<Farm, EngineError> {
        Ok(self.store.farm(farm_id)?)
    }

    /// # Errors
    ///
    /// [`CoreError::NotFound`] for an unknown id.
    pub fn application(&self, application_id: &str) -> Result<ApplicationRecord, EngineError> {
        Ok(self.store.application(application_id)?)
    }
}
