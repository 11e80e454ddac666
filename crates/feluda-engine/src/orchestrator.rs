//! Estimation state machine for one application.
//!
//! ```text
//! submitted → data_assembled → estimated → audited
//! ```
//!
//! Any error before `audited` moves the run to `failed`. Provider failure is
//! not an error: the run continues on an empty snapshot with a
//! `snapshot_unavailable` penalty.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use feluda_core::entities::{
    AnalysisWindow, ApplicationRecord, AuditedApplication, EnvironmentalSnapshot, EstimationResult,
    Farm,
};
use feluda_core::enums::EstimationStage;
use feluda_core::errors::CoreError;
use feluda_core::ids::{PREFIX_ESTIMATION, generate_id};
use feluda_core::params::ModelParameters;
use feluda_env::{EnvironmentalSource, RetryPolicy, fetch_with_retry};

use crate::assessment::{self, EvaluationInputs};
use crate::audit;
use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, InvalidApplicationError};

/// Source label of the substituted snapshot when the provider fails.
pub const UNAVAILABLE_SOURCE: &str = "unavailable";

/// Per-run overrides.
#[derive(Debug, Clone, Default)]
pub struct EstimateOptions {
    /// End of the analysis window. Defaults to the clock's now.
    pub as_of: Option<DateTime<Utc>>,
    /// Use this snapshot instead of fetching one.
    pub snapshot: Option<EnvironmentalSnapshot>,
}

// ── Stage tracking ─────────────────────────────────────────────────

/// Current stage of one run plus the stages it passed through.
#[derive(Debug, Clone)]
pub struct StageTracker {
    application_id: String,
    stage: EstimationStage,
    history: Vec<EstimationStage>,
    failure: Option<String>,
}

impl StageTracker {
    #[must_use]
    pub fn new(application_id: &str) -> Self {
        Self {
            application_id: application_id.to_string(),
            stage: EstimationStage::Submitted,
            history: vec![EstimationStage::Submitted],
            failure: None,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> EstimationStage {
        self.stage
    }

    #[must_use]
    pub fn history(&self) -> &[EstimationStage] {
        &self.history
    }

    /// Reason recorded when the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if `next` is not reachable
    /// from the current stage.
    pub fn advance(&mut self, next: EstimationStage) -> Result<(), CoreError> {
        if !self.stage.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "estimation".to_string(),
                id: self.application_id.clone(),
                from: self.stage.to_string(),
                to: next.to_string(),
            });
        }
        tracing::info!(
            application_id = %self.application_id,
            from = %self.stage,
            to = %next,
            "estimation stage"
        );
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `failed`. A terminal run is left untouched.
    pub fn fail(&mut self, reason: &EngineError) {
        if self.stage.is_terminal() {
            return;
        }
        tracing::warn!(
            application_id = %self.application_id,
            from = %self.stage,
            error = %reason,
            "estimation failed"
        );
        self.stage = EstimationStage::Failed;
        self.history.push(EstimationStage::Failed);
        self.failure = Some(reason.to_string());
    }
}

// ── Orchestrator ───────────────────────────────────────────────────

pub struct Orchestrator<S> {
    source: S,
    policy: RetryPolicy,
    params: ModelParameters,
    clock: Arc<dyn Clock>,
}

impl<S: EnvironmentalSource> Orchestrator<S> {
    #[must_use]
    pub fn new(source: S, params: ModelParameters) -> Self {
        Self {
            source,
            policy: RetryPolicy::default(),
            params,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn params(&self) -> &ModelParameters {
        &self.params
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Run one estimation to completion.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for invalid inputs or a computation failure.
    pub async fn run(
        &self,
        farm: &Farm,
        application: &ApplicationRecord,
        options: EstimateOptions,
    ) -> Result<EstimationResult, EngineError> {
        let mut tracker = StageTracker::new(&application.id);
        self.run_tracked(&mut tracker, farm, application, options).await
    }

    /// [`Self::run`] with the caller observing stage transitions.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`]; `tracker` ends in `failed`.
    pub async fn run_tracked(
        &self,
        tracker: &mut StageTracker,
        farm: &Farm,
        application: &ApplicationRecord,
        options: EstimateOptions,
    ) -> Result<EstimationResult, EngineError> {
        match self.drive(tracker, farm, application, options).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracker.fail(&err);
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        tracker: &mut StageTracker,
        farm: &Farm,
        application: &ApplicationRecord,
        options: EstimateOptions,
    ) -> Result<EstimationResult, EngineError> {
        let as_of = options.as_of.unwrap_or_else(|| self.clock.now());
        let window = AnalysisWindow::new(application.applied_at, as_of);
        if window.days() < 0.0 {
            return Err(InvalidApplicationError::FutureDated {
                days_ahead: -window.days(),
            }
            .into());
        }

        // Submitted → DataAssembled
        let (snapshot, snapshot_unavailable) = match options.snapshot {
            Some(snapshot) => (snapshot, false),
            None => self.assemble(application, window).await,
        };
        tracker.advance(EstimationStage::DataAssembled)?;

        // DataAssembled → Estimated
        let audited_application = AuditedApplication::from(application);
        let record = assessment::evaluate(EvaluationInputs {
            farm_id: &farm.id,
            boundary: &farm.boundary,
            application: &audited_application,
            as_of,
            snapshot,
            snapshot_unavailable,
            params: &self.params,
        })?;
        tracker.advance(EstimationStage::Estimated)?;

        // Estimated → Audited
        let audit_hash = audit::digest(&record)?;
        let outputs = &record.outputs;
        let result = EstimationResult {
            id: generate_id(PREFIX_ESTIMATION)?,
            application_id: application.id.clone(),
            weathering_fraction: outputs.weathering_fraction,
            central_co2_t: outputs.central_co2_t,
            low_co2_t: outputs.low_co2_t,
            high_co2_t: outputs.high_co2_t,
            central_co2_t_per_ha: outputs.central_co2_t / record.farm.area_ha,
            dic_export_t: outputs.dic_export_t,
            permanence: outputs.permanence,
            penalties: record.penalties.clone(),
            audit_hash,
            model_version: self.params.version.clone(),
            computed_at: self.clock.now(),
            audit_record: record,
        };
        tracker.advance(EstimationStage::Audited)?;
        Ok(result)
    }

    async fn assemble(
        &self,
        application: &ApplicationRecord,
        window: AnalysisWindow,
    ) -> (EnvironmentalSnapshot, bool) {
        match fetch_with_retry(&self.source, application.location, window, &self.policy).await {
            Ok(snapshot) => (snapshot, false),
            Err(error) => {
                tracing::warn!(
                    application_id = %application.id,
                    source = self.source.name(),
                    %error,
                    "environmental data unavailable; using model defaults"
                );
                (EnvironmentalSnapshot::empty(UNAVAILABLE_SOURCE), true)
            }
        }
    }
}
