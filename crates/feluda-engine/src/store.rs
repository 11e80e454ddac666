//! Record persistence.
//!
//! Farms and applications are immutable once inserted. Estimation results
//! are append-only per application; the newest is current and older ones
//! stay in history.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use feluda_core::entities::{ApplicationRecord, EstimationResult, Farm};
use feluda_core::errors::CoreError;

pub trait RecordStore: Send + Sync {
    /// # Errors
    ///
    /// [`CoreError::Validation`] if the id already exists.
    fn insert_farm(&self, farm: Farm) -> Result<(), CoreError>;

    /// # Errors
    ///
    /// [`CoreError::NotFound`] for an unknown id.
    fn farm(&self, id: &str) -> Result<Farm, CoreError>;

    /// # Errors
    ///
    /// [`CoreError::Validation`] if the id already exists.
    fn insert_application(&self, application: ApplicationRecord) -> Result<(), CoreError>;

    /// # Errors
    ///
    /// [`CoreError::NotFound`] for an unknown id.
    fn application(&self, id: &str) -> Result<ApplicationRecord, CoreError>;

    /// Append a result; it becomes the application's current result.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the application is unknown.
    fn append_result(&self, result: EstimationResult) -> Result<(), CoreError>;

    /// Newest result for an application, if any.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn current_result(&self, application_id: &str) -> Result<Option<EstimationResult>, CoreError>;

    /// All results for an application, oldest first.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    fn results(&self, application_id: &str) -> Result<Vec<EstimationResult>, CoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    farms: HashMap<String, Farm>,
    applications: HashMap<String, ApplicationRecord>,
    results: HashMap<String, Vec<EstimationResult>>,
}

/// Process-local store behind a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> CoreError {
    CoreError::Other(anyhow::anyhow!("record store lock poisoned"))
}

fn duplicate(entity: &str, id: &str) -> CoreError {
    CoreError::Validation(format!("{entity} {id} already exists"))
}

impl RecordStore for InMemoryStore {
    fn insert_farm(&self, farm: Farm) -> Result<(), CoreError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        if tables.farms.contains_key(&farm.id) {
            return Err(duplicate("farm", &farm.id));
        }
        tables.farms.insert(farm.id.clone(), farm);
        Ok(())
    }

    fn farm(&self, id: &str) -> Result<Farm, CoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        tables
            .farms
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("farm", id))
    }

    fn insert_application(&self, application: ApplicationRecord) -> Result<(), CoreError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        if !tables.farms.contains_key(&application.farm_id) {
            return Err(CoreError::not_found("farm", &application.farm_id));
        }
        if tables.applications.contains_key(&application.id) {
            return Err(duplicate("application", &application.id));
        }
        tables
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn application(&self, id: &str) -> Result<ApplicationRecord, CoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        tables
            .applications
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("application", id))
    }

    fn append_result(&self, result: EstimationResult) -> Result<(), CoreError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        if !tables.applications.contains_key(&result.application_id) {
            return Err(CoreError::not_found("application", &result.application_id));
        }
        tables
            .results
            .entry(result.application_id.clone())
            .or_default()
            .push(result);
        Ok(())
    }

    fn current_result(&self, application_id: &str) -> Result<Option<EstimationResult>, CoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .results
            .get(application_id)
            .and_then(|history| history.last().cloned()))
    }

    fn results(&self, application_id: &str) -> Result<Vec<EstimationResult>, CoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .results
            .get(application_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use feluda_core::enums::LocationFlag;
    use feluda_core::geo::GeoPoint;

    fn farm() -> Farm {
        Farm {
            id: "frm-00000001".into(),
            name: "Test".into(),
            boundary: vec![],
            area_ha: 1.0,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn application() -> ApplicationRecord {
        ApplicationRecord {
            id: "app-00000001".into(),
            farm_id: "frm-00000001".into(),
            applied_at: Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
            basalt_mass_kg: 1000.0,
            particle_size_mm: 0.25,
            location: GeoPoint::new(0.0, 0.0),
            location_flag: LocationFlag::Inside,
            photo_ref: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = InMemoryStore::new();
        store.insert_farm(farm()).unwrap();
        assert!(matches!(store.insert_farm(farm()), Err(CoreError::Validation(_))));
    }

    #[test]
    fn application_requires_known_farm() {
        let store = InMemoryStore::new();
        let err = store.insert_application(application()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { ref entity_type, .. } if entity_type == "farm"));
    }

    #[test]
    fn unknown_lookups_are_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(store.farm("frm-ffffffff"), Err(CoreError::NotFound { .. })));
        assert!(matches!(store.application("app-ffffffff"), Err(CoreError::NotFound { .. })));
        assert!(store.current_result("app-ffffffff").unwrap().is_none());
        assert!(store.results("app-ffffffff").unwrap().is_empty());
    }
}
