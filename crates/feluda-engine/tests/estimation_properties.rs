//! End-to-end estimation behaviour through `MrvService`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use feluda_core::entities::{EnvSample, EnvironmentalSnapshot, EstimationResult};
use feluda_core::enums::{EstimationStage, LocationFlag, PenaltyKind};
use feluda_core::errors::CoreError;
use feluda_core::geo::GeoPoint;
use feluda_engine::geometry::EARTH_RADIUS_M;
use feluda_engine::{
    EngineError, EstimateOptions, FixedClock, GeometryError, InvalidApplicationError, MrvService,
    StageTracker, SubmitApplication,
};
use feluda_env::{EnvironmentalSource, RetryPolicy, StaticSource, UnavailableSource};
use pretty_assertions::assert_eq;
use rstest::rstest;

const REFERENCE_DAILY_PRECIP: f64 = 1500.0 / 365.0;

fn applied_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap()
}

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 9, 8, 0, 0).unwrap()
}

fn metre() -> f64 {
    (1.0 / EARTH_RADIUS_M).to_degrees()
}

/// 100 m × 100 m square near the equator, open ring.
fn hectare() -> Vec<GeoPoint> {
    let m = metre();
    vec![
        GeoPoint::new(0.0, 0.0),
        GeoPoint::new(0.0, 100.0 * m),
        GeoPoint::new(100.0 * m, 100.0 * m),
        GeoPoint::new(100.0 * m, 0.0),
    ]
}

fn centre() -> GeoPoint {
    GeoPoint::new(50.0 * metre(), 50.0 * metre())
}

/// Daily samples at reference conditions covering the 180-day window.
fn complete_snapshot() -> EnvironmentalSnapshot {
    let first = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    EnvironmentalSnapshot {
        samples: (0..180)
            .map(|d| EnvSample {
                timestamp: first + chrono::Duration::days(d),
                ndvi: Some(0.6),
                temperature_c: Some(22.0),
                precipitation_mm: Some(REFERENCE_DAILY_PRECIP),
            })
            .collect(),
        source: "fixture".into(),
        ..EnvironmentalSnapshot::default()
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_millis(100),
        max_retries: 0,
        base_backoff: Duration::from_millis(1),
    }
}

fn service<S: EnvironmentalSource>(source: S) -> MrvService<S> {
    MrvService::new(source)
        .with_clock(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2025, 7, 10, 0, 0, 0).unwrap(),
        )))
        .with_policy(fast_policy())
}

fn request(farm_id: &str) -> SubmitApplication {
    SubmitApplication {
        farm_id: farm_id.to_string(),
        applied_at: applied_at(),
        basalt_mass_kg: 10_000.0,
        particle_size_mm: 0.25,
        location: centre(),
        photo_ref: Some("uploads/plot-a.jpg".into()),
    }
}

fn with_snapshot(snapshot: EnvironmentalSnapshot) -> EstimateOptions {
    EstimateOptions {
        as_of: Some(as_of()),
        snapshot: Some(snapshot),
    }
}

#[tokio::test]
async fn one_hectare_reference_scenario() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    assert!((farm.area_ha - 1.0).abs() < 0.01, "{}", farm.area_ha);

    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();
    let result = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();

    // surface 2.0 · temperature 0.9 · moisture 1.0 over 180 days
    let wf = 1.0 - (-3.0e-4 * 180.0 * 2.0 * 0.9_f64).exp();
    assert!((result.weathering_fraction - wf).abs() < 1e-9);
    assert!((result.central_co2_t - wf * 10_000.0 * 0.33 / 1000.0).abs() < 1e-9);
    assert!(result.central_co2_t > 0.25 && result.central_co2_t < 0.35);
    assert!(result.low_co2_t <= result.central_co2_t && result.central_co2_t <= result.high_co2_t);
    assert!(result.penalties.is_empty());
    assert_eq!(result.audit_hash.len(), 64);
    assert!(result.audit_hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(result.model_version, "erw-saturating-v1");
    assert!((result.audit_record.elapsed_days - 180.0).abs() < 1e-12);
    assert_eq!(
        result.computed_at,
        Utc.with_ymd_and_hms(2025, 7, 10, 0, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn identical_inputs_reproduce_identical_results() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    let first = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();
    let second = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();

    assert_eq!(first.weathering_fraction.to_bits(), second.weathering_fraction.to_bits());
    assert_eq!(first.central_co2_t.to_bits(), second.central_co2_t.to_bits());
    assert_eq!(first.low_co2_t.to_bits(), second.low_co2_t.to_bits());
    assert_eq!(first.high_co2_t.to_bits(), second.high_co2_t.to_bits());
    assert_eq!(first.audit_hash, second.audit_hash);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn sample_order_does_not_change_the_hash() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    let mut shuffled = complete_snapshot();
    shuffled.samples.reverse();
    shuffled.samples.swap(3, 90);

    let ordered = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();
    let reordered = svc.estimate(&app_id, with_snapshot(shuffled)).await.unwrap();
    assert_eq!(ordered.audit_hash, reordered.audit_hash);
}

#[tokio::test]
async fn re_estimation_supersedes_without_editing() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    let first = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();
    let later = EstimateOptions {
        as_of: Some(Utc.with_ymd_and_hms(2025, 7, 10, 0, 0, 0).unwrap()),
        snapshot: Some(complete_snapshot()),
    };
    let second = svc.estimate(&app_id, later).await.unwrap();

    let history = svc.history(&app_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], first);
    assert_eq!(history[1], second);
    assert_eq!(svc.current(&app_id).unwrap(), Some(second));
}

/// Daily samples with constant conditions from the application onwards.
fn constant_snapshot(temperature_c: f64, daily_precip_mm: f64, ndvi: f64) -> EnvironmentalSnapshot {
    let first = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    EnvironmentalSnapshot {
        samples: (0..180)
            .map(|d| EnvSample {
                timestamp: first + chrono::Duration::days(d),
                ndvi: Some(ndvi),
                temperature_c: Some(temperature_c),
                precipitation_mm: Some(daily_precip_mm),
            })
            .collect(),
        source: "fixture".into(),
        ..EnvironmentalSnapshot::default()
    }
}

#[rstest]
#[case::reference(22.0, REFERENCE_DAILY_PRECIP, 0.6, 180)]
#[case::hot_and_wet_month(38.0, 7.0, 0.9, 30)]
#[case::hot_and_wet_season(38.0, 7.0, 0.9, 180)]
#[case::cold_and_dry(0.0, 0.2, 0.1, 180)]
#[case::frozen(-10.0, 0.0, 0.0, 90)]
#[tokio::test]
async fn missing_data_strictly_widens_the_band(
    #[case] temperature_c: f64,
    #[case] daily_precip_mm: f64,
    #[case] ndvi: f64,
    #[case] days: i64,
) {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();
    let as_of = applied_at() + chrono::Duration::days(days);

    let complete = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(as_of),
                snapshot: Some(constant_snapshot(temperature_c, daily_precip_mm, ndvi)),
            },
        )
        .await
        .unwrap();
    let missing = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(as_of),
                snapshot: Some(EnvironmentalSnapshot::empty("none")),
            },
        )
        .await
        .unwrap();

    assert!(complete.penalties.is_empty());
    let width = |r: &EstimationResult| r.high_co2_t - r.low_co2_t;
    assert!(
        width(&missing) > width(&complete),
        "missing {} vs complete {}",
        width(&missing),
        width(&complete)
    );
    // The degraded band still covers what complete data would have given.
    assert!(missing.low_co2_t <= complete.low_co2_t);
    assert!(missing.high_co2_t >= complete.high_co2_t);
}

#[tokio::test]
async fn unavailable_provider_degrades_with_penalties() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    let complete = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();
    let degraded = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(as_of()),
                snapshot: None,
            },
        )
        .await
        .unwrap();

    // Defaults equal the reference conditions, so the centres agree.
    assert!((complete.central_co2_t - degraded.central_co2_t).abs() < 1e-9);
    assert!(degraded.high_co2_t - degraded.low_co2_t > complete.high_co2_t - complete.low_co2_t);

    let kinds: Vec<_> = degraded.penalties.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            PenaltyKind::MissingTemperature,
            PenaltyKind::MissingMoisture,
            PenaltyKind::SnapshotUnavailable,
        ]
    );
    assert!(degraded.audit_record.snapshot_unavailable);
    assert_eq!(degraded.audit_record.snapshot.source, "unavailable");
    assert_ne!(complete.audit_hash, degraded.audit_hash);
}

#[tokio::test]
async fn fetched_snapshot_is_trimmed_to_the_window() {
    let mut wide = complete_snapshot();
    wide.samples.insert(
        0,
        EnvSample {
            timestamp: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            ndvi: None,
            temperature_c: Some(-30.0),
            precipitation_mm: None,
        },
    );
    let svc = service(StaticSource::new(wide));
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    let fetched = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(as_of()),
                snapshot: None,
            },
        )
        .await
        .unwrap();
    let supplied = svc
        .estimate(&app_id, with_snapshot(complete_snapshot()))
        .await
        .unwrap();

    assert_eq!(fetched.audit_record.snapshot.samples.len(), 180);
    assert!(!fetched.audit_record.snapshot_unavailable);
    assert!((fetched.central_co2_t - supplied.central_co2_t).abs() < 1e-12);
}

#[rstest]
#[case(0.0)]
#[case(30.0)]
#[case(180.0)]
#[case(3650.0)]
#[tokio::test]
async fn bounds_bracket_the_centre(#[case] days: f64) {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    #[allow(clippy::cast_possible_truncation)]
    let as_of = applied_at() + chrono::Duration::seconds((days * 86_400.0) as i64);
    let result = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(as_of),
                snapshot: Some(EnvironmentalSnapshot::empty("none")),
            },
        )
        .await
        .unwrap();

    assert!((0.0..=1.0).contains(&result.weathering_fraction));
    assert!(0.0 <= result.low_co2_t);
    assert!(result.low_co2_t <= result.central_co2_t);
    assert!(result.central_co2_t <= result.high_co2_t);
}

#[tokio::test]
async fn location_near_and_outside_are_flagged_and_penalised() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let m = metre();

    let near = svc
        .submit_application(SubmitApplication {
            location: GeoPoint::new(50.0 * m, -40.0 * m),
            ..request(&farm.farm_id)
        })
        .unwrap();
    let outside = svc
        .submit_application(SubmitApplication {
            location: GeoPoint::new(50.0 * m, -5_000.0 * m),
            ..request(&farm.farm_id)
        })
        .unwrap();

    assert_eq!(svc.application(&near).unwrap().location_flag, LocationFlag::NearBoundary);
    assert_eq!(svc.application(&outside).unwrap().location_flag, LocationFlag::Outside);

    let result = svc
        .estimate(&outside, with_snapshot(complete_snapshot()))
        .await
        .unwrap();
    assert_eq!(result.penalties.len(), 1);
    assert_eq!(result.penalties[0].kind, PenaltyKind::LocationOutsideBoundary);
}

// ── Rejections ─────────────────────────────────────────────────────

#[test]
fn two_vertex_boundary_is_rejected() {
    let svc = service(UnavailableSource);
    let err = svc
        .register_farm("Line", &[GeoPoint::new(0.0, 0.0), GeoPoint::new(0.001, 0.001)])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Geometry(GeometryError::TooFewVertices { distinct: 2 })
    ));
}

#[test]
fn zero_mass_is_rejected() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let err = svc
        .submit_application(SubmitApplication {
            basalt_mass_kg: 0.0,
            ..request(&farm.farm_id)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidApplication(InvalidApplicationError::NonPositiveMass { .. })
    ));
}

#[test]
fn future_dated_application_is_rejected() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let err = svc
        .submit_application(SubmitApplication {
            applied_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            ..request(&farm.farm_id)
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidApplication(InvalidApplicationError::FutureDated { .. })
    ));
}

#[test]
fn unknown_farm_is_not_found() {
    let svc = service(UnavailableSource);
    let err = svc.submit_application(request("frm-ffffffff")).unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn as_of_before_application_fails_and_stores_nothing() {
    let svc = service(UnavailableSource);
    let farm = svc.register_farm("Plot A", &hectare()).unwrap();
    let app_id = svc.submit_application(request(&farm.farm_id)).unwrap();

    let err = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                snapshot: Some(complete_snapshot()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidApplication(InvalidApplicationError::FutureDated { .. })
    ));
    assert!(svc.history(&app_id).unwrap().is_empty());
}

#[tokio::test]
async fn invalid_stored_boundary_moves_run_to_failed() {
    use feluda_core::entities::{ApplicationRecord, Farm};
    use feluda_core::params::ModelParameters;
    use feluda_engine::Orchestrator;

    let farm = Farm {
        id: "frm-00000001".into(),
        name: "Broken".into(),
        boundary: vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001)],
        area_ha: 0.0,
        created_at: applied_at(),
    };
    let application = ApplicationRecord {
        id: "app-00000001".into(),
        farm_id: farm.id.clone(),
        applied_at: applied_at(),
        basalt_mass_kg: 1_000.0,
        particle_size_mm: 0.25,
        location: GeoPoint::new(0.0, 0.0),
        location_flag: LocationFlag::Inside,
        photo_ref: None,
        created_at: applied_at(),
    };

    let orchestrator = Orchestrator::new(UnavailableSource, ModelParameters::v1());
    let mut tracker = StageTracker::new(&application.id);
    let err = orchestrator
        .run_tracked(&mut tracker, &farm, &application, with_snapshot(complete_snapshot()))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Geometry(_)));
    assert_eq!(
        tracker.history(),
        &[
            EstimationStage::Submitted,
            EstimationStage::DataAssembled,
            EstimationStage::Failed,
        ]
    );
}
