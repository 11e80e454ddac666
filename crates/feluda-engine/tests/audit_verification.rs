//! Digest stability and tamper detection.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use feluda_core::entities::{EnvSample, EnvironmentalSnapshot, EstimationResult, SiteContext};
use feluda_core::errors::CoreError;
use feluda_core::geo::GeoPoint;
use feluda_engine::audit::{AUDIT_DOMAIN, digest, verify, verify_result};
use feluda_engine::canonical::to_canonical_string;
use feluda_engine::{
    EngineError, EstimateOptions, FixedClock, MrvService, SubmitApplication, VerifyTarget,
};
use feluda_env::UnavailableSource;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

fn snapshot() -> EnvironmentalSnapshot {
    let first = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    EnvironmentalSnapshot {
        samples: (0..60)
            .map(|d| EnvSample {
                timestamp: first + chrono::Duration::days(d),
                ndvi: (d % 3 != 0).then_some(0.52),
                temperature_c: (d % 7 != 0).then_some(26.5),
                precipitation_mm: Some(3.1),
            })
            .collect(),
        site: SiteContext {
            soil_ph: Some(5.9),
            clay_pct: None,
            slope_pct: Some(2.0),
        },
        source: "fixture".into(),
    }
}

async fn estimated() -> (MrvService<UnavailableSource>, String, EstimationResult) {
    let svc = MrvService::new(UnavailableSource).with_clock(Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
    )));
    let farm = svc
        .register_farm(
            "Kolar east",
            &[
                GeoPoint::new(13.1362, 78.1290),
                GeoPoint::new(13.1362, 78.1335),
                GeoPoint::new(13.1398, 78.1335),
                GeoPoint::new(13.1398, 78.1290),
            ],
        )
        .unwrap();
    let app_id = svc
        .submit_application(SubmitApplication {
            farm_id: farm.farm_id,
            applied_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            basalt_mass_kg: 25_000.0,
            particle_size_mm: 0.1,
            location: GeoPoint::new(13.1380, 78.1310),
            photo_ref: None,
        })
        .unwrap();
    let result = svc
        .estimate(
            &app_id,
            EstimateOptions {
                as_of: Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()),
                snapshot: Some(snapshot()),
            },
        )
        .await
        .unwrap();
    (svc, app_id, result)
}

#[tokio::test]
async fn digest_is_domain_separated_sha256_of_canonical_form() {
    let (_, _, result) = estimated().await;
    let canonical = to_canonical_string(&result.audit_record).unwrap();
    let mut hasher = Sha256::new();
    hasher.update(AUDIT_DOMAIN);
    hasher.update(canonical.as_bytes());
    assert_eq!(hex::encode(hasher.finalize()), result.audit_hash);
    assert_eq!(digest(&result.audit_record).unwrap(), result.audit_hash);
}

#[tokio::test]
async fn record_round_trips_through_json_and_still_verifies() {
    let (_, _, result) = estimated().await;
    let exported = serde_json::to_string_pretty(&result).unwrap();
    let imported: EstimationResult = serde_json::from_str(&exported).unwrap();

    let v = verify(&imported.audit_record, &imported.audit_hash).unwrap();
    assert!(v.matches, "{v:?}");
    assert_eq!(v.recomputed.as_deref(), Some(result.audit_hash.as_str()));
}

#[tokio::test]
async fn current_result_verifies_by_application() {
    let (svc, app_id, result) = estimated().await;
    let v = svc
        .verify(VerifyTarget::Application(app_id), &result.audit_hash.to_uppercase())
        .unwrap();
    assert!(v.matches);
    assert!(v.into_result().is_ok());
}

#[tokio::test]
async fn tampered_inputs_are_detected() {
    let (svc, _, result) = estimated().await;

    let mut heavier = result.audit_record.clone();
    heavier.application.basalt_mass_kg *= 2.0;
    let v = svc
        .verify(VerifyTarget::Record(Box::new(heavier)), &result.audit_hash)
        .unwrap();
    assert!(!v.matches);
    assert!(matches!(
        v.into_result(),
        Err(feluda_engine::AuditMismatchError { .. })
    ));

    let mut warmer = result.audit_record.clone();
    warmer.snapshot.samples[5].temperature_c = Some(35.0);
    assert!(!verify(&warmer, &result.audit_hash).unwrap().matches);

    let mut retuned = result.audit_record.clone();
    retuned.parameters.rate_constant_per_day *= 1.1;
    assert!(!verify(&retuned, &result.audit_hash).unwrap().matches);
}

#[tokio::test]
async fn forged_outputs_are_detected() {
    let (svc, _, result) = estimated().await;

    let mut forged = result.clone();
    forged.central_co2_t *= 10.0;
    forged.audit_record.outputs.central_co2_t *= 10.0;
    forged.audit_record.outputs.high_co2_t *= 10.0;

    let v = verify(&forged.audit_record, &forged.audit_hash).unwrap();
    assert!(!v.matches, "{v:?}");
    assert_eq!(v.recomputed.as_deref(), Some(result.audit_hash.as_str()));
    assert_ne!(v.stored, result.audit_hash);
    assert!(v.reason.as_deref().unwrap().contains("stored outputs differ"));

    let by_record = svc
        .verify(
            VerifyTarget::Record(Box::new(forged.audit_record.clone())),
            &result.audit_hash,
        )
        .unwrap();
    assert!(!by_record.matches);
    assert!(matches!(
        by_record.into_result(),
        Err(feluda_engine::AuditMismatchError { .. })
    ));
}

#[tokio::test]
async fn result_summary_must_agree_with_its_record() {
    let (_, _, result) = estimated().await;
    assert!(verify_result(&result, &result.audit_hash).unwrap().matches);

    let mut inflated = result.clone();
    inflated.central_co2_t *= 10.0;
    inflated.high_co2_t *= 10.0;
    let v = verify_result(&inflated, &inflated.audit_hash).unwrap();
    assert!(!v.matches);
    assert_eq!(v.stored, result.audit_hash);
    let reason = v.reason.clone().unwrap();
    assert!(reason.contains("central_co2_t") && reason.contains("high_co2_t"), "{reason}");
    assert!(v.into_result().unwrap_err().actual.starts_with("inconsistent"));
}

#[tokio::test]
async fn wrong_expected_hash_is_a_mismatch() {
    let (_, _, result) = estimated().await;
    let v = verify(&result.audit_record, &"0".repeat(64)).unwrap();
    assert!(!v.matches);
    assert_eq!(v.recomputed.as_deref(), Some(result.audit_hash.as_str()));
}

#[tokio::test]
async fn unreproducible_record_reports_why() {
    let (_, _, result) = estimated().await;
    let mut broken = result.audit_record.clone();
    broken.application.basalt_mass_kg = 0.0;

    let v = verify(&broken, &result.audit_hash).unwrap();
    assert!(!v.matches);
    assert!(v.recomputed.is_none());
    assert!(v.reason.as_deref().unwrap().contains("basalt mass"));
    let err = v.into_result().unwrap_err();
    assert!(err.actual.starts_with("unreproducible"));
}

#[tokio::test]
async fn application_without_result_is_not_found() {
    let (svc, _, _) = estimated().await;
    let err = svc
        .verify(VerifyTarget::Application("app-ffffffff".into()), "00")
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn defaulted_site_fields_are_recorded() {
    let (_, _, result) = estimated().await;
    let effective = &result.audit_record.effective;
    assert_eq!(effective.site_defaults, vec!["clay_pct".to_string()]);
    assert!((effective.clay_pct - 18.0).abs() < f64::EPSILON);
    assert!((effective.slope_pct - 2.0).abs() < f64::EPSILON);
    assert_eq!(result.permanence, feluda_core::enums::Permanence::High);
}
