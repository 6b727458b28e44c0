//! Patient record store integration tests.

use hospital_records_core::export::SnapshotExporter;
use hospital_records_core::models::PatientField;
use hospital_records_core::{PatientRecords, RecordError, ValidationError};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn payload(name: &str) -> Map<String, Value> {
    json!({
        "name": name,
        "age": 34,
        "gender": "F",
        "blood_type": "O+",
        "medical_condition": "Flu",
        "date_of_admission": "2024-01-10",
        "doctor": "Dr. Lee",
        "hospital": "Mercy",
        "insurance_provider": "Acme",
        "billing_amount": 1200.50,
        "room_number": 204,
        "admission_type": "Emergency",
        "medication": "Ibuprofen",
        "test_results": "Normal"
    })
    .as_object()
    .unwrap()
    .clone()
}

#[test]
fn test_records_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hospital.db");

    let created = {
        let records = PatientRecords::open(&path).unwrap();
        records.create(&payload("Jane Doe")).unwrap()
    };

    let reopened = PatientRecords::open(&path).unwrap();
    assert_eq!(reopened.get(created.id).unwrap(), created);
    assert_eq!(reopened.list().unwrap(), vec![created]);
}

#[test]
fn test_ids_unique_and_increasing() {
    let records = PatientRecords::open_in_memory().unwrap();

    let ids: Vec<i64> = (0..5)
        .map(|i| records.create(&payload(&format!("Patient {i}"))).unwrap().id)
        .collect();

    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_deleted_id_not_reused() {
    let records = PatientRecords::open_in_memory().unwrap();

    let first = records.create(&payload("First")).unwrap();
    records.delete(first.id).unwrap();
    let second = records.create(&payload("Second")).unwrap();

    assert_ne!(first.id, second.id);
    assert!(matches!(records.get(first.id), Err(RecordError::NotFound(_))));
}

#[test]
fn test_create_missing_field_message() {
    let records = PatientRecords::open_in_memory().unwrap();

    let mut body = payload("Jane Doe");
    body.remove("medication");
    let err = records.create(&body).unwrap_err();

    assert!(matches!(
        err,
        RecordError::Validation(ValidationError::MissingField(ref key)) if key == "medication"
    ));
    assert_eq!(err.to_string(), "Missing key: 'medication'");
}

#[test]
fn test_export_row_count_matches_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("hospital.db");
    let output = dir.path().join("transformed_data.csv");

    let records = PatientRecords::open(&db_path).unwrap();
    for i in 0..4 {
        records.create(&payload(&format!("Patient {i}"))).unwrap();
    }
    std::fs::write(&output, "stale contents\n").unwrap();

    let report = SnapshotExporter::new().export(&db_path, &output).unwrap();
    assert_eq!(report.rows, 4);

    let csv = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);

    let header: Vec<&str> = PatientField::ALL.iter().map(|f| f.name()).collect();
    assert_eq!(lines[0], header.join(","));
    assert!(!csv.contains("stale"));
}

proptest! {
    #[test]
    fn prop_billing_update_leaves_other_fields(amount in 0.0f64..1_000_000.0) {
        let records = PatientRecords::open_in_memory().unwrap();
        let created = records.create(&payload("Jane Doe")).unwrap();

        let body = json!({ "billing_amount": amount });
        let updated = records.update(created.id, body.as_object().unwrap()).unwrap();

        prop_assert_eq!(updated.billing_amount, amount);
        let mut expected = created.clone();
        expected.billing_amount = amount;
        prop_assert_eq!(&updated, &expected);
        prop_assert_eq!(records.get(created.id).unwrap(), expected);
    }
}
