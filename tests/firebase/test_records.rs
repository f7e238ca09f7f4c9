// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{TimeZone, Utc};
use medical_classifier::firebase::database::{document_to_record, record_to_document};
use medical_classifier::firebase::{DatabaseError, MockRecordStore, RecordStore};
use medical_classifier::records::{Label, PredictionRecord};
use serde_json::json;

fn record() -> PredictionRecord {
    PredictionRecord::new(
        "chest.png",
        Label::Pneumonia,
        0.875,
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap(),
        "https://storage.googleapis.com/bucket/xray_images/chest.png",
    )
    .with_user(Some("doctor@clinic.org".to_string()))
}

#[test]
fn test_document_field_names() {
    let doc = record_to_document(&record());
    let fields = &doc["fields"];

    assert_eq!(fields["filename"]["stringValue"], "chest.png");
    assert_eq!(fields["prediction"]["stringValue"], "PNEUMONIA");
    assert_eq!(fields["confidence"]["doubleValue"], 0.875);
    assert_eq!(
        fields["timestamp"]["timestampValue"],
        "2025-06-02T09:30:00.000000Z"
    );
    assert_eq!(fields["user_email"]["stringValue"], "doctor@clinic.org");
}

#[test]
fn test_document_from_firestore() {
    let doc = json!({
        "name": "projects/p/databases/(default)/documents/predictions/abc123",
        "fields": {
            "filename": { "stringValue": "lung.jpg" },
            "prediction": { "stringValue": "NORMAL" },
            "confidence": { "integerValue": "1" },
            "timestamp": { "timestampValue": "2025-06-02T09:30:00.123Z" },
            "image_url": { "stringValue": "https://example.com/lung.jpg" }
        }
    });

    let record = document_to_record(&doc).unwrap();
    assert_eq!(record.id.as_deref(), Some("abc123"));
    assert_eq!(record.label, Label::Normal);
    assert_eq!(record.confidence, 1.0);
    assert!(record.user_email.is_none());
}

#[test]
fn test_document_with_unknown_label() {
    let mut doc = record_to_document(&record());
    doc["fields"]["prediction"] = json!({ "stringValue": "COVID" });
    assert!(matches!(
        document_to_record(&doc),
        Err(DatabaseError::SerializationError(_))
    ));
}

#[tokio::test]
async fn test_mock_store_rejects_incomplete_record() {
    let store = MockRecordStore::new("predictions");
    let mut incomplete = record();
    incomplete.image_url.clear();

    assert!(matches!(
        store.insert(&incomplete, None).await,
        Err(DatabaseError::InvalidRecord(_))
    ));
    assert!(store.is_empty().await);

    let id = store.insert(&record(), None).await.unwrap();
    assert_eq!(store.all().await[0].id.as_deref(), Some(id.as_str()));
}

#[test]
fn test_document_without_confidence_reads_as_zero() {
    let mut doc = record_to_document(&record());
    doc["fields"]
        .as_object_mut()
        .unwrap()
        .remove("confidence");

    let decoded = document_to_record(&doc).unwrap();
    assert_eq!(decoded.confidence, 0.0);
    assert_eq!(decoded.file_name, "chest.png");
    assert_eq!(decoded.label, Label::Pneumonia);
}
