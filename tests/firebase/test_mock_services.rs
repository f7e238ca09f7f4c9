// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use medical_classifier::firebase::{
    AuthError, AuthProvider, MockAuthProvider, MockObjectStorage, ObjectStorage, StorageError,
};

#[tokio::test]
async fn test_mock_auth_round_trip() {
    let auth = MockAuthProvider::new();

    let created = auth.sign_up("Doctor@Clinic.org", "longenough").await.unwrap();
    assert_eq!(created.email, "doctor@clinic.org");

    let session = auth.sign_in("doctor@clinic.org", "longenough").await.unwrap();
    assert_eq!(session.user_id, created.user_id);
    assert_ne!(session.id_token, created.id_token);

    assert!(matches!(
        auth.sign_in("doctor@clinic.org", "nope").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.sign_in("nobody@clinic.org", "longenough").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.sign_up("not-an-email", "longenough").await,
        Err(AuthError::InvalidEmail(_))
    ));
}

#[tokio::test]
async fn test_mock_storage_upload_download() {
    let storage = MockObjectStorage::new("xray-demo.appspot.com");

    let stored = storage
        .upload("test/test_upload.txt", b"Hello Firebase!".to_vec(), "text/plain", None)
        .await
        .unwrap();

    assert_eq!(stored.size, 15);
    assert_eq!(
        stored.public_url,
        "https://storage.googleapis.com/xray-demo.appspot.com/test/test_upload.txt"
    );
    assert_eq!(
        storage.download("test/test_upload.txt", None).await.unwrap(),
        b"Hello Firebase!"
    );
    assert!(matches!(
        storage.download("test/other.txt", None).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_mock_storage_rejects_bad_paths() {
    let storage = MockObjectStorage::new("bucket");

    for path in ["", "/absolute.png", "a/../b.png"] {
        assert!(
            storage.upload(path, vec![1], "image/png", None).await.is_err(),
            "path {:?} accepted",
            path
        );
    }
    assert_eq!(storage.object_count().await, 0);
}

#[tokio::test]
async fn test_injected_error_fires_once() {
    let storage = MockObjectStorage::new("bucket");
    storage
        .inject_error(StorageError::ServerError("boom".into()))
        .await;

    assert!(storage.upload("a.png", vec![1], "image/png", None).await.is_err());
    assert!(storage.upload("a.png", vec![1], "image/png", None).await.is_ok());
}
