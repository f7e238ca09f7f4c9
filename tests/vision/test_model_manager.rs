// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use medical_classifier::firebase::{MockObjectStorage, ObjectStorage};
use medical_classifier::vision::{
    fetch_model_artifact, write_model_file, ClassifierModelConfig, ClassifierModelManager,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_fetch_model_artifact_writes_file() {
    let dir = TempDir::new().unwrap();
    let storage = MockObjectStorage::new("weights-bucket");
    storage
        .upload("models/net.onnx", vec![7u8; 2048], "application/octet-stream", None)
        .await
        .unwrap();

    let dest = dir.path().join("cache").join("net.onnx");
    let written = fetch_model_artifact(&storage, "models/net.onnx", &dest)
        .await
        .unwrap();

    assert_eq!(written, 2048);
    assert_eq!(std::fs::read(&dest).unwrap().len(), 2048);
    assert!(!dest.with_extension("part").exists());
}

#[tokio::test]
async fn test_fetch_missing_object_fails() {
    let dir = TempDir::new().unwrap();
    let storage = MockObjectStorage::new("weights-bucket");

    let result = fetch_model_artifact(&storage, "models/absent.onnx", &dir.path().join("x.onnx")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_manager_without_weights_has_no_classifier() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(MockObjectStorage::new("weights-bucket"));

    let config = ClassifierModelConfig {
        model_path: dir.path().join("missing.onnx"),
        remote_object: Some("models/missing.onnx".to_string()),
        cache_dir: dir.path().to_path_buf(),
    };
    let manager = ClassifierModelManager::new(config, Some(storage as Arc<dyn ObjectStorage>))
        .await
        .unwrap();

    assert!(!manager.has_classifier());
    let info = manager.model_info();
    assert!(!info.available);
    assert_eq!(info.labels, vec!["NORMAL", "PNEUMONIA"]);
}

#[tokio::test]
async fn test_write_model_file_replaces_and_digests() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested").join("net.onnx");

    write_model_file(&dest, b"old weights").await.unwrap();
    let digest = write_model_file(&dest, b"abc").await.unwrap();

    assert_eq!(
        digest,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    assert!(!dest.with_extension("part").exists());
}
