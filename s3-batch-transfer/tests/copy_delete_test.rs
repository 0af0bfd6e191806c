/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use s3_batch_transfer::error::ErrorKind;
use s3_batch_transfer::types::{CopySpec, DeleteSpec};
use s3_batch_transfer::{Client, Config};
use test_common::{Fault, InMemoryStorage, Op};

fn test_config() -> Config {
    Config::builder()
        .access_key_id("abc")
        .secret_access_key("def")
        .bucket("test")
        .build()
}

#[tokio::test]
async fn test_copy_within_bucket() {
    let storage = InMemoryStorage::new();
    storage.insert("test", "src.txt", &b"abc"[..]);
    let client = Client::new(storage.clone());

    let outcome = client
        .execute(&test_config(), CopySpec::new("src.txt", "dst.txt"))
        .await;

    assert_eq!(Some("Copied: src.txt to dst.txt"), outcome.message());
    assert_eq!(Some(&b"abc"[..]), storage.object("test", "dst.txt").as_deref());

    let request = &storage.requests()[0];
    assert_eq!(Some("/test/src.txt"), request.headers.get("x-amz-copy-source"));
    assert_eq!(Some("0"), request.headers.get("content-length"));
    assert!(!request.headers.contains("x-amz-metadata-directive"));
}

#[tokio::test]
async fn test_copy_from_other_bucket_replacing_metadata() {
    let storage = InMemoryStorage::new();
    storage.insert("other", "src.txt", &b"abc"[..]);
    let client = Client::new(storage.clone());

    let mut spec = CopySpec::new("/other/src.txt", "dst.txt");
    spec.headers.insert("Content-Type", "text/plain");
    let outcome = client.execute(&test_config(), spec).await;
    assert!(outcome.is_success(), "{outcome}");
    assert!(storage.object("test", "dst.txt").is_some());

    let request = &storage.requests()[0];
    assert_eq!(Some("/other/src.txt"), request.headers.get("x-amz-copy-source"));
    assert_eq!(Some("REPLACE"), request.headers.get("x-amz-metadata-directive"));
    assert_eq!(Some("text/plain"), request.headers.get("content-type"));
}

#[tokio::test]
async fn test_copy_source_key_is_percent_encoded() {
    let storage = InMemoryStorage::new();
    storage.insert("test", "reports/q1 2024+final.pdf", &b"pdf"[..]);
    let client = Client::new(storage.clone());

    let outcome = client
        .execute(
            &test_config(),
            CopySpec::new("reports/q1 2024+final.pdf", "latest.pdf"),
        )
        .await;
    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(Some(&b"pdf"[..]), storage.object("test", "latest.pdf").as_deref());

    let request = &storage.requests()[0];
    assert_eq!(
        Some("/test/reports/q1%202024%2Bfinal.pdf"),
        request.headers.get("x-amz-copy-source")
    );
}

#[tokio::test]
async fn test_copy_missing_source_fails() {
    let storage = InMemoryStorage::new();
    let client = Client::new(storage.clone());

    let outcome = client
        .execute(&test_config(), CopySpec::new("missing.txt", "dst.txt"))
        .await;

    assert_eq!(&ErrorKind::Copy, outcome.error().unwrap().kind());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_delete_object() {
    let storage = InMemoryStorage::new();
    storage.insert("test", "a.txt", &b"abc"[..]);
    let client = Client::new(storage.clone());

    let outcome = client.execute(&test_config(), DeleteSpec::new("a.txt")).await;

    assert_eq!(Some("Deleted: a.txt"), outcome.message());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_delete_requires_no_content_status() {
    let storage = InMemoryStorage::new();
    storage.fail(Op::Delete, "a.txt", Fault::Status(200));
    let client = Client::new(storage.clone());

    let outcome = client.execute(&test_config(), DeleteSpec::new("a.txt")).await;

    let err = outcome.error().unwrap();
    assert_eq!(&ErrorKind::Delete, err.kind());
    assert!(matches!(
        outcome.failed_spec(),
        Some(s3_batch_transfer::types::TransferSpec::Delete(spec)) if spec.key == "a.txt"
    ));
}
