/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Test helpers shared by the `s3-batch-transfer` integration tests.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use s3_batch_transfer::error::BoxError;
use s3_batch_transfer::storage::{ObjectResponse, StorageClient};
use s3_batch_transfer::types::Headers;
use s3_batch_transfer::Config;
use tempfile::{tempdir, TempDir};

/// Create a directory structure containing files with the given contents
///
/// Parent directories are created as needed.
pub fn create_test_dir<C: AsRef<[u8]>>(prefix: Option<&str>, files: &[(&str, C)]) -> TempDir {
    let temp_dir = match prefix {
        Some(prefix) => TempDir::with_prefix(prefix).unwrap(),
        None => tempdir().unwrap(),
    };

    for (path, contents) in files {
        let full_path = temp_dir.path().join(path);
        fs::create_dir_all(full_path.parent().unwrap()).unwrap();
        let mut file = fs::File::create(&full_path).unwrap();
        file.write_all(contents.as_ref()).unwrap();
    }

    temp_dir
}

/// Quoted MD5 entity tag, as S3 returns it for a single part object
pub fn etag_of(data: &[u8]) -> String {
    format!("\"{:x}\"", md5::compute(data))
}

/// Storage operations faults can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `put_object`
    Put,
    /// `get_object`
    Get,
    /// `copy_object`
    Copy,
    /// `delete_object`
    Delete,
    /// `head_object`
    Head,
}

/// A failure the in-memory backend produces instead of performing an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this status and do nothing
    Status(u16),
    /// Perform the operation but answer with this etag
    ETag(String),
    /// Fail without a response, like a dropped connection
    Transport,
    /// Serve the first half of the body, then fail the stream
    BodyError,
}

/// A request the in-memory backend received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The operation
    pub op: Op,
    /// Bucket the request was addressed to
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Request headers
    pub headers: Headers,
}

#[derive(Debug, Default)]
struct Inner {
    // (bucket, key) -> content
    objects: Mutex<HashMap<(String, String), Bytes>>,
    faults: Mutex<HashMap<(Op, String), Fault>>,
    requests: Mutex<Vec<Request>>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory [`StorageClient`] with S3 status semantics.
///
/// Entity tags are the quoted MD5 of the stored bytes. Every request is recorded, and the
/// peak number of concurrently running requests is tracked. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Inner>,
}

impl InMemoryStorage {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `bucket`/`key`
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        lock(&self.inner.objects).insert((bucket.to_owned(), key.to_owned()), data.into());
    }

    /// The bytes stored under `bucket`/`key`
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        lock(&self.inner.objects)
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
    }

    /// Number of stored objects across all buckets
    pub fn len(&self) -> usize {
        lock(&self.inner.objects).len()
    }

    /// Whether no objects are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `op` on `key` fail with `fault`
    pub fn fail(&self, op: Op, key: &str, fault: Fault) {
        lock(&self.inner.faults).insert((op, key.to_owned()), fault);
    }

    /// Delay every request by `latency` while it counts as in flight
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.inner.latency) = Some(latency);
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.inner.requests).clone()
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        lock(&self.inner.requests).len()
    }

    /// Peak number of requests in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, op: Op, config: &Config, key: &str, headers: &Headers) -> Call<'_> {
        lock(&self.inner.requests).push(Request {
            op,
            bucket: config.bucket().unwrap_or_default().to_owned(),
            key: key.to_owned(),
            headers: headers.clone(),
        });

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let call = Call { inner: &self.inner };

        let latency = *lock(&self.inner.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        call
    }

    fn fault(&self, op: Op, key: &str) -> Option<Fault> {
        lock(&self.inner.faults).get(&(op, key.to_owned())).cloned()
    }
}

/// Decrements the in-flight count when the request resolves
struct Call<'a> {
    inner: &'a Inner,
}

impl Drop for Call<'_> {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bucket_of(config: &Config) -> String {
    config.bucket().unwrap_or_default().to_owned()
}

/// Split a `/bucket/key` copy source, decoding the percent-encoded key
fn parse_copy_source(copy_source: &str) -> Option<(String, String)> {
    let (bucket, key) = copy_source.trim_start_matches('/').split_once('/')?;
    let key = urlencoding::decode(key).ok()?;
    Some((bucket.to_owned(), key.into_owned()))
}

#[async_trait]
impl StorageClient for InMemoryStorage {
    async fn put_object(
        &self,
        config: &Config,
        key: &str,
        body: Bytes,
        headers: &Headers,
    ) -> Result<ObjectResponse, BoxError> {
        let _call = self.begin(Op::Put, config, key, headers).await;
        let etag = match self.fault(Op::Put, key) {
            Some(Fault::Status(status)) => return Ok(ObjectResponse::new(status)),
            Some(Fault::Transport) => return Err("connection reset".into()),
            Some(Fault::ETag(etag)) => etag,
            _ => etag_of(&body),
        };
        self.insert(&bucket_of(config), key, body);
        Ok(ObjectResponse::new(200).with_header("etag", etag))
    }

    async fn get_object(&self, config: &Config, key: &str) -> Result<ObjectResponse, BoxError> {
        let _call = self.begin(Op::Get, config, key, &Headers::new()).await;
        let fault = self.fault(Op::Get, key);
        match &fault {
            Some(Fault::Status(status)) => return Ok(ObjectResponse::new(*status)),
            Some(Fault::Transport) => return Err("connection reset".into()),
            _ => {}
        }

        let Some(data) = self.object(&bucket_of(config), key) else {
            return Ok(ObjectResponse::new(404));
        };
        let etag = match &fault {
            Some(Fault::ETag(etag)) => etag.clone(),
            _ => etag_of(&data),
        };

        let body = if fault == Some(Fault::BodyError) {
            let half = data.slice(..data.len() / 2);
            futures_util::stream::iter(vec![Ok(half), Err(BoxError::from("stream truncated"))])
                .boxed()
        } else {
            // serve in small chunks so readers see a multi-chunk stream
            let chunks: Vec<Result<Bytes, BoxError>> = data
                .chunks(4)
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect();
            futures_util::stream::iter(chunks).boxed()
        };

        Ok(ObjectResponse::new(200)
            .with_header("etag", etag)
            .with_body(body))
    }

    async fn copy_object(
        &self,
        config: &Config,
        _source: &str,
        key: &str,
        headers: &Headers,
    ) -> Result<ObjectResponse, BoxError> {
        let _call = self.begin(Op::Copy, config, key, headers).await;
        match self.fault(Op::Copy, key) {
            Some(Fault::Status(status)) => return Ok(ObjectResponse::new(status)),
            Some(Fault::Transport) => return Err("connection reset".into()),
            _ => {}
        }

        let Some((src_bucket, src_key)) = headers
            .get("x-amz-copy-source")
            .and_then(parse_copy_source)
        else {
            return Ok(ObjectResponse::new(400));
        };
        let Some(data) = self.object(&src_bucket, &src_key) else {
            return Ok(ObjectResponse::new(404));
        };
        let etag = etag_of(&data);
        self.insert(&bucket_of(config), key, data);
        Ok(ObjectResponse::new(200).with_header("etag", etag))
    }

    async fn delete_object(
        &self,
        config: &Config,
        key: &str,
    ) -> Result<ObjectResponse, BoxError> {
        let _call = self.begin(Op::Delete, config, key, &Headers::new()).await;
        match self.fault(Op::Delete, key) {
            Some(Fault::Status(status)) => return Ok(ObjectResponse::new(status)),
            Some(Fault::Transport) => return Err("connection reset".into()),
            _ => {}
        }
        lock(&self.inner.objects).remove(&(bucket_of(config), key.to_owned()));
        Ok(ObjectResponse::new(204))
    }

    async fn head_object(&self, config: &Config, key: &str) -> Result<ObjectResponse, BoxError> {
        let _call = self.begin(Op::Head, config, key, &Headers::new()).await;
        match self.fault(Op::Head, key) {
            Some(Fault::Status(status)) => return Ok(ObjectResponse::new(status)),
            Some(Fault::Transport) => return Err("connection reset".into()),
            _ => {}
        }
        match self.object(&bucket_of(config), key) {
            Some(data) => Ok(ObjectResponse::new(200).with_header("etag", etag_of(&data))),
            None => Ok(ObjectResponse::new(404)),
        }
    }
}
