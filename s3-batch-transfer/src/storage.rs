/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The boundary between transfer operations and the object storage backend.
//!
//! A [`StorageClient`] issues exactly one remote request per call and passes the backend's
//! status code through untouched. Interpreting the status (e.g. `204` for a delete) is the
//! caller's job. Only failures that produced no status at all (connection errors, timeouts,
//! request construction failures) are returned as `Err`.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::BoxError;
use crate::types::Headers;
use crate::Config;

mod s3;
pub use s3::S3StorageClient;

/// Request header naming the object a copy reads from
pub(crate) const COPY_SOURCE_HEADER: &str = "x-amz-copy-source";

/// Request header selecting whether a copy keeps or replaces the source metadata
pub(crate) const METADATA_DIRECTIVE_HEADER: &str = "x-amz-metadata-directive";

/// Streaming body of a get object response
pub type ObjectBody = BoxStream<'static, Result<Bytes, BoxError>>;

/// Storage backend speaking an S3 compatible API.
///
/// Every call takes the effective [`Config`] of the transfer it serves, so a single client
/// may talk to several endpoints or buckets within one batch.
#[async_trait]
pub trait StorageClient: Send + Sync + fmt::Debug {
    /// Store `body` under `key`
    async fn put_object(
        &self,
        config: &Config,
        key: &str,
        body: Bytes,
        headers: &Headers,
    ) -> Result<ObjectResponse, BoxError>;

    /// Fetch the object stored under `key`
    async fn get_object(&self, config: &Config, key: &str) -> Result<ObjectResponse, BoxError>;

    /// Server side copy of `source` to `key`.
    ///
    /// `headers` carries `x-amz-copy-source` and, when metadata should be replaced rather than
    /// copied, `x-amz-metadata-directive: REPLACE` alongside the replacement headers.
    async fn copy_object(
        &self,
        config: &Config,
        source: &str,
        key: &str,
        headers: &Headers,
    ) -> Result<ObjectResponse, BoxError>;

    /// Delete the object stored under `key`
    async fn delete_object(&self, config: &Config, key: &str)
        -> Result<ObjectResponse, BoxError>;

    /// Fetch the headers of the object stored under `key` without its body
    async fn head_object(&self, config: &Config, key: &str) -> Result<ObjectResponse, BoxError>;
}

/// Response to a single storage request
pub struct ObjectResponse {
    status: u16,
    headers: Headers,
    body: Option<ObjectBody>,
}

impl ObjectResponse {
    /// Create a response with the given status and no headers or body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Add a response header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a response body
    pub fn with_body(mut self, body: ObjectBody) -> Self {
        self.body = Some(body);
        self
    }

    /// HTTP status code returned by the backend
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the `2xx` range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw `etag` header, still wrapped in quotes
    pub fn etag(&self) -> Option<&str> {
        self.headers.get("etag")
    }

    /// Take the response body, leaving `None` behind
    pub fn take_body(&mut self) -> Option<ObjectBody> {
        self.body.take()
    }
}

impl fmt::Debug for ObjectResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}
