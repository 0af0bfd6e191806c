/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use serde::Deserialize;

use crate::error;
use crate::types::{Headers, TemplateRenderer};
use crate::DEFAULT_REGION;

pub(crate) mod loader;

/// Configuration for a batch of transfers.
///
/// A `Config` is built once per batch and never mutated while the batch runs. Individual
/// transfer declarations derive their own effective configuration with [`Config::merge`].
#[derive(Clone)]
pub struct Config {
    endpoint: Option<String>,
    port: Option<u16>,
    region: String,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    bucket: Option<String>,
    secure: bool,
    access: Option<String>,
    headers: Headers,
    max_operations: Option<usize>,
    debug: bool,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Host name of the storage endpoint, `None` for the default AWS endpoint
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Port of the storage endpoint
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Region used to sign requests
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Access key ID
    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    /// Secret access key
    pub fn secret_access_key(&self) -> Option<&str> {
        self.secret_access_key.as_deref()
    }

    /// Bucket all keys are relative to
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Whether to connect with TLS
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Default canned ACL for uploads
    pub fn access(&self) -> Option<&str> {
        self.access.as_deref()
    }

    /// Default request headers for uploads and copies
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Maximum number of transfers in flight at once. `None` means unbounded.
    pub fn max_operations(&self) -> Option<usize> {
        self.max_operations.filter(|n| *n > 0)
    }

    /// When set no network operations are performed and transfers report success
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// URL of the configured endpoint, e.g. `http://127.0.0.1:1337`
    pub fn endpoint_url(&self) -> Option<String> {
        let host = self.endpoint.as_deref()?;
        let scheme = if self.secure { "https" } else { "http" };
        Some(match self.port {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        })
    }

    /// Shallow merge `overrides` over this config; every field set in `overrides` wins.
    pub fn merge(&self, overrides: &TransferOverrides) -> Config {
        let mut merged = self.clone();
        if let Some(key) = &overrides.key {
            merged.access_key_id = Some(key.clone());
        }
        if let Some(secret) = &overrides.secret {
            merged.secret_access_key = Some(secret.clone());
        }
        if let Some(bucket) = &overrides.bucket {
            merged.bucket = Some(bucket.clone());
        }
        if let Some(endpoint) = &overrides.endpoint {
            merged.endpoint = Some(endpoint.clone());
        }
        if let Some(port) = overrides.port {
            merged.port = Some(port);
        }
        if let Some(region) = &overrides.region {
            merged.region = region.clone();
        }
        if let Some(secure) = overrides.secure {
            merged.secure = secure;
        }
        if let Some(access) = &overrides.access {
            merged.access = Some(access.clone());
        }
        if let Some(headers) = &overrides.headers {
            merged.headers = headers.clone();
        }
        if let Some(max_operations) = overrides.max_operations {
            merged.max_operations = Some(max_operations);
        }
        if let Some(debug) = overrides.debug {
            merged.debug = debug;
        }
        merged
    }

    /// Run the bucket and credential fields through `renderer`
    pub(crate) fn render(mut self, renderer: &TemplateRenderer) -> Config {
        for field in [
            &mut self.access_key_id,
            &mut self.secret_access_key,
            &mut self.bucket,
        ] {
            if let Some(value) = field.as_mut() {
                *value = renderer.render(value);
            }
        }
        self
    }

    /// Check the fields every transfer needs are present
    pub fn validate(&self) -> Result<(), error::Error> {
        let missing = [
            ("key", self.access_key_id.as_deref()),
            ("secret", self.secret_access_key.as_deref()),
            ("bucket", self.bucket.as_deref()),
        ]
        .into_iter()
        .filter(|(_, value)| value.map_or(true, str::is_empty))
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(error::invalid_input(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Builder::default().build()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "** redacted **"),
            )
            .field("bucket", &self.bucket)
            .field("secure", &self.secure)
            .field("access", &self.access)
            .field("headers", &self.headers)
            .field("max_operations", &self.max_operations)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    endpoint: Option<String>,
    port: Option<u16>,
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    bucket: Option<String>,
    secure: Option<bool>,
    access: Option<String>,
    headers: Headers,
    max_operations: Option<usize>,
    debug: bool,
}

impl Builder {
    /// Host name of an S3 compatible endpoint.
    ///
    /// Default is the AWS endpoint for the configured region.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Port of the storage endpoint
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Region used to sign requests. Default is `us-east-1`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Access key ID
    pub fn access_key_id(self, key: impl Into<String>) -> Self {
        self.set_access_key_id(Some(key.into()))
    }

    /// Access key ID
    pub fn set_access_key_id(mut self, key: Option<String>) -> Self {
        self.access_key_id = key;
        self
    }

    /// Access key ID, if set
    pub fn get_access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    /// Secret access key
    pub fn secret_access_key(self, secret: impl Into<String>) -> Self {
        self.set_secret_access_key(Some(secret.into()))
    }

    /// Secret access key
    pub fn set_secret_access_key(mut self, secret: Option<String>) -> Self {
        self.secret_access_key = secret;
        self
    }

    /// Secret access key, if set
    pub fn get_secret_access_key(&self) -> Option<&str> {
        self.secret_access_key.as_deref()
    }

    /// Bucket all keys are relative to
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Whether to connect with TLS. Default is `true`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Default canned ACL sent as `x-amz-acl` with uploads
    pub fn access(mut self, access: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self
    }

    /// Default request headers for uploads and copies
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Maximum number of transfers in flight at once.
    ///
    /// `0` means unbounded, which is also the default.
    pub fn max_operations(mut self, max_operations: usize) -> Self {
        self.max_operations = Some(max_operations);
        self
    }

    /// Report transfers without performing them
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Consumes the builder and constructs a [`Config`]
    pub fn build(self) -> Config {
        Config {
            endpoint: self.endpoint,
            port: self.port,
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            bucket: self.bucket,
            secure: self.secure.unwrap_or(true),
            access: self.access,
            headers: self.headers,
            max_operations: self.max_operations,
            debug: self.debug,
        }
    }
}

/// Configuration fields a batch or an individual transfer declaration may set.
///
/// Every field that is present replaces the corresponding [`Config`] field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOverrides {
    /// Access key ID
    pub key: Option<String>,
    /// Secret access key
    pub secret: Option<String>,
    /// Bucket
    pub bucket: Option<String>,
    /// Endpoint host name
    pub endpoint: Option<String>,
    /// Endpoint port
    pub port: Option<u16>,
    /// Signing region
    pub region: Option<String>,
    /// Connect with TLS
    pub secure: Option<bool>,
    /// Canned ACL
    pub access: Option<String>,
    /// Request headers
    pub headers: Option<Headers>,
    /// Maximum transfers in flight
    pub max_operations: Option<usize>,
    /// Report transfers without performing them
    pub debug: Option<bool>,
}
