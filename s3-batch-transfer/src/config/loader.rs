/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::Builder;
use crate::types::Headers;
use crate::Config;

const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Load batch [`Config`] from the environment.
///
/// Credentials set explicitly on the loader win over `AWS_ACCESS_KEY_ID` and
/// `AWS_SECRET_ACCESS_KEY`.
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
}

impl ConfigLoader {
    /// Host name of an S3 compatible endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.builder = self.builder.endpoint(endpoint);
        self
    }

    /// Port of the storage endpoint
    pub fn port(mut self, port: u16) -> Self {
        self.builder = self.builder.port(port);
        self
    }

    /// Region used to sign requests
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.builder = self.builder.region(region);
        self
    }

    /// Access key ID
    pub fn access_key_id(mut self, key: impl Into<String>) -> Self {
        self.builder = self.builder.access_key_id(key);
        self
    }

    /// Secret access key
    pub fn secret_access_key(mut self, secret: impl Into<String>) -> Self {
        self.builder = self.builder.secret_access_key(secret);
        self
    }

    /// Bucket all keys are relative to
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.builder = self.builder.bucket(bucket);
        self
    }

    /// Whether to connect with TLS
    pub fn secure(mut self, secure: bool) -> Self {
        self.builder = self.builder.secure(secure);
        self
    }

    /// Default canned ACL for uploads
    pub fn access(mut self, access: impl Into<String>) -> Self {
        self.builder = self.builder.access(access);
        self
    }

    /// Default request headers for uploads and copies
    pub fn headers(mut self, headers: Headers) -> Self {
        self.builder = self.builder.headers(headers);
        self
    }

    /// Maximum number of transfers in flight at once, `0` for unbounded
    pub fn max_operations(mut self, max_operations: usize) -> Self {
        self.builder = self.builder.max_operations(max_operations);
        self
    }

    /// Report transfers without performing them
    pub fn debug(mut self, debug: bool) -> Self {
        self.builder = self.builder.debug(debug);
        self
    }

    /// Load the configuration.
    ///
    /// If fields have been overridden during loader construction, the override values will be
    /// used. Otherwise credentials are read from the process environment.
    pub fn load(self) -> Config {
        self.load_from(|name| std::env::var(name).ok())
    }

    fn load_from(self, lookup: impl Fn(&str) -> Option<String>) -> Config {
        let mut builder = self.builder;
        if builder.get_access_key_id().is_none() {
            builder = builder.set_access_key_id(lookup(ACCESS_KEY_ID_VAR));
        }
        if builder.get_secret_access_key().is_none() {
            builder = builder.set_secret_access_key(lookup(SECRET_ACCESS_KEY_VAR));
        }
        builder.build()
    }
}
