/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::PathBuf;

use serde::Deserialize;

use crate::config::TransferOverrides;

/// Declarative description of a batch.
///
/// Deserializes from the JSON batch document:
///
/// ```json
/// {
///   "key": "...", "secret": "...", "bucket": "assets",
///   "maxOperations": 4,
///   "upload":   [{ "src": "dist/**/*.js", "dest": "js/", "rel": "dist", "gzip": true }],
///   "download": [{ "src": "js/app.js", "dest": "backup/app.js" }],
///   "del":      [{ "src": "js/old.js" }],
///   "copy":     [{ "src": "js/app.js", "dest": "js/app.v2.js" }]
/// }
/// ```
///
/// Top level configuration fields override the base [`Config`](crate::Config); fields set on
/// an individual group override both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchInput {
    /// Batch wide configuration overrides
    #[serde(flatten)]
    pub options: TransferOverrides,
    /// Upload groups
    #[serde(default)]
    pub upload: Vec<UploadGroup>,
    /// Download groups
    #[serde(default)]
    pub download: Vec<DownloadGroup>,
    /// Delete groups
    #[serde(default, alias = "delete")]
    pub del: Vec<DeleteGroup>,
    /// Copy groups
    #[serde(default)]
    pub copy: Vec<CopyGroup>,
}

impl BatchInput {
    /// Parse a JSON batch document
    pub fn from_json(json: &str) -> Result<Self, crate::error::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the batch declares no transfers at all
    pub fn is_empty(&self) -> bool {
        self.upload.is_empty()
            && self.download.is_empty()
            && self.del.is_empty()
            && self.copy.is_empty()
    }
}

/// Upload every file matching the `src` pattern under `dest`
///
/// Only existing regular files match. A pattern that matches nothing, including a literal
/// path to a missing file, yields no transfers and a warning rather than a failed outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadGroup {
    /// File pattern, e.g. `dist/*.js`
    pub src: String,
    /// Object key (single file) or key prefix (several files)
    #[serde(default)]
    pub dest: String,
    /// Directory pattern whose first match is the root that file keys are made relative to
    #[serde(default)]
    pub rel: Option<String>,
    /// Gzip each file before upload
    #[serde(default)]
    pub gzip: bool,
    /// Skip files the backend already holds with identical content
    #[serde(default)]
    pub sync: bool,
    /// Configuration overrides for this group
    #[serde(flatten)]
    pub options: TransferOverrides,
}

impl UploadGroup {
    /// Upload files matching `src` to `dest`
    pub fn new(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            ..Default::default()
        }
    }

    /// Keep the directory structure below the first directory matching `rel`
    pub fn rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    /// Gzip each file before upload
    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Skip files the backend already holds with identical content
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Configuration overrides for this group
    pub fn options(mut self, options: TransferOverrides) -> Self {
        self.options = options;
        self
    }
}

/// Download the object `src` to the local path `dest`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DownloadGroup {
    /// Object key
    pub src: String,
    /// Local path
    pub dest: PathBuf,
    /// Configuration overrides for this group
    #[serde(flatten)]
    pub options: TransferOverrides,
}

impl DownloadGroup {
    /// Download `src` to `dest`
    pub fn new(src: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            options: TransferOverrides::default(),
        }
    }

    /// Configuration overrides for this group
    pub fn options(mut self, options: TransferOverrides) -> Self {
        self.options = options;
        self
    }
}

/// Copy the object `src` to `dest`.
///
/// `headers` in the overrides replace the object metadata instead of copying it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CopyGroup {
    /// Object key, or `/bucket/key` for an object in another bucket
    pub src: String,
    /// Object key to create
    pub dest: String,
    /// Configuration overrides for this group
    #[serde(flatten)]
    pub options: TransferOverrides,
}

impl CopyGroup {
    /// Copy `src` to `dest`
    pub fn new(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            options: TransferOverrides::default(),
        }
    }

    /// Configuration overrides for this group
    pub fn options(mut self, options: TransferOverrides) -> Self {
        self.options = options;
        self
    }
}

/// Delete the object `src`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteGroup {
    /// Object key
    pub src: String,
    /// Configuration overrides for this group
    #[serde(flatten)]
    pub options: TransferOverrides,
}

impl DeleteGroup {
    /// Delete `src`
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            options: TransferOverrides::default(),
        }
    }

    /// Configuration overrides for this group
    pub fn options(mut self, options: TransferOverrides) -> Self {
        self.options = options;
        self
    }
}
