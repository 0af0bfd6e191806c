/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use core::fmt;
use std::collections::{btree_map, BTreeMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aws_smithy_types::error::display::DisplayErrorContext;
use serde::Deserialize;

/// Request headers keyed by lowercase header name.
///
/// Header names are case-insensitive on the wire; they are normalized on insertion so a
/// caller supplied `Content-Type` replaces a guessed `content-type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Headers {
    inner: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing value with the same (case-insensitive) name
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.inner
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Insert a header only when no value is present for the name
    pub fn insert_if_absent(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.inner
            .entry(name.as_ref().to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    /// Get the value of a header by (case-insensitive) name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether a header with the given name is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Copy every header from `other`, replacing values with the same name
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the header set is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(value: BTreeMap<String, String>) -> Self {
        value.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// A single concrete transfer.
///
/// Specs are produced by expanding the groups declared in a batch (or supplied directly)
/// and are executed by the matching transfer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSpec {
    /// Upload a local file to an object
    Upload(UploadSpec),
    /// Download an object to a local file
    Download(DownloadSpec),
    /// Server side copy of an object
    Copy(CopySpec),
    /// Delete an object
    Delete(DeleteSpec),
}

impl TransferSpec {
    /// Short description of the transfer used in log lines, e.g. `upload a.txt -> a.txt`
    pub fn describe(&self) -> String {
        match self {
            TransferSpec::Upload(spec) => {
                format!("upload {} -> {}", spec.source.display(), spec.key)
            }
            TransferSpec::Download(spec) => {
                format!("download {} -> {}", spec.key, spec.destination.display())
            }
            TransferSpec::Copy(spec) => format!("copy {} -> {}", spec.source, spec.key),
            TransferSpec::Delete(spec) => format!("delete {}", spec.key),
        }
    }
}

impl From<UploadSpec> for TransferSpec {
    fn from(value: UploadSpec) -> Self {
        TransferSpec::Upload(value)
    }
}

impl From<DownloadSpec> for TransferSpec {
    fn from(value: DownloadSpec) -> Self {
        TransferSpec::Download(value)
    }
}

impl From<CopySpec> for TransferSpec {
    fn from(value: CopySpec) -> Self {
        TransferSpec::Copy(value)
    }
}

impl From<DeleteSpec> for TransferSpec {
    fn from(value: DeleteSpec) -> Self {
        TransferSpec::Delete(value)
    }
}

/// Upload the local file at `source` to the object `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpec {
    /// Local path of the file to upload
    pub source: PathBuf,
    /// Object key relative to the bucket
    pub key: String,
    /// Request headers sent with the put
    pub headers: Headers,
    /// Gzip the file before upload
    pub gzip: bool,
    /// Canned ACL sent as `x-amz-acl`
    pub access: Option<String>,
    /// Skip the put when the backend already holds identical content
    pub sync: bool,
}

impl UploadSpec {
    /// Create a new upload of `source` to `key` with no extra options
    pub fn new(source: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
            headers: Headers::new(),
            gzip: false,
            access: None,
            sync: false,
        }
    }

    /// Local path of the file to upload
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Object key relative to the bucket
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Download the object `key` to the local path `destination`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSpec {
    /// Object key relative to the bucket
    pub key: String,
    /// Local path the object is written to
    pub destination: PathBuf,
}

impl DownloadSpec {
    /// Create a new download of `key` to `destination`
    pub fn new(key: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            destination: destination.into(),
        }
    }
}

/// Copy the object `source` to the object `key`
///
/// A `source` beginning with `/` is taken as a fully qualified `/bucket/key` reference,
/// anything else is a key in the configured bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    /// Object to copy from
    pub source: String,
    /// Object key to create
    pub key: String,
    /// Replacement metadata headers; when non-empty the copy replaces metadata
    pub headers: Headers,
}

impl CopySpec {
    /// Create a new copy from `source` to `key` that keeps the source metadata
    pub fn new(source: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
            headers: Headers::new(),
        }
    }
}

/// Delete the object `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSpec {
    /// Object key relative to the bucket
    pub key: String,
}

impl DeleteSpec {
    /// Create a new delete of `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// The result of executing one [`TransferSpec`]
#[derive(Debug)]
pub enum TransferOutcome {
    /// The transfer completed and was verified where verification applies
    Success {
        /// Human readable description of what was done
        message: String,
    },
    /// The transfer failed
    Failure {
        /// What went wrong
        error: crate::error::Error,
        /// The transfer that failed
        spec: TransferSpec,
    },
}

impl TransferOutcome {
    /// Whether the transfer succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    /// The success message, if the transfer succeeded
    pub fn message(&self) -> Option<&str> {
        match self {
            TransferOutcome::Success { message } => Some(message),
            TransferOutcome::Failure { .. } => None,
        }
    }

    /// The error, if the transfer failed
    pub fn error(&self) -> Option<&crate::error::Error> {
        match self {
            TransferOutcome::Success { .. } => None,
            TransferOutcome::Failure { error, .. } => Some(error),
        }
    }

    /// The failed transfer, if the transfer failed
    pub fn failed_spec(&self) -> Option<&TransferSpec> {
        match self {
            TransferOutcome::Success { .. } => None,
            TransferOutcome::Failure { spec, .. } => Some(spec),
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Success { message } => write!(f, "{message}"),
            TransferOutcome::Failure { error, spec } => {
                write!(f, "{} failed: {}", spec.describe(), DisplayErrorContext(error))
            }
        }
    }
}

/// Renders template strings found in paths, keys and credentials before use.
///
/// The default renderer returns its input unchanged.
#[derive(Clone)]
pub struct TemplateRenderer {
    pub(crate) render: Arc<dyn Fn(&str) -> String + Send + Sync + 'static>,
}

impl TemplateRenderer {
    pub(crate) fn render(&self, template: &str) -> String {
        (self.render)(template)
    }
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = f.debug_struct("TemplateRenderer");
        formatter.field("render", &"<closure>");
        formatter.finish()
    }
}

impl<F> From<F> for TemplateRenderer
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    fn from(value: F) -> Self {
        TemplateRenderer {
            render: Arc::new(value),
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self {
            render: Arc::new(|template| template.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert_if_absent("content-type", "application/json");
        assert_eq!(Some("text/plain"), headers.get("CONTENT-TYPE"));

        headers.insert("content-TYPE", "text/html");
        assert_eq!(1, headers.len());
        assert_eq!(Some("text/html"), headers.get("content-type"));
    }

    #[test]
    fn test_headers_deserialize_normalizes_names() {
        let headers: Headers =
            serde_json::from_str(r#"{"Cache-Control": "max-age=60", "X-Amz-Meta-Owner": "ci"}"#)
                .unwrap();
        assert_eq!(
            vec![("cache-control", "max-age=60"), ("x-amz-meta-owner", "ci")],
            headers.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_default_renderer_is_identity() {
        let renderer = TemplateRenderer::default();
        assert_eq!("<%= bucket %>", renderer.render("<%= bucket %>"));

        let renderer = TemplateRenderer::from(|s: &str| s.replace("{env}", "prod"));
        assert_eq!("prod/app.js", renderer.render("{env}/app.js"));
    }

    #[test]
    fn test_failure_outcome_display() {
        let outcome = TransferOutcome::Failure {
            error: crate::error::not_found(Path::new("missing.txt")),
            spec: TransferSpec::Upload(UploadSpec::new("missing.txt", "missing.txt")),
        };
        assert!(!outcome.is_success());
        let line = outcome.to_string();
        assert!(line.starts_with("upload missing.txt -> missing.txt failed"), "{line}");
        assert!(line.contains("file not found"), "{line}");
    }
}
