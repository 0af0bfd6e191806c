/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::path::{Path, PathBuf};

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: Use [`aws_smithy_types::error::display::DisplayErrorContext`] or similar to display
/// the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of transfer errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A local source file does not exist
    NotFound,

    /// Transmitting an object failed or the backend rejected it
    Upload,

    /// Receiving an object failed or the backend rejected the request
    Download,

    /// Server side copy failed
    Copy,

    /// Deleting an object failed
    Delete,

    /// The local digest did not match the entity tag returned by the backend
    Checksum,

    /// Batch or operation input validation issues
    InputInvalid,

    /// I/O errors
    IOError,

    /// Some kind of internal runtime issue (e.g. a failed task)
    RuntimeError,
}

impl Error {
    /// Creates a new transfer [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::NotFound => write!(f, "file not found"),
            ErrorKind::Upload => write!(f, "upload error"),
            ErrorKind::Download => write!(f, "download error"),
            ErrorKind::Copy => write!(f, "copy error"),
            ErrorKind::Delete => write!(f, "delete error"),
            ErrorKind::Checksum => write!(f, "checksum mismatch"),
            ErrorKind::InputInvalid => write!(f, "invalid input"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::new(ErrorKind::InputInvalid, value)
    }
}

impl From<glob::PatternError> for Error {
    fn from(value: glob::PatternError) -> Self {
        Self::new(ErrorKind::InputInvalid, value)
    }
}

/// The backend answered with a status code the operation does not accept
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusError {
    target: String,
    status: u16,
}

impl StatusError {
    pub(crate) fn new(target: impl Into<String>, status: u16) -> Self {
        Self {
            target: target.into(),
            status,
        }
    }

    /// The HTTP status code returned by the backend
    pub fn status(&self) -> u16 {
        self.status
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.target, self.status)
    }
}

impl std::error::Error for StatusError {}

/// The local digest of transferred bytes differs from the backend's entity tag
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChecksumMismatch {
    expected: String,
    actual: String,
    target: String,
}

impl ChecksumMismatch {
    pub(crate) fn new(
        expected: impl Into<String>,
        actual: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            target: target.into(),
        }
    }

    /// Digest computed over the local bytes
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Quote-stripped entity tag returned by the backend
    pub fn actual(&self) -> &str {
        &self.actual
    }
}

impl fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected hash: {} but found {} for {}",
            self.expected, self.actual, self.target
        )
    }
}

impl std::error::Error for ChecksumMismatch {}

#[derive(Debug)]
struct FileNotFound(PathBuf);

impl fmt::Display for FileNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl std::error::Error for FileNotFound {}

/// Wraps a lower level failure with the transfer target it applied to
#[derive(Debug)]
struct TargetError {
    target: String,
    source: BoxError,
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

pub(crate) fn invalid_input<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InputInvalid, err)
}

pub(crate) fn not_found(path: &Path) -> Error {
    Error::new(ErrorKind::NotFound, FileNotFound(path.to_path_buf()))
}

pub(crate) fn checksum_mismatch(mismatch: ChecksumMismatch) -> Error {
    Error::new(ErrorKind::Checksum, mismatch)
}

/// Build an error of `kind` for a backend status the operation rejected
pub(crate) fn unexpected_status(kind: ErrorKind, target: impl Into<String>, status: u16) -> Error {
    Error::new(kind, StatusError::new(target, status))
}

/// Returns a closure that wraps an arbitrary failure of `target` as an error of `kind`
pub(crate) fn for_target<E>(kind: ErrorKind, target: impl Into<String>) -> impl FnOnce(E) -> Error
where
    E: Into<BoxError>,
{
    let target = target.into();
    move |err| {
        Error::new(
            kind,
            TargetError {
                target,
                source: err.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_smithy_types::error::display::DisplayErrorContext;

    #[test]
    fn test_status_error_display_includes_target_and_status() {
        let err = unexpected_status(ErrorKind::Delete, "old/file.txt", 403);
        assert_eq!(&ErrorKind::Delete, err.kind());
        let rendered = format!("{}", DisplayErrorContext(&err));
        assert!(rendered.contains("delete error"), "{rendered}");
        assert!(rendered.contains("old/file.txt (403)"), "{rendered}");
    }

    #[test]
    fn test_checksum_error_display() {
        let err = checksum_mismatch(ChecksumMismatch::new("abc", "def", "a.txt"));
        let rendered = format!("{}", DisplayErrorContext(&err));
        assert!(
            rendered.contains("expected hash: abc but found def for a.txt"),
            "{rendered}"
        );
    }

    #[test]
    fn test_for_target_keeps_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = for_target(ErrorKind::Upload, "a.txt")(io);
        assert_eq!(&ErrorKind::Upload, err.kind());
        let rendered = format!("{}", DisplayErrorContext(&err));
        assert!(rendered.contains("a.txt"), "{rendered}");
        assert!(rendered.contains("pipe closed"), "{rendered}");
    }
}
