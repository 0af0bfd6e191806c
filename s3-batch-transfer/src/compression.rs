/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Gzip transform for uploads.
//!
//! The source file is compressed into a sibling temp file (`<path>.gz`, then `<path>.0.gz`,
//! `<path>.1.gz`, ...) which is uploaded in place of the original and removed afterwards.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::types::Headers;

/// Temp file holding the compressed bytes of an upload source.
///
/// The file name is reserved on creation, so concurrent uploads of the same source
/// never share a temp file. Callers must [`remove`](TempFile::remove) it once done.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Reserve the first free temp path for `src`.
    pub async fn reserve(src: &Path) -> io::Result<TempFile> {
        let mut attempt = None;
        loop {
            let candidate = candidate_path(src, attempt);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(_) => {
                    tracing::trace!("reserved temp file {}", candidate.display());
                    return Ok(TempFile { path: candidate });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    attempt = Some(attempt.map_or(0, |n| n + 1));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Path of the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the temp file. Failures are logged, a missing file is ignored.
    pub async fn remove(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::trace!("removed temp file {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                "failed to remove temp file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

fn candidate_path(src: &Path, attempt: Option<usize>) -> PathBuf {
    let mut name = OsString::from(src.as_os_str());
    match attempt {
        None => name.push(".gz"),
        Some(n) => name.push(format!(".{n}.gz")),
    }
    PathBuf::from(name)
}

/// Set the headers describing a gzip encoded upload of `src`.
///
/// `content-type` is guessed from the original file name unless the caller already set one.
pub fn apply_gzip_headers(src: &Path, headers: &mut Headers) {
    headers.insert("content-encoding", "gzip");
    headers.insert_if_absent(
        "content-type",
        mime_guess::from_path(src).first_or_octet_stream().to_string(),
    );
}

/// Stream `src` through a gzip encoder into `temp`.
///
/// On failure the temp file may hold partial output; the caller still owns its removal.
pub async fn compress(src: &Path, temp: &TempFile) -> io::Result<()> {
    let src = src.to_path_buf();
    let dest = temp.path().to_path_buf();
    tokio::task::spawn_blocking(move || -> io::Result<()> {
        let mut input = std::fs::File::open(&src)?;
        let output = std::fs::File::create(&dest)?;
        let mut encoder = GzEncoder::new(io::BufWriter::new(output), Compression::default());
        let bytes = io::copy(&mut input, &mut encoder)?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        tracing::debug!(
            "compressed {} ({bytes} bytes) into {}",
            src.display(),
            dest.display()
        );
        Ok(())
    })
    .await
    .map_err(io::Error::other)?
}
