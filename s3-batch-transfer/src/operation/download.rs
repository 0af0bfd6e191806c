/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::checksum::{self, ContentHasher};
use crate::error::{self, ChecksumMismatch, ErrorKind};
use crate::storage::StorageClient;
use crate::types::{DownloadSpec, TransferSpec};
use crate::Config;

/// Download the object described by `spec` to its local destination and verify the written
/// bytes against the object's etag.
///
/// The destination file is created before the request is sent. If the download fails the
/// (possibly partial) file is removed again. In debug mode nothing is written.
#[tracing::instrument(skip_all, level = "debug", fields(key = %spec.key, destination = %spec.destination.display()))]
pub async fn download(
    storage: &dyn StorageClient,
    config: &Config,
    spec: &DownloadSpec,
) -> Result<String, error::Error> {
    if config.debug() {
        return Ok(crate::operation::dry_run_message(&TransferSpec::Download(
            spec.clone(),
        )));
    }

    let file = fs::File::create(&spec.destination)
        .await
        .map_err(error::for_target(ErrorKind::Download, spec.key.clone()))?;

    let result = receive(storage, config, spec, file).await;
    if result.is_err() {
        remove_partial(&spec.destination).await;
    }
    result
}

async fn receive(
    storage: &dyn StorageClient,
    config: &Config,
    spec: &DownloadSpec,
    mut file: fs::File,
) -> Result<String, error::Error> {
    let key = spec.key.as_str();
    let mut resp = storage
        .get_object(config, key)
        .await
        .map_err(error::for_target(ErrorKind::Download, key))?;
    if !resp.is_success() {
        return Err(error::unexpected_status(
            ErrorKind::Download,
            key,
            resp.status(),
        ));
    }

    let mut hasher = ContentHasher::new();
    if let Some(mut body) = resp.take_body() {
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(error::for_target(ErrorKind::Download, key))?;
            file.write_all(&chunk)
                .await
                .map_err(error::for_target(ErrorKind::Download, key))?;
            hasher.update(&chunk);
        }
    }
    file.flush()
        .await
        .map_err(error::for_target(ErrorKind::Download, key))?;
    drop(file);

    let local_hash = hasher.finalize();
    let remote_hash = checksum::strip_etag(resp.etag().unwrap_or_default());
    if remote_hash != local_hash {
        return Err(error::checksum_mismatch(ChecksumMismatch::new(
            local_hash,
            remote_hash,
            key,
        )));
    }

    Ok(format!("Downloaded: {key} ({local_hash})"))
}

async fn remove_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        tracing::debug!("failed to remove {}: {err}", path.display());
    }
}
