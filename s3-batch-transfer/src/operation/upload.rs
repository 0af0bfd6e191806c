/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::Path;

use bytes::Bytes;

use crate::checksum;
use crate::compression::{self, TempFile};
use crate::error::{self, ChecksumMismatch, ErrorKind};
use crate::storage::StorageClient;
use crate::types::{Headers, TransferSpec, UploadSpec};
use crate::Config;

const ACL_HEADER: &str = "x-amz-acl";

/// Upload the local file described by `spec` and verify the backend stored the exact bytes
/// that were sent.
///
/// When `spec.gzip` is set the file is compressed into a temp file first and the compressed
/// bytes are sent and verified. The temp file is removed before this function returns,
/// whatever the outcome.
#[tracing::instrument(skip_all, level = "debug", fields(source = %spec.source.display(), key = %spec.key))]
pub async fn upload(
    storage: &dyn StorageClient,
    config: &Config,
    spec: &UploadSpec,
) -> Result<String, error::Error> {
    if config.debug() {
        return Ok(crate::operation::dry_run_message(&TransferSpec::Upload(spec.clone())));
    }

    let source = spec.source();
    if !tokio::fs::try_exists(source).await.unwrap_or(false) {
        return Err(error::not_found(source));
    }

    let mut headers = request_headers(spec);
    if !spec.gzip {
        return send(storage, config, spec, source, &headers).await;
    }

    compression::apply_gzip_headers(source, &mut headers);
    let temp = TempFile::reserve(source)
        .await
        .map_err(error::for_target(ErrorKind::Upload, source.display().to_string()))?;
    let result = match compression::compress(source, &temp).await {
        Ok(()) => send(storage, config, spec, temp.path(), &headers).await,
        Err(err) => Err(error::for_target(
            ErrorKind::Upload,
            source.display().to_string(),
        )(err)),
    };
    temp.remove().await;
    result
}

/// Headers sent with the put: the upload's headers plus the canned ACL, if any
fn request_headers(spec: &UploadSpec) -> Headers {
    let mut headers = spec.headers.clone();
    if let Some(access) = spec.access.as_deref() {
        headers.insert(ACL_HEADER, access);
    }
    headers
}

/// Send the bytes at `path` (the source or its compressed temp file) and verify the etag
async fn send(
    storage: &dyn StorageClient,
    config: &Config,
    spec: &UploadSpec,
    path: &Path,
    headers: &Headers,
) -> Result<String, error::Error> {
    let source = spec.source.display().to_string();
    let data = tokio::fs::read(path)
        .await
        .map_err(error::for_target(ErrorKind::Upload, source.clone()))?;
    let local_hash = checksum::hash(&data);

    if spec.sync && is_up_to_date(storage, config, &spec.key, &local_hash).await {
        tracing::debug!("{} is up to date, skipping upload", spec.key);
        return Ok(format!("Up to date: {source} ({local_hash})"));
    }

    let resp = storage
        .put_object(config, &spec.key, Bytes::from(data), headers)
        .await
        .map_err(error::for_target(ErrorKind::Upload, source.clone()))?;
    if !resp.is_success() {
        return Err(error::unexpected_status(
            ErrorKind::Upload,
            source,
            resp.status(),
        ));
    }

    let remote_hash = checksum::strip_etag(resp.etag().unwrap_or_default());
    if remote_hash != local_hash {
        return Err(error::checksum_mismatch(ChecksumMismatch::new(
            local_hash,
            remote_hash,
            source,
        )));
    }

    Ok(format!("Uploaded: {source} ({local_hash})"))
}

/// Whether the backend already holds an object under `key` with the digest `local_hash`.
///
/// Any failure to find out is treated as "not up to date".
async fn is_up_to_date(
    storage: &dyn StorageClient,
    config: &Config,
    key: &str,
    local_hash: &str,
) -> bool {
    match storage.head_object(config, key).await {
        Ok(resp) if resp.is_success() => resp
            .etag()
            .is_some_and(|etag| checksum::strip_etag(etag) == local_hash),
        Ok(resp) => {
            tracing::trace!("head {key} returned {}", resp.status());
            false
        }
        Err(err) => {
            tracing::debug!("head {key} failed: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_add_acl() {
        let mut spec = UploadSpec::new("a.txt", "a.txt");
        spec.headers = [("Cache-Control", "max-age=60")].into_iter().collect();
        spec.access = Some("public-read".to_owned());

        let headers = request_headers(&spec);
        assert_eq!(Some("public-read"), headers.get(ACL_HEADER));
        assert_eq!(Some("max-age=60"), headers.get("cache-control"));
    }

    #[test]
    fn test_request_headers_without_acl() {
        let spec = UploadSpec::new("a.txt", "a.txt");
        assert!(request_headers(&spec).is_empty());
    }
}
