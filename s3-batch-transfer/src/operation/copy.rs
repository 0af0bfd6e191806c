/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::{self, ErrorKind};
use crate::storage::{StorageClient, COPY_SOURCE_HEADER, METADATA_DIRECTIVE_HEADER};
use crate::types::{CopySpec, Headers, TransferSpec};
use crate::Config;

/// Server side copy of the object described by `spec`.
///
/// Nothing is hashed; the backend holds both copies.
#[tracing::instrument(skip_all, level = "debug", fields(source = %spec.source, key = %spec.key))]
pub async fn copy(
    storage: &dyn StorageClient,
    config: &Config,
    spec: &CopySpec,
) -> Result<String, error::Error> {
    if config.debug() {
        return Ok(crate::operation::dry_run_message(&TransferSpec::Copy(
            spec.clone(),
        )));
    }

    let target = format!("{} to {}", spec.source, spec.key);
    let headers = copy_headers(config.bucket().unwrap_or_default(), spec);
    let resp = storage
        .copy_object(config, &spec.source, &spec.key, &headers)
        .await
        .map_err(error::for_target(ErrorKind::Copy, target.clone()))?;
    if resp.status() != 200 {
        return Err(error::unexpected_status(
            ErrorKind::Copy,
            target,
            resp.status(),
        ));
    }

    Ok(format!("Copied: {target}"))
}

/// The `/bucket/key` reference the backend copies from, with the key percent-encoded.
///
/// A source that already starts with `/` names its bucket explicitly.
pub(crate) fn copy_source(bucket: &str, source: &str) -> String {
    match source
        .strip_prefix('/')
        .map(|qualified| qualified.split_once('/'))
    {
        Some(Some((bucket, key))) => format!("/{bucket}/{}", encode_key(key)),
        Some(None) => source.to_owned(),
        None => format!("/{bucket}/{}", encode_key(source)),
    }
}

/// Percent-encode every segment of `key`, keeping the `/` separators
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_headers(bucket: &str, spec: &CopySpec) -> Headers {
    let mut headers = Headers::new();
    headers.insert("content-length", "0");
    headers.insert(COPY_SOURCE_HEADER, copy_source(bucket, &spec.source));
    if !spec.headers.is_empty() {
        headers.extend(&spec.headers);
        headers.insert(METADATA_DIRECTIVE_HEADER, "REPLACE");
    }
    headers
}
