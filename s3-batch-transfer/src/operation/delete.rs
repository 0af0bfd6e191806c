/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::{self, ErrorKind};
use crate::storage::StorageClient;
use crate::types::{DeleteSpec, TransferSpec};
use crate::Config;

/// Delete the object described by `spec`. Only `204 No Content` counts as success.
#[tracing::instrument(skip_all, level = "debug", fields(key = %spec.key))]
pub async fn delete(
    storage: &dyn StorageClient,
    config: &Config,
    spec: &DeleteSpec,
) -> Result<String, error::Error> {
    if config.debug() {
        return Ok(crate::operation::dry_run_message(&TransferSpec::Delete(
            spec.clone(),
        )));
    }

    let resp = storage
        .delete_object(config, &spec.key)
        .await
        .map_err(error::for_target(ErrorKind::Delete, spec.key.clone()))?;
    if resp.status() != 204 {
        return Err(error::unexpected_status(
            ErrorKind::Delete,
            spec.key.clone(),
            resp.status(),
        ));
    }

    Ok(format!("Deleted: {}", spec.key))
}
