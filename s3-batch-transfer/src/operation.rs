/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::storage::StorageClient;
use crate::types::{TransferOutcome, TransferSpec};
use crate::Config;

/// Single object upload
pub mod upload;

/// Single object download
pub mod download;

/// Server side copy of a single object
pub mod copy;

/// Single object delete
pub mod delete;

/// Batches of uploads, downloads, copies and deletes
pub mod batch;

/// Container for maintaining context required to carry out a single operation/transfer.
///
/// `State` is whatever additional operation specific state is required for the operation.
#[derive(Debug)]
pub(crate) struct TransferContext<State> {
    handle: Arc<crate::client::Handle>,
    state: Arc<State>,
}

impl<State> TransferContext<State> {
    /// The storage backend to issue requests against
    pub(crate) fn storage(&self) -> &dyn StorageClient {
        self.handle.storage.as_ref()
    }
}

impl<State> Clone for TransferContext<State> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            state: self.state.clone(),
        }
    }
}

/// Run the primitive matching `spec` and fold its result into a [`TransferOutcome`]
pub(crate) async fn execute(
    storage: &dyn StorageClient,
    config: &Config,
    spec: TransferSpec,
) -> TransferOutcome {
    let result = match &spec {
        TransferSpec::Upload(upload) => upload::upload(storage, config, upload).await,
        TransferSpec::Download(download) => download::download(storage, config, download).await,
        TransferSpec::Copy(copy) => copy::copy(storage, config, copy).await,
        TransferSpec::Delete(delete) => delete::delete(storage, config, delete).await,
    };

    match result {
        Ok(message) => TransferOutcome::Success { message },
        Err(error) => TransferOutcome::Failure { error, spec },
    }
}

/// The outcome reported for `spec` when the batch runs in debug mode.
///
/// No primitive runs; the transfer is assumed to have succeeded.
pub(crate) fn dry_run(spec: &TransferSpec) -> TransferOutcome {
    TransferOutcome::Success {
        message: dry_run_message(spec),
    }
}

pub(crate) fn dry_run_message(spec: &TransferSpec) -> String {
    match spec {
        TransferSpec::Upload(upload) => format!(
            "[debug] Upload: {} to {}",
            upload.source.display(),
            upload.key
        ),
        TransferSpec::Download(download) => format!(
            "[debug] Download: {} to {}",
            download.key,
            download.destination.display()
        ),
        TransferSpec::Copy(copy) => format!("[debug] Copy: {} to {}", copy.source, copy.key),
        TransferSpec::Delete(delete) => format!("[debug] Delete: {}", delete.key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CopySpec, DeleteSpec, DownloadSpec, UploadSpec};

    #[test]
    fn test_dry_run_messages() {
        let cases = [
            (
                TransferSpec::Upload(UploadSpec::new("dist/app.js", "assets/app.js")),
                "[debug] Upload: dist/app.js to assets/app.js",
            ),
            (
                TransferSpec::Download(DownloadSpec::new("assets/app.js", "out/app.js")),
                "[debug] Download: assets/app.js to out/app.js",
            ),
            (
                TransferSpec::Copy(CopySpec::new("a.txt", "b.txt")),
                "[debug] Copy: a.txt to b.txt",
            ),
            (
                TransferSpec::Delete(DeleteSpec::new("old.txt")),
                "[debug] Delete: old.txt",
            ),
        ];
        for (spec, expected) in cases {
            let outcome = dry_run(&spec);
            assert!(outcome.is_success());
            assert_eq!(Some(expected), outcome.message());
        }
    }
}
