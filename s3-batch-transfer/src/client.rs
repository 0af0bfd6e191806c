/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::operation::batch::builders::BatchFluentBuilder;
use crate::operation::batch::{BatchInput, BatchOutput};
use crate::storage::StorageClient;
use crate::types::{TemplateRenderer, TransferOutcome, TransferSpec};
use crate::Config;

/// Batch transfer client
///
/// The client holds no per batch state and can be cloned cheaply; every batch it runs
/// takes its own [`Config`].
///
/// # Examples
/// Load the default configuration and run a batch of uploads:
///
/// ```no_run
/// # async fn example() -> Result<(), s3_batch_transfer::error::Error> {
/// use s3_batch_transfer::storage::S3StorageClient;
/// use s3_batch_transfer::types::UploadSpec;
///
/// let config = s3_batch_transfer::from_env().bucket("my-bucket").load();
/// let client = s3_batch_transfer::Client::new(S3StorageClient::new());
///
/// let output = client
///     .batch()
///     .config(config)
///     .transfer(UploadSpec::new("dist/app.js", "assets/app.js"))
///     .send()
///     .await?
///     .join()
///     .await?;
///
/// for outcome in output.outcomes() {
///     println!("{outcome}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) handle: Arc<Handle>,
}

/// Whatever is needed to carry out operations, e.g. the storage backend
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) storage: Arc<dyn StorageClient>,
    pub(crate) renderer: TemplateRenderer,
}

impl Client {
    /// Creates a new client issuing requests against `storage`
    pub fn new(storage: impl StorageClient + 'static) -> Client {
        let handle = Arc::new(Handle {
            storage: Arc::new(storage),
            renderer: TemplateRenderer::default(),
        });
        Client { handle }
    }

    /// Returns a client that renders paths, keys, bucket and credentials with `renderer`
    pub fn with_renderer(self, renderer: impl Into<TemplateRenderer>) -> Client {
        let handle = Arc::new(Handle {
            storage: self.handle.storage.clone(),
            renderer: renderer.into(),
        });
        Client { handle }
    }

    /// Constructs a fluent builder for a batch of transfers.
    ///
    /// A batch may mix uploads, downloads, copies and deletes. Every transfer runs to
    /// completion or failure; one failed transfer never stops the others.
    pub fn batch(&self) -> BatchFluentBuilder {
        BatchFluentBuilder::new(self.handle.clone())
    }

    /// Run the batch described by `input` with `config` as the base configuration and wait
    /// for every transfer to finish.
    ///
    /// Fails only when the batch itself is invalid (e.g. missing credentials). Failed
    /// transfers are reported in the returned [`BatchOutput`].
    pub async fn run(
        &self,
        config: Config,
        input: BatchInput,
    ) -> Result<BatchOutput, crate::error::Error> {
        self.batch().config(config).input(input).send().await?.join().await
    }

    /// Run a single transfer with `config` as its effective configuration
    pub async fn execute(&self, config: &Config, spec: impl Into<TransferSpec>) -> TransferOutcome {
        crate::operation::execute(self.handle.storage.as_ref(), config, spec.into()).await
    }
}
