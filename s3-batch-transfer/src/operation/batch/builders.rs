/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use super::{BatchHandle, BatchInput, CopyGroup, DeleteGroup, DownloadGroup, UploadGroup};
use crate::types::TransferSpec;
use crate::Config;

/// Fluent builder for constructing a batch of transfers
#[derive(Debug)]
pub struct BatchFluentBuilder {
    handle: Arc<crate::client::Handle>,
    config: Option<Config>,
    input: BatchInput,
    transfers: Vec<TransferSpec>,
}

impl BatchFluentBuilder {
    pub(crate) fn new(handle: Arc<crate::client::Handle>) -> Self {
        Self {
            handle,
            config: None,
            input: BatchInput::default(),
            transfers: Vec::new(),
        }
    }

    /// Initiate the batch.
    ///
    /// Fails without starting any transfer when a transfer's effective configuration is
    /// missing credentials or a bucket.
    #[tracing::instrument(skip_all, level = "debug", name = "initiate-batch")]
    pub async fn send(self) -> Result<BatchHandle, crate::error::Error> {
        let config = self.config.unwrap_or_default();
        crate::operation::batch::Batch::orchestrate(self.handle, config, self.input, self.transfers)
            .await
    }

    /// Base configuration every transfer starts from.
    /// Default is an empty [`Config`].
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Base configuration every transfer starts from.
    pub fn get_config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Replace the declared batch, including its batch wide overrides
    pub fn input(mut self, input: BatchInput) -> Self {
        self.input = input;
        self
    }

    /// The declared batch
    pub fn get_input(&self) -> &BatchInput {
        &self.input
    }

    /// Declare an upload group
    pub fn upload(mut self, group: UploadGroup) -> Self {
        self.input.upload.push(group);
        self
    }

    /// Declare a download
    pub fn download(mut self, group: DownloadGroup) -> Self {
        self.input.download.push(group);
        self
    }

    /// Declare a server side copy
    pub fn copy(mut self, group: CopyGroup) -> Self {
        self.input.copy.push(group);
        self
    }

    /// Declare a delete
    pub fn delete(mut self, group: DeleteGroup) -> Self {
        self.input.del.push(group);
        self
    }

    /// Add a concrete transfer. It runs with the batch wide configuration after every
    /// declared group.
    pub fn transfer(mut self, spec: impl Into<TransferSpec>) -> Self {
        self.transfers.push(spec.into());
        self
    }
}
