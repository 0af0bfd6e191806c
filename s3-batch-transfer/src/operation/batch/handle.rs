/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::atomic::Ordering;

use tokio::task;

use super::{BatchContext, BatchOutput};
use crate::error::{self, ErrorKind};

/// Handle for a running batch
#[derive(Debug)]
#[non_exhaustive]
pub struct BatchHandle {
    /// All child tasks spawned for this batch
    pub(crate) tasks: task::JoinSet<Result<(), error::Error>>,
    /// The context used to drive the batch to completion
    pub(crate) ctx: BatchContext,
}

impl BatchHandle {
    /// Wait for every transfer in the batch to resolve.
    ///
    /// Failed transfers do not make this return an error; they are reported in the output.
    /// An error here means the batch machinery itself broke (e.g. a worker panicked).
    #[tracing::instrument(skip_all, level = "debug", name = "join-batch")]
    pub async fn join(mut self) -> Result<BatchOutput, error::Error> {
        let mut first_error_to_report = None;
        while let Some(join_result) = self.tasks.join_next().await {
            let result = join_result.map_err(error::Error::from).and_then(|r| r);
            if let Err(err) = result {
                tracing::error!("batch task failed: {err}");
                first_error_to_report.get_or_insert(err);
            }
        }
        if let Some(err) = first_error_to_report {
            return Err(err);
        }

        let outcomes = self
            .ctx
            .state
            .take_outcomes()
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.ok_or_else(|| {
                    error::Error::new(
                        ErrorKind::RuntimeError,
                        format!("transfer {index} produced no outcome"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = BatchOutput::new(outcomes);
        tracing::info!(
            "batch finished: {} succeeded, {} failed",
            self.ctx.state.successes.load(Ordering::SeqCst),
            self.ctx.state.failures.load(Ordering::SeqCst)
        );
        Ok(output)
    }
}
