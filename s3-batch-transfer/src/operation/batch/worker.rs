/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use async_channel::{Receiver, Sender};

use super::expand::Transfer;
use super::BatchContext;
use crate::error;
use crate::operation;

/// A transfer queued for a worker, tagged with its submission index
#[derive(Debug)]
pub(super) struct TransferJob {
    pub(super) index: usize,
    pub(super) transfer: Transfer,
}

/// Feed every transfer into the work queue, in submission order.
///
/// The queue is bounded by the worker count, so this only runs ahead of the workers by
/// that many jobs. Dropping `work_tx` on return lets idle workers exit.
pub(super) async fn distribute_work(
    transfers: Vec<Transfer>,
    work_tx: Sender<TransferJob>,
) -> Result<(), error::Error> {
    for (index, transfer) in transfers.into_iter().enumerate() {
        if work_tx.send(TransferJob { index, transfer }).await.is_err() {
            return Err(error::Error::new(
                error::ErrorKind::RuntimeError,
                "all transfer workers exited before the batch was queued",
            ));
        }
    }
    tracing::trace!("all transfers queued");
    Ok(())
}

/// Worker loop: run one transfer at a time until the queue is drained.
///
/// A worker takes its next job only after the current transfer has resolved, so the number
/// of workers bounds the number of transfers in flight.
pub(super) async fn run_transfers(
    ctx: BatchContext,
    work_rx: Receiver<TransferJob>,
) -> Result<(), error::Error> {
    while let Ok(job) = work_rx.recv().await {
        let Transfer { spec, config } = job.transfer;
        tracing::debug!("worker starting {}", spec.describe());
        let outcome = if config.debug() {
            operation::dry_run(&spec)
        } else {
            operation::execute(ctx.storage(), &config, spec).await
        };
        ctx.state.record(job.index, outcome);
    }

    tracing::trace!("req channel closed, worker finished");
    Ok(())
}
