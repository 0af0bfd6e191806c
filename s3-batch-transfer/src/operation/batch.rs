/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::Instrument;

/// Operation builders
pub mod builders;

mod input;
pub use input::{BatchInput, CopyGroup, DeleteGroup, DownloadGroup, UploadGroup};

mod handle;
pub use handle::BatchHandle;

mod output;
pub use output::BatchOutput;

mod expand;
mod worker;

use super::TransferContext;
use crate::types::{TransferOutcome, TransferSpec};
use crate::Config;

/// Operation struct for running a batch of transfers
#[derive(Clone, Default, Debug)]
pub(crate) struct Batch;

impl Batch {
    /// Expand the batch and start its workers
    pub(crate) async fn orchestrate(
        handle: Arc<crate::client::Handle>,
        config: Config,
        input: BatchInput,
        explicit: Vec<TransferSpec>,
    ) -> Result<BatchHandle, crate::error::Error> {
        let renderer = handle.renderer.clone();
        // pattern expansion walks the local filesystem
        let (batch_config, transfers) = tokio::task::spawn_blocking(move || {
            expand::expand(&config, &input, explicit, &renderer)
        })
        .await??;

        if batch_config.debug() {
            tracing::warn!("running in debug mode, no transfers will be made");
        }

        let total = transfers.len();
        let concurrency = batch_config
            .max_operations()
            .unwrap_or(total)
            .clamp(1, total.max(1));
        tracing::debug!("running {total} transfers with {concurrency} workers");

        let ctx = BatchContext::new(handle, total);

        // spawn all work into the same JoinSet such that when the set is dropped all tasks are cancelled.
        let mut tasks = JoinSet::new();
        let (work_tx, work_rx) = async_channel::bounded(concurrency);

        tasks.spawn(worker::distribute_work(transfers, work_tx));

        for i in 0..concurrency {
            let worker = worker::run_transfers(ctx.clone(), work_rx.clone())
                .instrument(tracing::debug_span!("transfer-worker", worker = i));
            tasks.spawn(worker);
        }

        Ok(BatchHandle { tasks, ctx })
    }
}

/// Batch operation specific state
#[derive(Debug)]
pub(crate) struct BatchState {
    // one slot per transfer, indexed by submission order
    outcomes: Mutex<Vec<Option<TransferOutcome>>>,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl BatchState {
    /// Store the outcome of the transfer submitted at `index`
    fn record(&self, index: usize, outcome: TransferOutcome) {
        if outcome.is_success() {
            self.successes.fetch_add(1, Ordering::SeqCst);
            tracing::info!("{outcome}");
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst);
            tracing::error!("{outcome}");
        }

        let mut outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        match outcomes.get_mut(index) {
            Some(slot) => *slot = Some(outcome),
            None => tracing::error!("no outcome slot for transfer {index}"),
        }
    }

    fn take_outcomes(&self) -> Vec<Option<TransferOutcome>> {
        let mut outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *outcomes)
    }
}

type BatchContext = TransferContext<BatchState>;

impl BatchContext {
    fn new(handle: Arc<crate::client::Handle>, total: usize) -> Self {
        let state = Arc::new(BatchState {
            outcomes: Mutex::new((0..total).map(|_| None).collect()),
            successes: AtomicU64::default(),
            failures: AtomicU64::default(),
        });
        TransferContext { handle, state }
    }
}
