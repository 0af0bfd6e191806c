/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::types::TransferOutcome;

/// The outcome of every transfer in a batch
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct BatchOutput {
    outcomes: Vec<TransferOutcome>,
    failures: usize,
}

impl BatchOutput {
    pub(crate) fn new(outcomes: Vec<TransferOutcome>) -> Self {
        let failures = outcomes.iter().filter(|o| !o.is_success()).count();
        Self { outcomes, failures }
    }

    /// Number of transfers in the batch
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of transfers that failed
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Number of transfers that succeeded
    pub fn successes(&self) -> usize {
        self.total() - self.failures
    }

    /// Whether any transfer failed. A batch succeeded only if this is `false`.
    pub fn had_errors(&self) -> bool {
        self.failures > 0
    }

    /// One outcome per transfer, in submission order
    pub fn outcomes(&self) -> &[TransferOutcome] {
        &self.outcomes
    }

    /// Consume the output, returning the outcomes in submission order
    pub fn into_outcomes(self) -> Vec<TransferOutcome> {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeleteSpec, TransferSpec};

    #[test]
    fn test_counts() {
        let output = BatchOutput::new(vec![
            TransferOutcome::Success {
                message: "Deleted: a.txt".to_owned(),
            },
            TransferOutcome::Failure {
                error: crate::error::unexpected_status(
                    crate::error::ErrorKind::Delete,
                    "b.txt",
                    403,
                ),
                spec: TransferSpec::Delete(DeleteSpec::new("b.txt")),
            },
        ]);
        assert_eq!(2, output.total());
        assert_eq!(1, output.failures());
        assert_eq!(1, output.successes());
        assert!(output.had_errors());
        assert_eq!(Some("Deleted: a.txt"), output.outcomes()[0].message());
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let output = BatchOutput::default();
        assert_eq!(0, output.total());
        assert!(!output.had_errors());
    }
}
