/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use aws_sdk_s3::error::DisplayErrorContext;
use clap::Parser;
use s3_batch_transfer::operation::batch::BatchInput;
use s3_batch_transfer::storage::S3StorageClient;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "batch")]
#[command(about = "Runs the uploads, downloads, copies and deletes described by a JSON batch file.")]
pub struct Args {
    /// Path to the JSON batch document
    #[arg(required = true)]
    batch: PathBuf,

    /// Bucket used by groups that don't name one
    #[arg(long)]
    bucket: Option<String>,

    /// Maximum number of transfers in flight
    #[arg(long)]
    max_operations: Option<usize>,

    /// Report what would be transferred without doing it
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    debug: bool,
}

async fn run(args: Args) -> Result<bool, BoxError> {
    let document = tokio::fs::read_to_string(&args.batch).await?;
    let input = BatchInput::from_json(&document)?;

    let mut loader = s3_batch_transfer::from_env().debug(args.debug);
    if let Some(bucket) = args.bucket {
        loader = loader.bucket(bucket);
    }
    if let Some(max_operations) = args.max_operations {
        loader = loader.max_operations(max_operations);
    }
    let config = loader.load();

    let client = s3_batch_transfer::Client::new(S3StorageClient::new());
    let output = client.run(config, input).await?;

    for outcome in output.outcomes() {
        println!("{outcome}");
    }
    println!(
        "{} transfers, {} succeeded, {} failed",
        output.total(),
        output.successes(),
        output.failures()
    );
    Ok(!output.had_errors())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("batch failed: {}", DisplayErrorContext(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}
