/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Batch transfers between a local filesystem and S3 compatible object storage.
//!
//! A batch is a declarative set of uploads, downloads, server side copies and deletes.
//! Each declared transfer is expanded into concrete operations which are executed with
//! bounded concurrency. Uploads and downloads are verified by comparing the MD5 digest of
//! the local bytes against the entity tag returned by the backend.
//!
//! # Examples
//!
//! Run a batch described by a JSON document:
//!
//! ```no_run
//! # async fn example() -> Result<(), s3_batch_transfer::error::Error> {
//! use s3_batch_transfer::operation::batch::BatchInput;
//! use s3_batch_transfer::storage::S3StorageClient;
//!
//! let config = s3_batch_transfer::from_env().load();
//! let client = s3_batch_transfer::Client::new(S3StorageClient::new());
//!
//! let input = BatchInput::from_json(r#"{
//!     "bucket": "my-bucket",
//!     "upload": [{ "src": "dist/*.js", "dest": "assets/", "gzip": true }],
//!     "del": [{ "src": "assets/old.js" }]
//! }"#)?;
//!
//! let output = client.run(config, input).await?;
//! if output.had_errors() {
//!     eprintln!("{} of {} transfers failed", output.failures(), output.total());
//! }
//! # Ok(())
//! # }
//! ```

/// Default AWS region used when none is configured
pub(crate) const DEFAULT_REGION: &str = "us-east-1";

/// Error types emitted by `s3-batch-transfer`
pub mod error;

/// Common types used by `s3-batch-transfer`
pub mod types;

/// Content hashing used to verify transfers
pub mod checksum;

/// Gzip transform applied to uploads
pub mod compression;

/// Storage backend adapters
pub mod storage;

/// Batch transfer client
pub mod client;

/// Transfer operations
pub mod operation;

/// Batch transfer configuration
pub mod config;

pub use self::client::Client;
use self::config::loader::ConfigLoader;
pub use self::config::Config;

/// Create a config loader that falls back to environment credentials
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
