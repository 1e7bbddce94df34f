//! Minification strategy chain.
//!
//! Minification is an optimization, never a correctness requirement: every
//! strategy failure is absorbed and the chain terminates in the assembled
//! text unchanged, so non-empty input never produces an error or empty
//! output. Worst case the caller serves bigger but valid assets.

mod chunk;
mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::assemble::Fragment;
use crate::batch::AssetKind;

pub use remote::RemoteFailure;

pub(crate) use local::{LocalCss, LocalJs};
pub(crate) use remote::{METRIC_REMOTE_FAILURE, RemoteBody, RemoteByReference, RemoteCompiler};

pub(crate) const METRIC_MINIFY_FALLBACK: &str = "alveare_minify_fallback_total";

/// Why one strategy yielded nothing. The chain logs it and moves on.
#[derive(Debug, Error)]
pub(crate) enum StrategyError {
    #[error("remote minification failed: {0}")]
    Remote(#[from] RemoteFailure),
    #[error("local minifier rejected input: {0}")]
    Local(String),
}

/// Everything a strategy may look at: the joined text and the ordered
/// per-input fragments it was joined from.
pub(crate) struct MinifyJob<'a> {
    pub kind: AssetKind,
    pub assembled: &'a str,
    pub fragments: &'a [Fragment],
}

#[async_trait]
pub(crate) trait MinifyStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, job: &MinifyJob<'_>) -> Result<String, StrategyError>;
}

/// Run the pipeline in order; the first usable output wins.
pub(crate) async fn reduce(pipeline: &[Arc<dyn MinifyStrategy>], job: &MinifyJob<'_>) -> String {
    for strategy in pipeline {
        match strategy.run(job).await {
            Ok(output) if !output.trim().is_empty() => {
                debug!(
                    strategy = strategy.name(),
                    kind = ?job.kind,
                    bytes_in = job.assembled.len(),
                    bytes_out = output.len(),
                    "Minification strategy succeeded"
                );
                return output;
            }
            Ok(_) => {
                counter!(METRIC_MINIFY_FALLBACK).increment(1);
                warn!(
                    strategy = strategy.name(),
                    result = "empty_output",
                    "Minification strategy produced no output"
                );
            }
            Err(reason) => {
                counter!(METRIC_MINIFY_FALLBACK).increment(1);
                warn!(
                    strategy = strategy.name(),
                    %reason,
                    "Minification strategy failed"
                );
            }
        }
    }
    job.assembled.to_string()
}
