//! Combiner facade: the per-request state machine.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::{counter, histogram};
use tracing::{debug, warn};
use url::Url;

use crate::assemble;
use crate::batch::{AssetKind, Batch};
use crate::config::CombinerConfig;
use crate::error::CombineError;
use crate::minify::{
    self, LocalCss, LocalJs, MinifyJob, MinifyStrategy, RemoteBody, RemoteByReference,
    RemoteCompiler,
};
use crate::naming;
use crate::publish::Publisher;
use crate::staleness;

pub(crate) const METRIC_COMBINE_FRESH: &str = "alveare_combine_fresh_total";
pub(crate) const METRIC_COMBINE_REBUILD: &str = "alveare_combine_rebuild_total";
pub(crate) const METRIC_COMBINE_SKIPPED: &str = "alveare_combine_skipped_total";
pub(crate) const METRIC_COMBINE_REBUILD_MS: &str = "alveare_combine_rebuild_ms";

/// Public reference to a published (or still fresh) artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedAsset {
    /// Artifact filename inside the cache directory.
    pub archive_name: String,
    /// Ready-to-embed URL: `{cache_base_url}/{archive_name}[?{stale_query}]`.
    pub url: String,
    /// Cache-busting token carried in the URL query string.
    pub stale_query: Option<String>,
}

/// Orchestrates fingerprinting, staleness, assembly, minification, and
/// publication for one cache directory.
///
/// Requests run independently and may race; rebuilds of the same identity are
/// idempotent and publication is single-writer per filename, so no
/// cross-request coordination is needed beyond the publisher's lock.
pub struct Combiner {
    config: CombinerConfig,
    publisher: Publisher,
    script_pipeline: Vec<Arc<dyn MinifyStrategy>>,
    style_pipeline: Vec<Arc<dyn MinifyStrategy>>,
}

impl Combiner {
    /// Build a combiner and its strategy pipelines.
    ///
    /// A malformed remote endpoint disables the remote strategies rather than
    /// failing construction: minification degrades, combining never does.
    pub fn new(config: CombinerConfig) -> Self {
        let remote = remote_compiler(&config).map(Arc::new);

        let mut script_pipeline: Vec<Arc<dyn MinifyStrategy>> = Vec::new();
        if let Some(remote) = &remote {
            script_pipeline.push(Arc::new(RemoteByReference::new(Arc::clone(remote))));
        }
        script_pipeline.push(Arc::new(LocalJs));
        if let Some(remote) = &remote {
            script_pipeline.push(Arc::new(RemoteBody::new(Arc::clone(remote))));
        }
        let style_pipeline: Vec<Arc<dyn MinifyStrategy>> = vec![Arc::new(LocalCss)];

        let publisher = Publisher::new(config.cache_dir.clone());
        Self {
            config,
            publisher,
            script_pipeline,
            style_pipeline,
        }
    }

    /// Combine one batch, reusing the cached artifact when it is fresh.
    ///
    /// `Ok(None)` means nothing to do: the batch is empty, or the cache
    /// directory is missing or read-only. `Err` means this batch failed
    /// (unreadable input, failed publication) and the caller should emit the
    /// source files individually instead.
    pub async fn combine(&self, batch: &Batch) -> Result<Option<CombinedAsset>, CombineError> {
        if batch.is_empty() {
            counter!(METRIC_COMBINE_SKIPPED).increment(1);
            return Ok(None);
        }
        if !self.cache_dir_writable().await {
            counter!(METRIC_COMBINE_SKIPPED).increment(1);
            warn!(
                cache_dir = %self.config.cache_dir.display(),
                "Cache directory missing or read-only; skipping combination"
            );
            return Ok(None);
        }

        let identity_source = naming::identity_source(batch);
        let archive_name = naming::archive_name(batch);
        let stale_query = naming::stale_query(batch);
        let artifact_path = self.config.cache_dir.join(&archive_name);

        if !staleness::is_stale(&artifact_path, batch).await {
            counter!(METRIC_COMBINE_FRESH).increment(1);
            debug!(artifact = %archive_name, "Serving fresh combined artifact");
            return Ok(Some(self.asset(archive_name, stale_query)));
        }

        let rebuild_started = Instant::now();
        let assembly = assemble::assemble(batch).await?;
        let assembled = assembly.combined();
        let job = MinifyJob {
            kind: batch.kind(),
            assembled: &assembled,
            fragments: assembly.fragments(),
        };
        let reduced = minify::reduce(self.pipeline(batch.kind()), &job).await;
        let headered = format!("{}{}", batch.kind().header(&identity_source), reduced);
        self.publisher
            .publish(&archive_name, Bytes::from(headered))
            .await?;

        histogram!(METRIC_COMBINE_REBUILD_MS)
            .record(rebuild_started.elapsed().as_secs_f64() * 1000.0);
        counter!(METRIC_COMBINE_REBUILD).increment(1);
        debug!(
            artifact = %archive_name,
            inputs = batch.inputs().len(),
            "Rebuilt combined artifact"
        );
        Ok(Some(self.asset(archive_name, stale_query)))
    }

    fn pipeline(&self, kind: AssetKind) -> &[Arc<dyn MinifyStrategy>] {
        match kind {
            AssetKind::Script => &self.script_pipeline,
            AssetKind::Style => &self.style_pipeline,
        }
    }

    fn asset(&self, archive_name: String, stale_query: Option<String>) -> CombinedAsset {
        let base = self.config.cache_base_url.trim_end_matches('/');
        let url = match &stale_query {
            Some(token) => format!("{base}/{archive_name}?{token}"),
            None => format!("{base}/{archive_name}"),
        };
        CombinedAsset {
            archive_name,
            url,
            stale_query,
        }
    }

    async fn cache_dir_writable(&self) -> bool {
        match tokio::fs::metadata(&self.config.cache_dir).await {
            Ok(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
            Err(_) => false,
        }
    }
}

fn remote_compiler(config: &CombinerConfig) -> Option<RemoteCompiler> {
    let raw = config.remote_endpoint.as_deref()?;
    let endpoint = match Url::parse(raw) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            warn!(
                endpoint = raw,
                error = %err,
                "Ignoring unparseable remote minification endpoint"
            );
            return None;
        }
    };
    match RemoteCompiler::new(endpoint, config.remote_size_limit, config.remote_timeout()) {
        Ok(remote) => Some(remote),
        Err(err) => {
            warn!(
                error = %err,
                "Remote minification client could not be built; using local strategies only"
            );
            None
        }
    }
}
