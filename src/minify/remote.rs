//! Remote minification service client and strategies.
//!
//! The remote service is treated as unreliable by construction: one attempt
//! per call, a bounded timeout, and a typed failure for every way it can let
//! us down. Callers fall through to the next strategy on any failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use url::form_urlencoded;

use super::chunk::{encoded_len, pack_chunks};
use super::{MinifyJob, MinifyStrategy, StrategyError};

pub(crate) const METRIC_REMOTE_FAILURE: &str = "alveare_remote_failure_total";

/// Fixed request preamble in the Closure-compiler wire shape.
const BASE_QUERY: &str =
    "output_info=compiled_code&output_format=text&compilation_level=SIMPLE_OPTIMIZATIONS";
const CODE_URL_PARAM: &str = "code_url";
const JS_CODE_PARAM: &str = "js_code";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Why a remote call yielded no usable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    #[error("request timed out")]
    Timeout,
    #[error("service unreachable")]
    Unreachable,
    #[error("service reported an error")]
    ServerError,
    #[error("service returned an empty response")]
    EmptyResponse,
}

/// Client for the remote minification endpoint.
pub(crate) struct RemoteCompiler {
    client: Client,
    endpoint: Url,
    size_limit: usize,
}

impl RemoteCompiler {
    pub fn new(endpoint: Url, size_limit: usize, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("alveare/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            size_limit,
        })
    }

    /// One request referencing every input by URL; no file bodies transmitted.
    pub async fn compile_by_reference(&self, sources: &[String]) -> Result<String, RemoteFailure> {
        let mut body = String::from(BASE_QUERY);
        for source in sources {
            body.push('&');
            body.push_str(CODE_URL_PARAM);
            body.push('=');
            body.extend(form_urlencoded::byte_serialize(source.as_bytes()));
        }
        self.submit(body).await
    }

    /// Submit source text in the request body.
    pub async fn compile_source(&self, code: &str) -> Result<String, RemoteFailure> {
        let mut body = String::from(BASE_QUERY);
        body.push('&');
        body.push_str(JS_CODE_PARAM);
        body.push('=');
        body.extend(form_urlencoded::byte_serialize(code.as_bytes()));
        self.submit(body).await
    }

    /// Whether `code` fits a single by-body request under the ceiling.
    pub fn fits_single_request(&self, code: &str) -> bool {
        request_overhead() + encoded_len(code) < self.size_limit
    }

    /// Ceiling available to chunk contents once the preamble is accounted for.
    pub fn chunk_ceiling(&self) -> usize {
        self.size_limit.saturating_sub(request_overhead())
    }

    async fn submit(&self, body: String) -> Result<String, RemoteFailure> {
        self.submit_inner(body).await.map_err(|reason| {
            counter!(METRIC_REMOTE_FAILURE).increment(1);
            debug!(%reason, endpoint = %self.endpoint, "Remote minification request failed");
            reason
        })
    }

    async fn submit_inner(&self, body: String) -> Result<String, RemoteFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(classify_transport)?;

        if !response.status().is_success() {
            return Err(RemoteFailure::ServerError);
        }
        let text = response.text().await.map_err(classify_transport)?;
        if text.trim().is_empty() {
            return Err(RemoteFailure::EmptyResponse);
        }
        if is_error_report(&text) {
            return Err(RemoteFailure::ServerError);
        }
        Ok(text)
    }
}

fn request_overhead() -> usize {
    // "&js_code=" joins the preamble to the payload.
    BASE_QUERY.len() + 1 + JS_CODE_PARAM.len() + 1
}

fn classify_transport(err: reqwest::Error) -> RemoteFailure {
    if err.is_timeout() {
        RemoteFailure::Timeout
    } else {
        RemoteFailure::Unreachable
    }
}

/// Matches the service's plain-text error reports: lines like "Error(13): ...".
fn is_error_report(body: &str) -> bool {
    body.lines().any(is_error_line)
}

fn is_error_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("Error(") else {
        return false;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if !(1..=2).contains(&digits) {
        return false;
    }
    let Some(rest) = rest[digits..].strip_prefix("):") else {
        return false;
    };
    rest.starts_with(char::is_whitespace)
}

/// Strategy 1 for scripts: the remote service fetches and minifies the inputs
/// by URL itself.
pub(crate) struct RemoteByReference {
    remote: Arc<RemoteCompiler>,
}

impl RemoteByReference {
    pub fn new(remote: Arc<RemoteCompiler>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl MinifyStrategy for RemoteByReference {
    fn name(&self) -> &'static str {
        "remote_by_reference"
    }

    async fn run(&self, job: &MinifyJob<'_>) -> Result<String, StrategyError> {
        let sources: Vec<String> = job
            .fragments
            .iter()
            .map(|fragment| {
                format!(
                    "{}/{}",
                    fragment.public_url.trim_end_matches('/'),
                    fragment.basename
                )
            })
            .collect();
        Ok(self.remote.compile_by_reference(&sources).await?)
    }
}

/// Last script strategies: submit the assembled text by body, in one request
/// when it fits under the ceiling, otherwise chunked with whole fragments per
/// chunk. A failed chunk degrades to its raw content in position; the
/// artifact stays valid, just partially unminified.
pub(crate) struct RemoteBody {
    remote: Arc<RemoteCompiler>,
}

impl RemoteBody {
    pub fn new(remote: Arc<RemoteCompiler>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl MinifyStrategy for RemoteBody {
    fn name(&self) -> &'static str {
        "remote_by_body"
    }

    async fn run(&self, job: &MinifyJob<'_>) -> Result<String, StrategyError> {
        if self.remote.fits_single_request(job.assembled) {
            return Ok(self.remote.compile_source(job.assembled).await?);
        }

        let chunks = pack_chunks(job.fragments, self.remote.chunk_ceiling());
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            if chunk.oversize {
                debug!(
                    bytes = chunk.content.len(),
                    "Chunk exceeds the remote size ceiling on its own; keeping raw content"
                );
                parts.push(chunk.content.clone());
                continue;
            }
            match self.remote.compile_source(&chunk.content).await {
                Ok(minified) => parts.push(minified),
                Err(reason) => {
                    warn!(%reason, "Remote chunk failed; substituting raw content");
                    parts.push(chunk.content.clone());
                }
            }
        }
        Ok(parts.join("\n"))
    }
}
