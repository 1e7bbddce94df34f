//! Batch construction for combinable assets.
//!
//! A batch is one request-scoped, ordered collection of source files destined
//! for a single combined artifact. Order is semantically meaningful: it is
//! concatenation order, and later files may depend on earlier ones.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs;

use crate::error::CombineError;

/// Asset format of one batch.
///
/// Selects the header comment syntax, the URL-rewrite rules, and the
/// minifier pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Style,
    Script,
}

impl AssetKind {
    /// Artifact file extension for this format, with the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Style => ".css",
            AssetKind::Script => ".js",
        }
    }

    /// Provenance header listing the constituent files.
    ///
    /// Prepended after minification so no minifier can strip or mangle it.
    pub(crate) fn header(self, source: &str) -> String {
        match self {
            AssetKind::Style => format!("/* {source} */\n"),
            AssetKind::Script => format!("// {source}\n"),
        }
    }
}

/// One asset reference handed over by the caller's asset loader.
#[derive(Debug, Clone)]
pub struct AssetRef {
    /// Directory the file is read from.
    pub directory: PathBuf,
    /// File name within `directory`; unique within one batch.
    pub basename: String,
    /// Public base URL the asset tree is served under.
    pub public_url: String,
    /// Whether the file is locally combinable. Remote or externally hosted
    /// assets are excluded from the batch and handed back for individual
    /// emission.
    pub local: bool,
    /// Rendering hint, passed through untouched with excluded assets.
    pub defer: bool,
    /// Rendering hint, passed through untouched with excluded assets.
    pub async_load: bool,
    /// Explicit staleness signal independent of the file's mtime.
    pub stale_token: Option<String>,
}

impl AssetRef {
    /// A locally combinable asset with no rendering hints.
    pub fn local(
        directory: impl Into<PathBuf>,
        basename: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            basename: basename.into(),
            public_url: public_url.into(),
            local: true,
            defer: false,
            async_load: false,
            stale_token: None,
        }
    }
}

/// One resolved input: absolute path plus the staleness signals captured at
/// batch-build time. Pure data.
#[derive(Debug, Clone)]
pub struct InputDescriptor {
    pub path: PathBuf,
    pub basename: String,
    pub public_url: String,
    pub last_modified: SystemTime,
    pub stale_token: Option<String>,
}

impl InputDescriptor {
    pub fn new(
        path: impl Into<PathBuf>,
        basename: impl Into<String>,
        public_url: impl Into<String>,
        last_modified: SystemTime,
    ) -> Self {
        Self {
            path: path.into(),
            basename: basename.into(),
            public_url: public_url.into(),
            last_modified,
            stale_token: None,
        }
    }

    pub fn with_stale_token(mut self, token: impl Into<String>) -> Self {
        self.stale_token = Some(token.into());
        self
    }

    /// Signal folded into the cache-busting token: the explicit token when
    /// present, the mtime in unix seconds otherwise.
    pub(crate) fn stale_signal(&self) -> String {
        match &self.stale_token {
            Some(token) => token.clone(),
            None => self
                .last_modified
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0)
                .to_string(),
        }
    }
}

/// Ordered, request-scoped collection of inputs to combine together.
#[derive(Debug)]
pub struct Batch {
    kind: AssetKind,
    namespace: String,
    inputs: Vec<InputDescriptor>,
    excluded: Vec<AssetRef>,
}

impl Batch {
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Owning namespace, typically the theme or application URL prefix.
    /// Part of the archive identity.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Inputs in concatenation order.
    pub fn inputs(&self) -> &[InputDescriptor] {
        &self.inputs
    }

    /// Assets the caller must emit individually, rendering hints intact.
    pub fn excluded(&self) -> &[AssetRef] {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Builds a [`Batch`], stat-ing each local file and deduplicating basenames.
#[derive(Debug)]
pub struct BatchBuilder {
    kind: AssetKind,
    namespace: String,
    inputs: Vec<InputDescriptor>,
    positions: HashMap<String, usize>,
    excluded: Vec<AssetRef>,
}

impl BatchBuilder {
    pub fn new(kind: AssetKind, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            inputs: Vec::new(),
            positions: HashMap::new(),
            excluded: Vec::new(),
        }
    }

    /// Add one asset reference.
    ///
    /// Non-local assets land on the excluded list. Local assets are stat-ed
    /// now; a file that cannot be stat-ed fails the batch with a read error.
    pub async fn push(&mut self, asset: AssetRef) -> Result<(), CombineError> {
        if !asset.local {
            self.excluded.push(asset);
            return Ok(());
        }

        let path = asset.directory.join(&asset.basename);
        let metadata = fs::metadata(&path)
            .await
            .map_err(|source| CombineError::read(path.clone(), source))?;
        let last_modified = metadata.modified().unwrap_or(UNIX_EPOCH);

        let mut descriptor =
            InputDescriptor::new(path, asset.basename, asset.public_url, last_modified);
        descriptor.stale_token = asset.stale_token;
        self.push_resolved(descriptor);
        Ok(())
    }

    /// Add a descriptor the caller has already resolved.
    pub fn push_resolved(&mut self, descriptor: InputDescriptor) {
        match self.positions.get(&descriptor.basename) {
            // Later duplicates overwrite earlier ones but keep the earlier
            // position in concatenation order.
            Some(&index) => self.inputs[index] = descriptor,
            None => {
                self.positions
                    .insert(descriptor.basename.clone(), self.inputs.len());
                self.inputs.push(descriptor);
            }
        }
    }

    pub fn build(self) -> Batch {
        Batch {
            kind: self.kind,
            namespace: self.namespace,
            inputs: self.inputs,
            excluded: self.excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(basename: &str, public_url: &str) -> InputDescriptor {
        InputDescriptor::new(
            format!("/srv/assets/{basename}"),
            basename,
            public_url,
            UNIX_EPOCH,
        )
    }

    #[test]
    fn duplicate_basenames_overwrite_in_place() {
        let mut builder = BatchBuilder::new(AssetKind::Script, "https://example.org/theme");
        builder.push_resolved(descriptor("a.js", "https://example.org/one"));
        builder.push_resolved(descriptor("b.js", "https://example.org/one"));
        builder.push_resolved(descriptor("a.js", "https://example.org/two"));

        let batch = builder.build();
        assert_eq!(batch.inputs().len(), 2);
        assert_eq!(batch.inputs()[0].basename, "a.js");
        assert_eq!(batch.inputs()[0].public_url, "https://example.org/two");
        assert_eq!(batch.inputs()[1].basename, "b.js");
    }

    #[tokio::test]
    async fn non_local_assets_are_excluded() {
        let mut builder = BatchBuilder::new(AssetKind::Script, "https://example.org/theme");
        let mut external = AssetRef::local("/srv", "cdn.js", "https://cdn.example.org");
        external.local = false;
        external.defer = true;
        builder.push(external).await.expect("excluded push");

        let batch = builder.build();
        assert!(batch.is_empty());
        assert_eq!(batch.excluded().len(), 1);
        assert!(batch.excluded()[0].defer);
    }

    #[tokio::test]
    async fn missing_file_fails_the_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut builder = BatchBuilder::new(AssetKind::Style, "https://example.org/theme");
        let result = builder
            .push(AssetRef::local(dir.path(), "absent.css", "https://example.org/theme"))
            .await;
        assert!(matches!(result, Err(CombineError::Read { .. })));
    }

    #[tokio::test]
    async fn push_captures_file_mtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("app.css"), "body {}").expect("write");
        let mut builder = BatchBuilder::new(AssetKind::Style, "https://example.org/theme");
        builder
            .push(AssetRef::local(dir.path(), "app.css", "https://example.org/theme"))
            .await
            .expect("push");

        let batch = builder.build();
        assert_eq!(batch.inputs().len(), 1);
        assert!(batch.inputs()[0].last_modified > UNIX_EPOCH);
    }

    #[test]
    fn explicit_stale_token_wins_over_mtime() {
        let described = descriptor("a.js", "https://example.org").with_stale_token("v42");
        assert_eq!(described.stale_signal(), "v42");
        let plain = descriptor("a.js", "https://example.org");
        assert_eq!(plain.stale_signal(), "0");
    }
}
