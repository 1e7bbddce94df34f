//! Alveare: a content-addressed combination and minification cache for site
//! stylesheets and scripts.
//!
//! Given an ordered batch of source files, alveare produces a single
//! concatenated, minified artifact under a configured cache directory and
//! hands back a stable URL with a cache-busting query token. Artifacts are
//! regenerated when any constituent file changes and published atomically,
//! so concurrent requests never observe a partially written file.
//!
//! Minification is best-effort by design: the strategy chain (remote
//! compilation service, in-process minifiers, size-aware chunked submission)
//! degrades to larger but valid output, never to an error. Only unreadable
//! inputs and failed publication surface as [`CombineError`]; on those the
//! caller emits the source files individually instead.
//!
//! ## Usage
//!
//! ```no_run
//! use alveare::{AssetKind, AssetRef, BatchBuilder, Combiner, CombinerConfig};
//!
//! # async fn demo() -> Result<(), alveare::CombineError> {
//! let combiner = Combiner::new(
//!     CombinerConfig::new("/var/cache/assets", "https://example.org/cache"),
//! );
//!
//! let mut builder = BatchBuilder::new(AssetKind::Style, "https://example.org/theme");
//! builder
//!     .push(AssetRef::local("/srv/theme/css", "base.css", "https://example.org/theme"))
//!     .await?;
//! builder
//!     .push(AssetRef::local("/srv/theme/css", "site.css", "https://example.org/theme"))
//!     .await?;
//! let batch = builder.build();
//!
//! if let Some(asset) = combiner.combine(&batch).await? {
//!     println!("{}", asset.url);
//! }
//! # Ok(())
//! # }
//! ```

mod assemble;
mod batch;
mod combiner;
mod config;
mod error;
mod minify;
mod naming;
mod publish;
mod staleness;
pub mod telemetry;

pub use batch::{AssetKind, AssetRef, Batch, BatchBuilder, InputDescriptor};
pub use combiner::{CombinedAsset, Combiner};
pub use config::{CombinerConfig, LogFormat, LoggingSettings};
pub use error::CombineError;
pub use minify::RemoteFailure;
pub use naming::{archive_name, identity_source, stale_query};
