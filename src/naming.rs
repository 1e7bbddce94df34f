//! Archive identity and cache-busting token derivation.
//!
//! The archive name is content-addressed over *which* files are combined and
//! in what order, never over their contents: regenerating an artifact keeps
//! its name stable, and the short stale token carried in the URL query string
//! is what changes when inputs are touched.

use sha2::{Digest, Sha256};

use crate::batch::Batch;

pub(crate) const ARCHIVE_PREFIX: &str = "hive";

const STALE_TOKEN_HEX_LEN: usize = 8;

/// The string the archive name is derived from: the owning namespace plus
/// the ordered basenames, space-separated. Also used verbatim as the
/// provenance header of the published artifact.
pub fn identity_source(batch: &Batch) -> String {
    let names: Vec<&str> = batch
        .inputs()
        .iter()
        .map(|input| input.basename.as_str())
        .collect();
    format!("{}/{}", batch.namespace().trim_end_matches('/'), names.join(" "))
}

/// Deterministic artifact filename for a batch: `hive-{digest}{ext}`.
///
/// Two batches with identical ordered basenames under the same namespace map
/// to the same name regardless of file contents or modification times.
pub fn archive_name(batch: &Batch) -> String {
    let digest = Sha256::digest(identity_source(batch).as_bytes());
    format!(
        "{ARCHIVE_PREFIX}-{}{}",
        hex::encode(digest),
        batch.kind().extension()
    )
}

/// Advisory cache-busting token folded over every input's staleness signal.
///
/// Used only to build the URL query string, never for staleness decisions.
pub fn stale_query(batch: &Batch) -> Option<String> {
    if batch.is_empty() {
        return None;
    }
    let joined: Vec<String> = batch
        .inputs()
        .iter()
        .map(|input| input.stale_signal())
        .collect();
    let digest = Sha256::digest(joined.join(" ").as_bytes());
    let mut token = hex::encode(digest);
    token.truncate(STALE_TOKEN_HEX_LEN);
    Some(token)
}
