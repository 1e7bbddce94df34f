//! Staleness oracle for published artifacts.

use std::path::Path;
use std::time::UNIX_EPOCH;

use tokio::fs;

use crate::batch::Batch;

/// Whether the artifact at `artifact_path` must be rebuilt for `batch`.
///
/// A missing artifact is stale. An existing one is stale iff any input was
/// modified strictly after the artifact was stored; the scan short-circuits
/// on the first newer input. An empty batch is never stale: there is nothing
/// to serve and nothing to regenerate.
pub(crate) async fn is_stale(artifact_path: &Path, batch: &Batch) -> bool {
    if batch.is_empty() {
        return false;
    }

    let stored_at = match fs::metadata(artifact_path).await {
        Ok(metadata) => metadata.modified().unwrap_or(UNIX_EPOCH),
        Err(_) => return true,
    };

    batch
        .inputs()
        .iter()
        .any(|input| input.last_modified > stored_at)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::batch::{AssetKind, BatchBuilder, InputDescriptor};

    fn batch_with_mtimes(offsets: &[i64], stored_at: std::time::SystemTime) -> Batch {
        let mut builder = BatchBuilder::new(AssetKind::Style, "https://example.org/theme");
        for (index, offset) in offsets.iter().enumerate() {
            let last_modified = if *offset >= 0 {
                stored_at + Duration::from_secs(*offset as u64)
            } else {
                stored_at - Duration::from_secs(offset.unsigned_abs())
            };
            builder.push_resolved(InputDescriptor::new(
                format!("/srv/assets/in{index}.css"),
                format!("in{index}.css"),
                "https://example.org/theme",
                last_modified,
            ));
        }
        builder.build()
    }

    async fn published_artifact(dir: &Path) -> (std::path::PathBuf, std::time::SystemTime) {
        let path = dir.join("hive-test.css");
        tokio::fs::write(&path, "body{}").await.expect("write artifact");
        let stored_at = tokio::fs::metadata(&path)
            .await
            .expect("stat artifact")
            .modified()
            .expect("mtime");
        (path, stored_at)
    }

    #[tokio::test]
    async fn missing_artifact_is_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let batch = batch_with_mtimes(&[0], std::time::SystemTime::now());
        assert!(is_stale(&dir.path().join("hive-absent.css"), &batch).await);
    }

    #[tokio::test]
    async fn newer_input_makes_artifact_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (path, stored_at) = published_artifact(dir.path()).await;
        let batch = batch_with_mtimes(&[-5, 5], stored_at);
        assert!(is_stale(&path, &batch).await);
    }

    #[tokio::test]
    async fn older_or_equal_inputs_are_fresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (path, stored_at) = published_artifact(dir.path()).await;
        let batch = batch_with_mtimes(&[-5, 0], stored_at);
        assert!(!is_stale(&path, &batch).await);
    }

    #[tokio::test]
    async fn empty_batch_is_never_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let batch = batch_with_mtimes(&[], std::time::SystemTime::now());
        assert!(!is_stale(&dir.path().join("hive-absent.css"), &batch).await);
    }
}
