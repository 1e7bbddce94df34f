//! Atomic publication of combined artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::CombineError;

/// Writes artifacts into the cache directory with single-writer-per-file
/// discipline.
///
/// Concurrent rebuilds of the same identity are allowed (they are idempotent);
/// the per-name lock plus write-to-temp-then-rename guarantees that readers
/// see complete old bytes or complete new bytes, never a mixture, and that a
/// failed write leaves no partial file behind.
pub(crate) struct Publisher {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Publisher {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            locks: DashMap::new(),
        }
    }

    pub async fn publish(&self, archive_name: &str, bytes: Bytes) -> Result<(), CombineError> {
        let lock = self.locks.entry(archive_name.to_string()).or_default().clone();
        let _guard = lock.lock().await;

        let target = self.dir.join(archive_name);
        // Drop the previous artifact and any compressed sibling so an external
        // compression wrapper cannot keep serving stale bytes beside fresh ones.
        let _ = fs::remove_file(&target).await;
        let _ = fs::remove_file(self.dir.join(format!("{archive_name}.gz"))).await;

        let staging = self.dir.join(format!(".{archive_name}.{}.tmp", Uuid::new_v4()));
        if let Err(source) = write_all(&staging, &bytes).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CombineError::write(target, source));
        }
        if let Err(source) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CombineError::write(target, source));
        }

        debug!(
            artifact = archive_name,
            bytes = bytes.len(),
            "Published combined artifact"
        );
        Ok(())
    }
}

async fn write_all(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
