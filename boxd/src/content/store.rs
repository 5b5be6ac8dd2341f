//! §4.B Content store: digest-addressed blob store with ingest sessions.
//!
//! Blob layout: `<root>/<algo>/<hex>`. Ingest layout:
//! `<root>/ingest/<session-id>/` holding files named by their
//! digest-in-progress, verified and renamed into place on commit.

use super::digest::Digest;
use boxd_shared::errors::{CoreError, CoreResult};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(root.join("ingest"))?;
        Ok(Self { root })
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.path_segment())
    }

    fn ingest_dir(&self, session_id: &str) -> PathBuf {
        self.root.join("ingest").join(session_id)
    }

    /// Returns the blob's path iff present.
    pub fn get(&self, digest: &Digest) -> Option<PathBuf> {
        let path = self.blob_path(digest);
        path.is_file().then_some(path)
    }

    /// Opens a new ingest session and returns its id plus staging directory.
    pub fn new_ingest_session(&self) -> CoreResult<(String, PathBuf)> {
        let id = uuid::Uuid::new_v4().to_string();
        let dir = self.ingest_dir(&id);
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(session_id = %id, "opened ingest session");
        Ok((id, dir))
    }

    /// Verifies and commits every staged file in the session. On the first
    /// digest mismatch, the whole session fails with `Integrity` and its
    /// staging directory is left untouched for operator inspection (§4.B
    /// failure model) — call [`Self::cancel_ingest_session`] to reap it.
    pub fn complete_ingest_session(&self, session_id: &str) -> CoreResult<Vec<Digest>> {
        let dir = self.ingest_dir(session_id);
        if !dir.is_dir() {
            return Err(CoreError::NotFound(format!(
                "ingest session '{session_id}' does not exist"
            )));
        }

        let entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();

        let verified: Vec<(PathBuf, Digest)> = entries
            .par_iter()
            .map(|path| verify_staged_file(path))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut committed = Vec::with_capacity(verified.len());
        for (staged_path, digest) in verified {
            let target = self.blob_path(&digest);
            if target.is_file() {
                // Content-identical by construction; discard the duplicate.
                std::fs::remove_file(&staged_path)?;
            } else {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::rename(&staged_path, &target)?;
            }
            committed.push(digest);
        }

        std::fs::remove_dir_all(&dir)?;
        tracing::debug!(session_id = %session_id, count = committed.len(), "committed ingest session");
        Ok(committed)
    }

    /// Discards the staging directory unconditionally.
    pub fn cancel_ingest_session(&self, session_id: &str) -> CoreResult<()> {
        let dir = self.ingest_dir(session_id);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Deletes the given blobs if present; returns the deleted set and
    /// bytes reclaimed.
    pub fn delete_by_digests(&self, digests: &[Digest]) -> CoreResult<(HashSet<Digest>, u64)> {
        let mut deleted = HashSet::new();
        let mut bytes = 0u64;
        for digest in digests {
            let path = self.blob_path(digest);
            if let Ok(meta) = std::fs::metadata(&path) {
                std::fs::remove_file(&path)?;
                bytes += meta.len();
                deleted.insert(digest.clone());
            }
        }
        Ok((deleted, bytes))
    }

    /// Garbage-collects by reachability: deletes every blob whose digest is
    /// not in `keep`.
    pub fn delete_keeping(&self, keep: &HashSet<Digest>) -> CoreResult<(HashSet<Digest>, u64)> {
        let mut deleted = HashSet::new();
        let mut bytes = 0u64;

        for algo_entry in std::fs::read_dir(&self.root)?.filter_map(|e| e.ok()) {
            let algo_path = algo_entry.path();
            if !algo_path.is_dir() || algo_entry.file_name() == "ingest" {
                continue;
            }
            let algo = algo_entry.file_name().to_string_lossy().to_string();

            for blob_entry in std::fs::read_dir(&algo_path)?.filter_map(|e| e.ok()) {
                let blob_path = blob_entry.path();
                if !blob_path.is_file() {
                    continue;
                }
                let hex = blob_entry.file_name().to_string_lossy().to_string();
                let digest = Digest { algo: algo.clone(), hex };
                if !keep.contains(&digest) {
                    if let Ok(meta) = std::fs::metadata(&blob_path) {
                        std::fs::remove_file(&blob_path)?;
                        bytes += meta.len();
                        deleted.insert(digest);
                    }
                }
            }
        }

        Ok((deleted, bytes))
    }
}

fn verify_staged_file(path: &Path) -> CoreResult<(PathBuf, Digest)> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::Internal(format!("staged file '{}' has no filename", path.display())))?;
    let claimed: Digest = filename.parse()?;

    if claimed.algo != "sha256" {
        return Err(CoreError::Unsupported(format!(
            "digest algorithm '{}' is not supported",
            claimed.algo
        )));
    }

    let bytes = std::fs::read(path)?;
    let actual = Digest::sha256(&bytes);
    if actual != claimed {
        return Err(CoreError::Integrity(format!(
            "staged file '{}' does not match its claimed digest '{}' (actual: '{}')",
            path.display(),
            claimed,
            actual
        )));
    }

    Ok((path.to_path_buf(), claimed))
}
