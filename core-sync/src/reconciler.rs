//! # Reconciler
//!
//! Makes stored file metadata match the current state of a directory tree.
//!
//! ## Overview
//!
//! One reconciliation run walks the tree depth-first and, for every visited
//! directory, executes two passes strictly in sequence:
//!
//! 1. **Deletion pass** — records stored for the directory whose backing
//!    file no longer exists are removed in one committed transaction.
//! 2. **Insertion pass** — files on disk with no record yet are staged and
//!    bulk-inserted, flushing whenever the staged batch reaches the
//!    configured size or the directory's file list is exhausted.
//!
//! A directory's passes commit before the next directory begins, so a
//! failure leaves every previously visited directory fully applied. The
//! pre-insert existence check makes a rerun over an unchanged tree a no-op,
//! which is what makes retrying after a failure safe.
//!
//! The repository and the walk are injected; the reconciler owns no
//! connection state of its own.

use crate::walker::{DirectoryVisit, DirectoryWalker};
use crate::{Result, SyncError};
use core_catalog::{CatalogError, FileRecord, FileRecordId, FileRecordRepository, NewFileRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reconciler tuning knobs.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Staged inserts are flushed once the batch reaches this size.
    ///
    /// Bounds memory and transaction size on directories with very large
    /// file counts; the end of a directory always flushes whatever is
    /// staged, so no record is dropped by a short final batch.
    pub insert_batch_size: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            insert_batch_size: 7000,
        }
    }
}

/// Counters describing one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Directories visited by the walk
    pub directories_visited: u64,
    /// Records inserted for newly discovered files
    pub records_inserted: u64,
    /// Records deleted because their backing file is gone
    pub records_deleted: u64,
    /// Insert batches committed
    pub batches_committed: u64,
}

/// Reconciles a metadata store against a directory tree.
pub struct Reconciler {
    repository: Arc<dyn FileRecordRepository>,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a reconciler over the injected repository.
    pub fn new(repository: Arc<dyn FileRecordRepository>, config: ReconcilerConfig) -> Self {
        Self { repository, config }
    }

    /// Walk `root` and make the store match what is on disk.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidRoot`] when `root` is not a directory, and
    /// [`SyncError::Store`] when a store operation fails; in the latter case
    /// directories committed before the failure remain applied.
    #[instrument(skip_all)]
    pub async fn reconcile(&self, root: impl AsRef<Path>) -> Result<ReconcileStats> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SyncError::InvalidRoot(root.display().to_string()));
        }

        info!(root = %root.display(), "Starting reconciliation");
        self.reconcile_visits(DirectoryWalker::new(root)).await
    }

    /// Reconcile an explicit sequence of directory visits.
    ///
    /// Exposed separately so callers can drive the reconciler from a walk
    /// they already hold.
    pub async fn reconcile_visits(
        &self,
        visits: impl IntoIterator<Item = DirectoryVisit>,
    ) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        for visit in visits {
            let directory = FileRecord::normalize_directory(&visit.directory);
            self.purge_stale_records(&directory, &mut stats).await?;
            self.insert_discovered_files(&visit, &directory, &mut stats)
                .await?;
            stats.directories_visited += 1;
        }

        info!(
            directories = stats.directories_visited,
            inserted = stats.records_inserted,
            deleted = stats.records_deleted,
            batches = stats.batches_committed,
            "Reconciliation finished"
        );
        Ok(stats)
    }

    /// Deletion pass: drop records for `directory` whose backing file is gone.
    async fn purge_stale_records(
        &self,
        directory: &str,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        let records = self
            .repository
            .find_by_directory(directory)
            .await
            .map_err(store_error(directory))?;

        let stale: Vec<FileRecordId> = records
            .iter()
            .filter(|record| !record.backing_path().exists())
            .map(|record| record.id)
            .collect();

        if stale.is_empty() {
            return Ok(());
        }

        let removed = self
            .repository
            .delete_batch(&stale)
            .await
            .map_err(store_error(directory))?;

        debug!(directory, removed, "Purged records without backing files");
        stats.records_deleted += removed;
        Ok(())
    }

    /// Insertion pass: stage records for files not yet represented and flush
    /// them in bounded batches.
    async fn insert_discovered_files(
        &self,
        visit: &DirectoryVisit,
        directory: &str,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        let mut staged: Vec<NewFileRecord> = Vec::new();

        for file_name in &visit.files {
            let (name, extension) = FileRecord::split_name(file_name);

            // Pre-insert existence check; keeps repeated scans idempotent.
            let existing = self
                .repository
                .find_by_name_and_directory(&name, directory)
                .await
                .map_err(store_error(directory))?;
            if existing.is_some() {
                continue;
            }

            let path = visit.directory.join(file_name);
            let size_kb = match fs::metadata(&path) {
                Ok(metadata) => FileRecord::kilobytes(metadata.len()),
                Err(error) => {
                    warn!(file = %path.display(), error = %error, "File vanished during scan, skipping");
                    continue;
                }
            };

            staged.push(NewFileRecord {
                name,
                extension,
                directory_path: directory.to_string(),
                size_kb,
                comment: None,
            });

            if staged.len() >= self.config.insert_batch_size {
                self.flush_staged(&mut staged, directory, stats).await?;
            }
        }

        if !staged.is_empty() {
            self.flush_staged(&mut staged, directory, stats).await?;
        }

        Ok(())
    }

    async fn flush_staged(
        &self,
        staged: &mut Vec<NewFileRecord>,
        directory: &str,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        let inserted = self
            .repository
            .insert_batch(staged)
            .await
            .map_err(store_error(directory))?;

        debug!(directory, inserted, "Committed batch of discovered files");
        stats.records_inserted += inserted;
        stats.batches_committed += 1;
        staged.clear();
        Ok(())
    }
}

fn store_error(directory: &str) -> impl FnOnce(CatalogError) -> SyncError + '_ {
    move |source| SyncError::Store {
        directory: directory.to_string(),
        source,
    }
}
