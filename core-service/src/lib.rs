//! Catalog service façade.
//!
//! Wires the catalog repository and the reconciler together for host
//! applications. An HTTP layer, desktop shell, or CLI owns routing and
//! request validation; this crate owns the operations themselves: syncing a
//! directory, windowed reads with count/size aggregates, and the
//! single-record mutations (rename/move, comment, upload, delete).

pub mod error;

pub use error::{Result, ServiceError};

use chrono::Utc;
use core_catalog::{
    CatalogError, FileRecord, FileRecordId, FileRecordRepository, NewFileRecord, Page, PageRequest,
    SqliteFileRecordRepository,
};
use core_sync::{ReconcileStats, Reconciler, ReconcilerConfig};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Count and aggregate size of a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub file_count: i64,
    pub total_size_kb: f64,
}

/// Metadata edits for one record; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// New file stem, without extension
    pub new_name: Option<String>,
    /// New directory the backing file moves to
    pub new_directory: Option<String>,
    /// New comment
    pub comment: Option<String>,
}

/// Primary façade exposed to host applications.
pub struct CatalogService {
    repository: Arc<dyn FileRecordRepository>,
    reconciler: Reconciler,
}

impl CatalogService {
    /// Create a service over an injected repository.
    pub fn new(
        repository: Arc<dyn FileRecordRepository>,
        reconciler_config: ReconcilerConfig,
    ) -> Self {
        let reconciler = Reconciler::new(repository.clone(), reconciler_config);
        Self {
            repository,
            reconciler,
        }
    }

    /// Convenience constructor using the SQLite repository over an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self::new(
            Arc::new(SqliteFileRecordRepository::new(pool)),
            ReconcilerConfig::default(),
        )
    }

    /// Reconcile `root` against the store, then read back the now-consistent
    /// rows under it.
    pub async fn sync_directory(
        &self,
        root: impl AsRef<Path>,
        page: PageRequest,
    ) -> Result<Page<FileRecord>> {
        self.reconciler.reconcile(root.as_ref()).await?;

        let directory = FileRecord::normalize_directory(root.as_ref());
        Ok(self
            .repository
            .query_by_directory_prefix(&directory, page)
            .await?)
    }

    /// Run reconciliation without reading rows back.
    pub async fn reconcile(&self, root: impl AsRef<Path>) -> Result<ReconcileStats> {
        Ok(self.reconciler.reconcile(root.as_ref()).await?)
    }

    /// Window over all stored records.
    pub async fn list(&self, page: PageRequest) -> Result<Page<FileRecord>> {
        Ok(self.repository.query(page).await?)
    }

    /// Fetch one record by id.
    ///
    /// # Errors
    /// [`CatalogError::NotFound`] (wrapped) when the id has no row.
    pub async fn get(&self, id: FileRecordId) -> Result<FileRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::Catalog(CatalogError::NotFound { id: id.0 }))
    }

    /// Window over the records stored under `directory` (itself and its
    /// subdirectories).
    pub async fn list_by_directory(
        &self,
        directory: &str,
        page: PageRequest,
    ) -> Result<Page<FileRecord>> {
        let directory = FileRecord::normalize_directory(directory);
        Ok(self
            .repository
            .query_by_directory_prefix(&directory, page)
            .await?)
    }

    /// Count and total size of the whole catalog.
    pub async fn summary(&self) -> Result<CatalogSummary> {
        Ok(CatalogSummary {
            file_count: self.repository.count().await?,
            total_size_kb: self.repository.total_size_kb().await?,
        })
    }

    /// Count and total size of the records under `directory`.
    pub async fn summary_for_directory(&self, directory: &str) -> Result<CatalogSummary> {
        let directory = FileRecord::normalize_directory(directory);
        Ok(CatalogSummary {
            file_count: self.repository.count_by_directory_prefix(&directory).await?,
            total_size_kb: self
                .repository
                .total_size_kb_by_directory_prefix(&directory)
                .await?,
        })
    }

    /// Apply metadata edits to one record and move its backing file to match.
    ///
    /// `modified_at` is stamped whenever any persisted field actually
    /// changes; an edit that changes nothing leaves the record untouched.
    /// The backing file is renamed before the row is written.
    pub async fn update(&self, id: FileRecordId, request: UpdateRequest) -> Result<FileRecord> {
        let record = self.get(id).await?;
        let mut updated = record.clone();

        if let Some(name) = request.new_name {
            updated.name = name;
        }
        if let Some(directory) = request.new_directory {
            updated.directory_path = FileRecord::normalize_directory(directory);
        }
        if let Some(comment) = request.comment {
            updated.comment = Some(comment);
        }

        let changed = updated.name != record.name
            || updated.directory_path != record.directory_path
            || updated.comment != record.comment;
        if !changed {
            return Ok(record);
        }
        updated.modified_at = Some(Utc::now().timestamp());

        let old_path = record.backing_path();
        let new_path = updated.backing_path();
        if new_path != old_path {
            if !old_path.exists() {
                return Err(ServiceError::FileMissing {
                    path: old_path.display().to_string(),
                });
            }
            fs::rename(&old_path, &new_path).map_err(|source| ServiceError::FileOperation {
                path: old_path.display().to_string(),
                source,
            })?;
            debug!(from = %old_path.display(), to = %new_path.display(), "Moved backing file");
        }

        self.repository.update(&updated).await?;
        Ok(updated)
    }

    /// Store uploaded contents on disk and record them in the catalog.
    pub async fn upload(
        &self,
        file_name: &str,
        contents: &[u8],
        directory: impl AsRef<Path>,
    ) -> Result<FileRecord> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory).map_err(|source| ServiceError::FileOperation {
            path: directory.display().to_string(),
            source,
        })?;

        let destination = directory.join(file_name);
        fs::write(&destination, contents).map_err(|source| ServiceError::FileOperation {
            path: destination.display().to_string(),
            source,
        })?;

        let (name, extension) = FileRecord::split_name(file_name);
        let record = self
            .repository
            .insert(&NewFileRecord {
                name,
                extension,
                directory_path: FileRecord::normalize_directory(directory),
                size_kb: FileRecord::kilobytes(contents.len() as u64),
                comment: None,
            })
            .await?;

        info!(id = %record.id, file = %destination.display(), "Uploaded file");
        Ok(record)
    }

    /// Remove one record's backing file from disk, then the record itself.
    pub async fn delete(&self, id: FileRecordId) -> Result<()> {
        let record = self.get(id).await?;
        let path = record.backing_path();

        if !path.exists() {
            return Err(ServiceError::FileMissing {
                path: path.display().to_string(),
            });
        }
        fs::remove_file(&path).map_err(|source| ServiceError::FileOperation {
            path: path.display().to_string(),
            source,
        })?;

        self.repository.delete(id).await?;
        info!(id = %id, "Deleted file and record");
        Ok(())
    }

    /// Resolve the on-disk path a host can stream a download from.
    pub async fn resolve_download(&self, id: FileRecordId) -> Result<PathBuf> {
        let record = self.get(id).await?;
        let path = record.backing_path();

        if !path.exists() {
            return Err(ServiceError::FileMissing {
                path: path.display().to_string(),
            });
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::db::create_test_pool;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    async fn service() -> CatalogService {
        let pool = create_test_pool().await.unwrap();
        CatalogService::from_pool(pool)
    }

    fn touch(path: &Path, bytes: usize) {
        let mut file = File::create(path).unwrap();
        file.write_all(&vec![0u8; bytes]).unwrap();
    }

    #[tokio::test]
    async fn sync_directory_reads_back_the_synced_rows() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("A")).unwrap();
        touch(&root.path().join("A/x.txt"), 1024);
        touch(&root.path().join("A/y.log"), 512);

        let service = service().await;
        let page = service
            .sync_directory(root.path(), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page
            .items
            .iter()
            .all(|record| record.directory_path.ends_with("/A")));

        let summary = service
            .summary_for_directory(&root.path().to_string_lossy())
            .await
            .unwrap();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.total_size_kb, 1.5);
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let service = service().await;

        let error = service.get(FileRecordId(99)).await.unwrap_err();
        assert!(matches!(
            error,
            ServiceError::Catalog(CatalogError::NotFound { id: 99 })
        ));
    }

    #[tokio::test]
    async fn upload_writes_the_file_and_the_record() {
        let root = TempDir::new().unwrap();
        let destination = root.path().join("incoming");

        let service = service().await;
        let record = service
            .upload("report.pdf", &[0u8; 2048], &destination)
            .await
            .unwrap();

        assert_eq!(record.name, "report");
        assert_eq!(record.extension, ".pdf");
        assert_eq!(record.size_kb, 2.0);
        assert!(record.backing_path().exists());

        let fetched = service.get(record.id).await.unwrap();
        assert_eq!(fetched.name, "report");
    }

    #[tokio::test]
    async fn update_renames_the_backing_file_and_stamps_modified_at() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service
            .upload("draft.md", b"notes", root.path())
            .await
            .unwrap();
        let old_path = record.backing_path();

        let updated = service
            .update(
                record.id,
                UpdateRequest {
                    new_name: Some("final".to_string()),
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "final");
        assert!(updated.modified_at.is_some());
        assert!(!old_path.exists());
        assert!(updated.backing_path().exists());

        let fetched = service.get(record.id).await.unwrap();
        assert_eq!(fetched.name, "final");
        assert_eq!(fetched.modified_at, updated.modified_at);
    }

    #[tokio::test]
    async fn update_moves_the_file_to_a_new_directory() {
        let root = TempDir::new().unwrap();
        let other = root.path().join("archive");
        std::fs::create_dir(&other).unwrap();

        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();

        let updated = service
            .update(
                record.id,
                UpdateRequest {
                    new_directory: Some(other.to_string_lossy().into_owned()),
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            updated.directory_path,
            FileRecord::normalize_directory(&other)
        );
        assert!(updated.backing_path().exists());
        assert!(!record.backing_path().exists());
    }

    #[tokio::test]
    async fn update_with_no_effective_change_leaves_the_record_alone() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();

        let unchanged = service
            .update(
                record.id,
                UpdateRequest {
                    new_name: Some("a".to_string()),
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap();

        assert!(unchanged.modified_at.is_none());
        assert!(record.backing_path().exists());
    }

    #[tokio::test]
    async fn comment_only_update_stamps_without_touching_the_file() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();

        let updated = service
            .update(
                record.id,
                UpdateRequest {
                    comment: Some("reviewed".to_string()),
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.comment.as_deref(), Some("reviewed"));
        assert!(updated.modified_at.is_some());
        assert!(record.backing_path().exists());
    }

    #[tokio::test]
    async fn update_fails_when_the_backing_file_is_gone() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();
        std::fs::remove_file(record.backing_path()).unwrap();

        let error = service
            .update(
                record.id,
                UpdateRequest {
                    new_name: Some("b".to_string()),
                    ..UpdateRequest::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(error, ServiceError::FileMissing { .. }));
    }

    #[tokio::test]
    async fn delete_removes_file_and_record() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();
        let path = record.backing_path();

        service.delete(record.id).await.unwrap();

        assert!(!path.exists());
        assert!(matches!(
            service.get(record.id).await.unwrap_err(),
            ServiceError::Catalog(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_fails_when_the_backing_file_is_gone() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();
        std::fs::remove_file(record.backing_path()).unwrap();

        let error = service.delete(record.id).await.unwrap_err();
        assert!(matches!(error, ServiceError::FileMissing { .. }));
    }

    #[tokio::test]
    async fn resolve_download_returns_the_backing_path() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        let record = service.upload("a.txt", b"aaa", root.path()).await.unwrap();

        let path = service.resolve_download(record.id).await.unwrap();
        assert_eq!(path, record.backing_path());

        std::fs::remove_file(&path).unwrap();
        let error = service.resolve_download(record.id).await.unwrap_err();
        assert!(matches!(error, ServiceError::FileMissing { .. }));
    }

    #[tokio::test]
    async fn list_windows_over_everything() {
        let root = TempDir::new().unwrap();
        let service = service().await;
        for i in 0..5 {
            service
                .upload(&format!("f{i}.txt"), b"x", root.path())
                .await
                .unwrap();
        }

        let page = service.list(PageRequest::new(3, 10)).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.file_count, 5);
    }
}
