//! File record repository trait and SQLite implementation
//!
//! This is the storage contract the reconciler and the service façade
//! consume. Batch operations own their transaction: one call is one
//! committed unit of work, so a failed batch leaves no partial rows behind.

use crate::error::{CatalogError, Result};
use crate::models::{FileRecord, FileRecordId, NewFileRecord};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

/// File record repository interface for data access operations
#[async_trait]
pub trait FileRecordRepository: Send + Sync {
    /// Fetch every record stored for one normalized directory path.
    async fn find_by_directory(&self, directory: &str) -> Result<Vec<FileRecord>>;

    /// Find a record by `(name, directory_path)`.
    ///
    /// The reconciler uses this as its pre-insert existence check, so a
    /// `Ok(Some(_))` means the file is already represented.
    async fn find_by_name_and_directory(
        &self,
        name: &str,
        directory: &str,
    ) -> Result<Option<FileRecord>>;

    /// Insert a batch of candidates inside one committed transaction.
    ///
    /// Returns the number of rows written. Validation failures reject the
    /// whole batch before any row is touched.
    async fn insert_batch(&self, records: &[NewFileRecord]) -> Result<u64>;

    /// Delete a batch of records inside one committed transaction.
    ///
    /// Returns the number of rows removed; ids with no matching row are
    /// silently ignored.
    async fn delete_batch(&self, ids: &[FileRecordId]) -> Result<u64>;

    /// Find a record by its ID.
    async fn find_by_id(&self, id: FileRecordId) -> Result<Option<FileRecord>>;

    /// Insert a single record, returning the stored row.
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord>;

    /// Update an existing record.
    ///
    /// # Errors
    /// Returns [`CatalogError::NotFound`] when no row matches the id.
    async fn update(&self, record: &FileRecord) -> Result<()>;

    /// Delete a record by ID.
    ///
    /// # Returns
    /// - `Ok(true)` if the record was deleted
    /// - `Ok(false)` if the record was not found
    async fn delete(&self, id: FileRecordId) -> Result<bool>;

    /// Query all records with an offset/limit window.
    async fn query(&self, page_request: PageRequest) -> Result<Page<FileRecord>>;

    /// Query records whose directory is the given path or lives under it.
    async fn query_by_directory_prefix(
        &self,
        directory: &str,
        page_request: PageRequest,
    ) -> Result<Page<FileRecord>>;

    /// Count all stored records.
    async fn count(&self) -> Result<i64>;

    /// Sum of `size_kb` over all stored records.
    async fn total_size_kb(&self) -> Result<f64>;

    /// Count records whose directory is the given path or lives under it.
    async fn count_by_directory_prefix(&self, directory: &str) -> Result<i64>;

    /// Sum of `size_kb` over records under the given directory.
    async fn total_size_kb_by_directory_prefix(&self, directory: &str) -> Result<f64>;
}

/// SQLite implementation of FileRecordRepository
pub struct SqliteFileRecordRepository {
    pool: SqlitePool,
}

impl SqliteFileRecordRepository {
    /// Create a new repository over an existing pool handle.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn validate_candidate(record: &NewFileRecord) -> Result<()> {
        record.validate().map_err(|msg| CatalogError::InvalidInput {
            field: "FileRecord".to_string(),
            message: msg,
        })
    }
}

const INSERT_SQL: &str = r#"
    INSERT INTO file_records (name, extension, directory_path, size_kb, created_at, modified_at, comment)
    VALUES (?, ?, ?, ?, ?, NULL, ?)
"#;

const PREFIX_FILTER: &str = "(directory_path = ? OR directory_path LIKE ? || '/%')";

#[async_trait]
impl FileRecordRepository for SqliteFileRecordRepository {
    async fn find_by_directory(&self, directory: &str) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM file_records WHERE directory_path = ? ORDER BY name ASC, extension ASC",
        )
        .bind(directory)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_by_name_and_directory(
        &self,
        name: &str,
        directory: &str,
    ) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM file_records WHERE name = ? AND directory_path = ? LIMIT 1",
        )
        .bind(name)
        .bind(directory)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_batch(&self, records: &[NewFileRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        for record in records {
            Self::validate_candidate(record)?;
        }

        let created_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(INSERT_SQL)
                .bind(&record.name)
                .bind(&record.extension)
                .bind(&record.directory_path)
                .bind(record.size_kb)
                .bind(created_at)
                .bind(&record.comment)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(rows = records.len(), "Committed insert batch");
        Ok(records.len() as u64)
    }

    async fn delete_batch(&self, ids: &[FileRecordId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;

        for id in ids {
            let result = sqlx::query("DELETE FROM file_records WHERE id = ?")
                .bind(*id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;

        debug!(rows = removed, "Committed delete batch");
        Ok(removed)
    }

    async fn find_by_id(&self, id: FileRecordId) -> Result<Option<FileRecord>> {
        let record =
            sqlx::query_as::<_, FileRecord>("SELECT * FROM file_records WHERE id = ? LIMIT 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        Self::validate_candidate(record)?;

        let created_at = Utc::now().timestamp();
        let result = sqlx::query(INSERT_SQL)
            .bind(&record.name)
            .bind(&record.extension)
            .bind(&record.directory_path)
            .bind(record.size_kb)
            .bind(created_at)
            .bind(&record.comment)
            .execute(&self.pool)
            .await?;

        Ok(FileRecord {
            id: FileRecordId(result.last_insert_rowid()),
            name: record.name.clone(),
            extension: record.extension.clone(),
            directory_path: record.directory_path.clone(),
            size_kb: record.size_kb,
            created_at,
            modified_at: None,
            comment: record.comment.clone(),
        })
    }

    async fn update(&self, record: &FileRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET name = ?, extension = ?, directory_path = ?, size_kb = ?, modified_at = ?, comment = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.name)
        .bind(&record.extension)
        .bind(&record.directory_path)
        .bind(record.size_kb)
        .bind(record.modified_at)
        .bind(&record.comment)
        .bind(record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound { id: record.id.0 });
        }

        Ok(())
    }

    async fn delete(&self, id: FileRecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM file_records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, page_request: PageRequest) -> Result<Page<FileRecord>> {
        let total = self.count().await?;

        let items = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM file_records ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(page_request.limit))
        .bind(i64::from(page_request.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total as u64, page_request))
    }

    async fn query_by_directory_prefix(
        &self,
        directory: &str,
        page_request: PageRequest,
    ) -> Result<Page<FileRecord>> {
        let total = self.count_by_directory_prefix(directory).await?;

        let sql = format!(
            "SELECT * FROM file_records WHERE {PREFIX_FILTER} \
             ORDER BY directory_path ASC, name ASC, id ASC LIMIT ? OFFSET ?"
        );
        let items = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(directory)
            .bind(directory)
            .bind(i64::from(page_request.limit))
            .bind(i64::from(page_request.offset))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total as u64, page_request))
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM file_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn total_size_kb(&self) -> Result<f64> {
        let total =
            sqlx::query_scalar::<_, f64>("SELECT COALESCE(SUM(size_kb), 0.0) FROM file_records")
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    async fn count_by_directory_prefix(&self, directory: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM file_records WHERE {PREFIX_FILTER}");
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(directory)
            .bind(directory)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn total_size_kb_by_directory_prefix(&self, directory: &str) -> Result<f64> {
        let sql =
            format!("SELECT COALESCE(SUM(size_kb), 0.0) FROM file_records WHERE {PREFIX_FILTER}");
        let total = sqlx::query_scalar::<_, f64>(&sql)
            .bind(directory)
            .bind(directory)
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }
}
