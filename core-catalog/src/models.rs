//! Domain models for the file catalog
//!
//! This module contains the persisted record types plus the path and size
//! conventions every producer of records must follow.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a file record, assigned by the database at insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct FileRecordId(pub i64);

impl fmt::Display for FileRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// Metadata for one file living in a tracked directory tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique identifier
    pub id: FileRecordId,
    /// File name without extension
    pub name: String,
    /// Extension including the leading dot, or empty
    pub extension: String,
    /// Normalized forward-slash directory path, no trailing separator
    pub directory_path: String,
    /// File size in kilobytes, rounded to 2 decimals
    pub size_kb: f64,
    /// When the record was inserted (epoch seconds)
    pub created_at: i64,
    /// When the metadata was last edited (epoch seconds)
    pub modified_at: Option<i64>,
    /// Free-form comment
    pub comment: Option<String>,
}

impl FileRecord {
    /// Absolute filesystem path this record claims to describe.
    pub fn backing_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}/{}{}",
            self.directory_path, self.name, self.extension
        ))
    }

    /// Normalize a directory path to the stored convention: forward slashes,
    /// no trailing separator. A bare root stays `/`.
    pub fn normalize_directory(path: impl AsRef<Path>) -> String {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Split a file name into `(stem, extension)` on the final dot.
    ///
    /// The extension keeps its leading dot; names without one (including
    /// dotfiles like `.gitignore`) get an empty extension.
    pub fn split_name(file_name: &str) -> (String, String) {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, extension)
    }

    /// Convert a byte count to kilobytes rounded to 2 decimals.
    pub fn kilobytes(bytes: u64) -> f64 {
        (bytes as f64 / 1024.0 * 100.0).round() / 100.0
    }
}

/// Insert candidate for a file record; the repository assigns `id` and
/// stamps `created_at` when the row is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFileRecord {
    pub name: String,
    pub extension: String,
    pub directory_path: String,
    pub size_kb: f64,
    pub comment: Option<String>,
}

impl NewFileRecord {
    /// Validate candidate data before it reaches the database.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("File name cannot be empty".to_string());
        }

        if self.directory_path.is_empty() {
            return Err("Directory path cannot be empty".to_string());
        }

        if self.directory_path.contains('\\') {
            return Err("Directory path must use forward slashes".to_string());
        }

        if !self.extension.is_empty() && !self.extension.starts_with('.') {
            return Err(format!(
                "Extension {} must start with a dot",
                self.extension
            ));
        }

        if self.size_kb < 0.0 {
            return Err("File size cannot be negative".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_with_extension() {
        assert_eq!(
            FileRecord::split_name("report.pdf"),
            ("report".to_string(), ".pdf".to_string())
        );
    }

    #[test]
    fn split_name_takes_final_dot() {
        assert_eq!(
            FileRecord::split_name("archive.tar.gz"),
            ("archive.tar".to_string(), ".gz".to_string())
        );
    }

    #[test]
    fn split_name_without_extension() {
        assert_eq!(
            FileRecord::split_name("Makefile"),
            ("Makefile".to_string(), String::new())
        );
    }

    #[test]
    fn split_name_dotfile_has_no_extension() {
        assert_eq!(
            FileRecord::split_name(".gitignore"),
            (".gitignore".to_string(), String::new())
        );
    }

    #[test]
    fn normalize_directory_replaces_backslashes() {
        assert_eq!(
            FileRecord::normalize_directory("C:\\data\\incoming"),
            "C:/data/incoming"
        );
    }

    #[test]
    fn normalize_directory_strips_trailing_separator() {
        assert_eq!(FileRecord::normalize_directory("/srv/files/"), "/srv/files");
        assert_eq!(
            FileRecord::normalize_directory("C:\\data\\"),
            "C:/data"
        );
    }

    #[test]
    fn normalize_directory_agrees_across_separators() {
        assert_eq!(
            FileRecord::normalize_directory("C:\\data\\incoming"),
            FileRecord::normalize_directory("C:/data/incoming")
        );
    }

    #[test]
    fn normalize_directory_keeps_bare_root() {
        assert_eq!(FileRecord::normalize_directory("/"), "/");
    }

    #[test]
    fn kilobytes_rounds_to_two_decimals() {
        assert_eq!(FileRecord::kilobytes(2048), 2.0);
        assert_eq!(FileRecord::kilobytes(512), 0.5);
        assert_eq!(FileRecord::kilobytes(1000), 0.98);
        assert_eq!(FileRecord::kilobytes(0), 0.0);
    }

    #[test]
    fn backing_path_joins_directory_name_extension() {
        let record = FileRecord {
            id: FileRecordId(1),
            name: "x".to_string(),
            extension: ".txt".to_string(),
            directory_path: "/srv/files/A".to_string(),
            size_kb: 1.0,
            created_at: 1699200000,
            modified_at: None,
            comment: None,
        };
        assert_eq!(record.backing_path(), PathBuf::from("/srv/files/A/x.txt"));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let candidate = NewFileRecord {
            name: "  ".to_string(),
            extension: ".txt".to_string(),
            directory_path: "/srv/files".to_string(),
            size_kb: 1.0,
            comment: None,
        };
        assert!(candidate.validate().is_err());
    }

    #[test]
    fn validate_rejects_extension_without_dot() {
        let candidate = NewFileRecord {
            name: "x".to_string(),
            extension: "txt".to_string(),
            directory_path: "/srv/files".to_string(),
            size_kb: 1.0,
            comment: None,
        };
        assert!(candidate.validate().is_err());
    }

    #[test]
    fn validate_accepts_empty_extension() {
        let candidate = NewFileRecord {
            name: "Makefile".to_string(),
            extension: String::new(),
            directory_path: "/srv/files".to_string(),
            size_kb: 0.25,
            comment: None,
        };
        assert!(candidate.validate().is_ok());
    }
}
