//! Depth-first directory walker
//!
//! Produces one [`DirectoryVisit`] per directory under a root: the
//! directory's path plus the names of the regular files directly inside it.
//! Traversal is lazy and finite, entries are visited in file-name order so a
//! fixed filesystem snapshot always yields the same sequence, and an
//! unreadable directory is skipped without failing the walk.

use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// One visited directory and the regular files directly contained in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryVisit {
    /// Path of the visited directory
    pub directory: std::path::PathBuf,
    /// Names of the regular files inside it, sorted
    pub files: Vec<String>,
}

/// Lazy depth-first iterator over the directories of a subtree.
pub struct DirectoryWalker {
    inner: walkdir::IntoIter,
}

impl DirectoryWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            inner: WalkDir::new(root).sort_by_file_name().into_iter(),
        }
    }

    /// Names of the regular files directly inside `directory`, sorted.
    ///
    /// Entries that vanish or cannot be inspected mid-listing are dropped;
    /// a directory that cannot be listed at all is an error.
    fn list_files(directory: &Path) -> io::Result<Vec<String>> {
        let mut files: Vec<String> = fs::read_dir(directory)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let file_type = entry.file_type().ok()?;
                file_type
                    .is_file()
                    .then(|| entry.file_name().to_string_lossy().into_owned())
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

impl Iterator for DirectoryWalker {
    type Item = DirectoryVisit;

    fn next(&mut self) -> Option<DirectoryVisit> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(error = %error, "Skipping unreadable path during walk");
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            match Self::list_files(entry.path()) {
                Ok(files) => {
                    return Some(DirectoryVisit {
                        directory: entry.into_path(),
                        files,
                    })
                }
                Err(error) => {
                    warn!(
                        directory = %entry.path().display(),
                        error = %error,
                        "Skipping unreadable directory"
                    );
                    continue;
                }
            }
        }
    }
}
