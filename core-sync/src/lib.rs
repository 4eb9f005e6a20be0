//! # Sync & Reconciliation Module
//!
//! Keeps the file catalog consistent with a directory tree on disk.
//!
//! ## Overview
//!
//! This module owns the full-tree rescan path:
//! - Walking a directory tree depth-first (`walker`)
//! - Purging records whose backing file is gone and bulk-inserting newly
//!   discovered files in bounded batches (`reconciler`)
//!
//! The catalog repository is injected; running the reconciler twice over an
//! unchanged tree leaves the store untouched.

pub mod error;
pub mod reconciler;
pub mod walker;

pub use error::{Result, SyncError};
pub use reconciler::{ReconcileStats, Reconciler, ReconcilerConfig};
pub use walker::{DirectoryVisit, DirectoryWalker};
