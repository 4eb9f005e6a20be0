use core_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync root {0} is not a readable directory")]
    InvalidRoot(String),

    #[error("Store operation failed in directory {directory}: {source}")]
    Store {
        directory: String,
        #[source]
        source: CatalogError,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
