use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Backing file {path} is missing")]
    FileMissing { path: String },

    #[error("File operation failed on {path}: {source}")]
    FileOperation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ServiceError>;
