mod catalog;
mod manifest;
mod results;

use clap::ValueEnum;
use thiserror::Error;

pub use catalog::{read_catalog, write_catalog, CatalogRecord, FragmentRecord, ReadCatalogError};
pub use manifest::{parse_manifest, read_manifest, ReadManifestError};
pub use results::write_batch_results;

/// Layout of the per-batch results file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line.
    JsonLines,
    /// A single pretty-printed JSON array.
    Json,
}

#[derive(Error, Debug)]
pub enum WriteOutputError {
    #[error("colour {0} is not in the colour table")]
    UnknownColor(usize),
    #[error("serialization error")]
    Json(#[from] serde_json::Error),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}
