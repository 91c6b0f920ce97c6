use std::path::PathBuf;

use thiserror::Error;
use vme::VmeError;

use crate::CatalogError;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("duplicate device tag {0:?}")]
    DuplicateTag(String),

    #[error("slot {slot}: {source}")]
    Card { slot: String, source: CatalogError },

    #[error("machine already started")]
    AlreadyStarted,

    #[error(transparent)]
    Vme(#[from] VmeError),

    #[error("invalid machine config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read machine config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
