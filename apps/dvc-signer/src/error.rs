//! Error types for the batch signer

use std::path::PathBuf;

use dvc_annotator::AnnotateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Please provide at least one PDF")]
    NoInputs,

    #[error("Select at least one action")]
    NoActions,

    #[error("{0}: empty file (try selecting it again)")]
    EmptyInput(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Annotate(#[from] AnnotateError),

    #[error("Failed to build zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl SignerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SignerError>;
