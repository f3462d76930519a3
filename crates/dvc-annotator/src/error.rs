use dvc_pdf::PdfError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
