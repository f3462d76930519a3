use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Empty PDF content")]
    Empty,

    #[error("PDF is password-protected; cannot process")]
    PasswordProtected,

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Page {0} out of range")]
    PageOutOfRange(usize),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;
