//! Batch driver for the DVC checklist annotator
//!
//! Reads checklist PDFs, runs the annotation pipeline on each, and writes the
//! `<stem>_signed.pdf` outputs, optionally bundled into one zip.

pub mod batch;
pub mod bundle;
pub mod error;

pub use batch::{output_name, process_batch, process_file, BatchReport, FailedPdf, SignedPdf};
pub use bundle::{bundle_bytes, bundle_name, write_bundle};
pub use error::SignerError;
