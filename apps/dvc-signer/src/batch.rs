//! Batch processing of checklist files
//!
//! Each file is annotated independently. A failure is recorded against its
//! file and the batch moves on; results are kept in an explicit report rather
//! than written as a side effect, so the caller decides where they go.

use std::fs;
use std::path::{Path, PathBuf};

use dvc_annotator::{annotate_bytes, AnnotateOptions, AnnotatorConfig};
use rand::Rng;
use tracing::{error, info};

use crate::error::{Result, SignerError};

/// One annotated document ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPdf {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<SignedPdf>,
    pub failures: Vec<FailedPdf>,
}

impl BatchReport {
    /// True when there was input and none of it succeeded
    pub fn all_failed(&self) -> bool {
        self.results.is_empty() && !self.failures.is_empty()
    }

    /// Write every result into `dir`, creating it if needed
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| SignerError::io(dir, e))?;
        let mut written = Vec::with_capacity(self.results.len());
        for result in &self.results {
            let path = dir.join(&result.filename);
            fs::write(&path, &result.bytes).map_err(|e| SignerError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Display name of an input path
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Output file name for an input file name: `<stem>_signed.pdf`
///
/// Only the last extension is dropped, so `a.b.pdf` becomes `a.b_signed.pdf`.
pub fn output_name(input: &str) -> String {
    let stem = input.rsplit_once('.').map_or(input, |(stem, _)| stem);
    format!("{stem}_signed.pdf")
}

/// Annotate a single file
pub fn process_file<R: Rng + ?Sized>(
    path: &Path,
    options: &AnnotateOptions,
    config: &AnnotatorConfig,
    rng: &mut R,
) -> Result<SignedPdf> {
    let name = display_name(path);
    let bytes = fs::read(path).map_err(|e| SignerError::io(path, e))?;
    if bytes.is_empty() {
        return Err(SignerError::EmptyInput(name));
    }
    info!(
        file = %name,
        size_kb = %format!("{:.1}", bytes.len() as f64 / 1024.0),
        "processing"
    );

    let signed = annotate_bytes(&bytes, options, config, rng)?;
    Ok(SignedPdf {
        filename: output_name(&name),
        bytes: signed,
    })
}

/// Annotate every file, collecting successes and failures
///
/// # Errors
///
/// Fails up front when there are no files or no action is enabled; per-file
/// problems end up in [`BatchReport::failures`] instead.
pub fn process_batch<R: Rng + ?Sized>(
    paths: &[PathBuf],
    options: &AnnotateOptions,
    config: &AnnotatorConfig,
    rng: &mut R,
) -> Result<BatchReport> {
    if paths.is_empty() {
        return Err(SignerError::NoInputs);
    }
    if !options.any_enabled() {
        return Err(SignerError::NoActions);
    }

    let mut report = BatchReport::default();
    for path in paths {
        match process_file(path, options, config, rng) {
            Ok(signed) => {
                info!(output = %signed.filename, "signed");
                report.results.push(signed);
            }
            Err(e) => {
                let filename = display_name(path);
                error!(file = %filename, error = %e, "failed to process");
                report.failures.push(FailedPdf {
                    filename,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}
