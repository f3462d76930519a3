//! Zip bundle of a batch's outputs

use std::io::{Cursor, Seek, Write};

use chrono::NaiveDateTime;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::batch::SignedPdf;
use crate::error::{Result, SignerError};

/// Archive name for a batch finished at `at`
pub fn bundle_name(at: NaiveDateTime) -> String {
    format!("DVC_outputs_{}.zip", at.format("%Y%m%d_%H%M%S"))
}

/// Write every result into a deflate-compressed zip
pub fn write_bundle<W: Write + Seek>(writer: W, results: &[SignedPdf]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for result in results {
        zip.start_file(result.filename.as_str(), options)?;
        zip.write_all(&result.bytes)
            .map_err(|e| SignerError::Zip(e.into()))?;
    }
    Ok(zip.finish()?)
}

/// Zip the results in memory
pub fn bundle_bytes(results: &[SignedPdf]) -> Result<Vec<u8>> {
    Ok(write_bundle(Cursor::new(Vec::new()), results)?.into_inner())
}
