//! Per-document pipeline
//!
//! Runs the stages in their fixed order over one loaded document: locate IEQ
//! sections, mark Yes boxes, fill IEQ notes, then sign.

use dvc_pdf::PdfDocument;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkbox::mark_yes_boxes;
use crate::config::AnnotatorConfig;
use crate::error::Result;
use crate::notes::insert_ieq_notes;
use crate::sections::{find_ieq_sections, SectionMap};
use crate::signature::{fill_signature_section, SignatureOutcome, SignerInfo};

/// Which annotations to apply, and who signs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateOptions {
    /// Mark every checkbox "Yes" above the IEQ section
    pub mark_yes: bool,
    /// Fill the paragraph blanks and sign/date
    pub sign: bool,
    /// Leave the IEQ section blank and write "NA" in its Notes
    pub ieq_notes: bool,
    pub signer: SignerInfo,
}

impl AnnotateOptions {
    /// True when at least one annotation is enabled
    pub fn any_enabled(&self) -> bool {
        self.mark_yes || self.sign || self.ieq_notes
    }
}

/// Counts of what the pipeline changed in one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotateSummary {
    pub pages: usize,
    pub sections: SectionMap,
    pub yes_marks: usize,
    pub notes: usize,
    pub signature: Option<SignatureOutcome>,
}

/// Apply the enabled stages to a loaded document
pub fn annotate_document<R: Rng + ?Sized>(
    doc: &mut PdfDocument,
    options: &AnnotateOptions,
    config: &AnnotatorConfig,
    rng: &mut R,
) -> Result<AnnotateSummary> {
    let mut summary = AnnotateSummary {
        pages: doc.page_count(),
        ..AnnotateSummary::default()
    };

    if options.mark_yes || options.ieq_notes {
        summary.sections = find_ieq_sections(doc)?;
    }

    if options.mark_yes {
        summary.yes_marks = mark_yes_boxes(doc, &summary.sections, &config.checkbox, rng)?;
    }

    if options.ieq_notes && !summary.sections.is_empty() {
        summary.notes = insert_ieq_notes(doc, &summary.sections, &config.notes)?;
    } else if options.ieq_notes {
        debug!("no IEQ heading found; skipping notes");
    }

    if options.sign {
        let signer = SignerInfo::new(options.signer.name.trim(), options.signer.date.trim());
        summary.signature = fill_signature_section(doc, &signer, &config.signature)?;
    }

    Ok(summary)
}

/// Load, annotate and serialize a PDF
///
/// # Errors
///
/// Returns [`crate::AnnotateError::Pdf`] for empty or password-protected
/// input, and for documents whose content cannot be read or written.
pub fn annotate_bytes<R: Rng + ?Sized>(
    bytes: &[u8],
    options: &AnnotateOptions,
    config: &AnnotatorConfig,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::from_bytes(bytes)?;
    let summary = annotate_document(&mut doc, options, config, rng)?;
    info!(
        pages = summary.pages,
        ieq_sections = summary.sections.len(),
        yes_marks = summary.yes_marks,
        notes = summary.notes,
        signature_page = summary.signature.as_ref().map(|s| s.page),
        "annotated document"
    );
    Ok(doc.save_to_bytes()?)
}
