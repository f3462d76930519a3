//! dvc-annotator: heuristic annotation of ENERGY STAR DVC checklists
//!
//! The checklist PDFs carry no form fields, so every stage works from the
//! positions of rendered text:
//!
//! - `sections`: find the "Indoor Environmental Quality" heading per page
//! - `checkbox`: draw a red X beside "Yes" labels paired with a "No"
//! - `notes`: write "NA" after the IEQ section's "Notes:" label
//! - `signature`: fill the attestation paragraph and sign/date
//!
//! `pipeline` chains them for one document. Jitter comes from a caller-supplied
//! [`rand::Rng`] so runs can be made reproducible.

pub mod checkbox;
pub mod config;
pub mod error;
pub mod notes;
pub mod pipeline;
pub mod sections;
pub mod signature;

pub use checkbox::{find_yes_targets, mark_yes_boxes, plan_x_mark, XMark};
pub use config::{AnnotatorConfig, CheckboxConfig, Jitter, NotesConfig, SignatureConfig};
pub use error::{AnnotateError, Result};
pub use notes::{find_notes_targets, insert_ieq_notes, NotesTarget};
pub use pipeline::{annotate_bytes, annotate_document, AnnotateOptions, AnnotateSummary};
pub use sections::{find_ieq_sections, SectionMap, IEQ_HEADING};
pub use signature::{
    fill_signature_section, find_signature_page, pair_labels, SignatureOutcome, SignerInfo,
};
