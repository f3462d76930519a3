//! Notes Filler

use dvc_pdf::{PdfDocument, Point, Rect, TextStyle};
use tracing::debug;

use crate::config::NotesConfig;
use crate::error::Result;
use crate::sections::SectionMap;

/// Where a "Notes:" label belonging to an IEQ section was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotesTarget {
    pub page: usize,
    pub label: Rect,
}

/// Locate the "Notes:" label that follows each IEQ heading
///
/// The first label below the heading on its own page wins; failing that, the
/// first label on the next page that has any. Sections with no label anywhere
/// after them yield nothing.
pub fn find_notes_targets(
    doc: &PdfDocument,
    sections: &SectionMap,
    cfg: &NotesConfig,
) -> Result<Vec<NotesTarget>> {
    let mut targets = Vec::new();
    for (&start, heading) in sections {
        let same_page = doc
            .search_for(start, &cfg.label)?
            .into_iter()
            .find(|r| r.y0 > heading.y1);
        if let Some(label) = same_page {
            targets.push(NotesTarget { page: start, label });
            continue;
        }

        let mut found = None;
        for page in start + 1..doc.page_count() {
            if let Some(&label) = doc.search_for(page, &cfg.label)?.first() {
                found = Some(NotesTarget { page, label });
                break;
            }
        }
        match found {
            Some(target) => targets.push(target),
            None => debug!(section_page = start, "no Notes label after IEQ heading"),
        }
    }
    Ok(targets)
}

/// Write "NA" beside the Notes label of every IEQ section
///
/// Returns the number of insertions.
pub fn insert_ieq_notes(
    doc: &mut PdfDocument,
    sections: &SectionMap,
    cfg: &NotesConfig,
) -> Result<usize> {
    let targets = find_notes_targets(doc, sections, cfg)?;
    let style = TextStyle::new(cfg.font_size, cfg.color);
    for target in &targets {
        let origin = Point::new(
            target.label.x1 + cfg.offset_x,
            target.label.y1 + cfg.offset_y,
        );
        debug!(page = target.page, x = origin.x, y = origin.y, "inserting IEQ notes text");
        doc.insert_text(target.page, origin, &cfg.text, &style)?;
    }
    Ok(targets.len())
}
