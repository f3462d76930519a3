//! Section Locator

use std::collections::BTreeMap;

use dvc_pdf::{PdfDocument, Rect};
use tracing::debug;

use crate::error::Result;

/// Heading that opens the Indoor Environmental Quality section
pub const IEQ_HEADING: &str = "Indoor Environmental Quality";

/// Page index to the box of the IEQ heading on that page
pub type SectionMap = BTreeMap<usize, Rect>;

/// Record the first IEQ heading of every page that has one
///
/// Pages without the heading are absent from the map; an empty map is a valid
/// result.
pub fn find_ieq_sections(doc: &PdfDocument) -> Result<SectionMap> {
    let mut sections = SectionMap::new();
    for page in 0..doc.page_count() {
        if let Some(rect) = doc.search_for(page, IEQ_HEADING)?.first() {
            debug!(page, y0 = rect.y0, y1 = rect.y1, "found IEQ heading");
            sections.insert(page, *rect);
        }
    }
    Ok(sections)
}
