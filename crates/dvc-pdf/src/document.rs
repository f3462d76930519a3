//! PDF document wrapper using lopdf
//!
//! Pages are addressed by 0-based index. Reads (words, search) always see the
//! page content as loaded; drawing calls queue into a per-page overlay that is
//! written into the page content by [`PdfDocument::save_to_bytes`].

use std::cell::OnceCell;
use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{PdfError, Result};
use crate::fonts::{number, resolve};
use crate::geometry::{MediaBox, Point, Rect, Rgb};
use crate::overlay::{encode_overlay, OverlayItem, TextStyle, OVERLAY_FONT};
use crate::text::{decode_stream, extract_words, TextPage, Word};

/// A loaded PDF with per-page text caches and drawing overlays
pub struct PdfDocument {
    doc: Document,
    /// Page object IDs in page order
    page_ids: Vec<ObjectId>,
    text_pages: Vec<OnceCell<TextPage>>,
    overlays: BTreeMap<usize, Vec<OverlayItem>>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_ids.len())
            .field("overlay_pages", &self.overlays.len())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Load a PDF from raw bytes
    ///
    /// Empty input is rejected. Encrypted documents are opened with the empty
    /// user password (owner-only protection); any that need a password fail
    /// with [`PdfError::PasswordProtected`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PdfError::Empty);
        }

        let mut doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(_) if contains(bytes, b"/Encrypt") => return Err(PdfError::PasswordProtected),
            Err(e) => return Err(PdfError::Parse(e.to_string())),
        };
        if doc.trailer.get(b"Encrypt").is_ok() {
            doc.decrypt("").map_err(|e| {
                debug!(error = %e, "empty user password rejected");
                PdfError::PasswordProtected
            })?;
            debug!("opened with empty user password");
        }

        Ok(Self::from_document(doc))
    }

    /// Wrap an already parsed lopdf document
    pub fn from_document(doc: Document) -> Self {
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let text_pages = page_ids.iter().map(|_| OnceCell::new()).collect();
        Self {
            doc,
            page_ids,
            text_pages,
            overlays: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(PdfError::PageOutOfRange(index))
    }

    /// Look up a page attribute, walking up the page tree via /Parent
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = page_id;
        // Guard against cyclic /Parent chains
        for _ in 0..64 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(resolve(&self.doc, value));
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    fn media_box(&self, page_id: ObjectId) -> MediaBox {
        let values: Option<Vec<f64>> = self
            .inherited(page_id, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .filter_map(|o| number(resolve(&self.doc, o)))
                    .collect()
            });
        match values.as_deref() {
            Some([x0, y0, x1, y1]) => MediaBox {
                x0: x0.min(*x1),
                y0: y0.min(*y1),
                x1: x0.max(*x1),
                y1: y0.max(*y1),
            },
            _ => MediaBox::LETTER,
        }
    }

    /// Page width and height in points
    pub fn page_size(&self, index: usize) -> Result<(f64, f64)> {
        let mb = self.media_box(self.page_id(index)?);
        Ok((mb.width(), mb.height()))
    }

    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| PdfError::Parse(format!("failed to get page dictionary: {e}")))?;
        let Ok(contents) = page.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let streams: Vec<&Object> = match resolve(&self.doc, contents) {
            Object::Array(arr) => arr.iter().map(|o| resolve(&self.doc, o)).collect(),
            other => vec![other],
        };
        let mut content = Vec::new();
        for obj in streams {
            let stream = obj
                .as_stream()
                .map_err(|e| PdfError::Parse(format!("/Contents is not a stream: {e}")))?;
            if !content.is_empty() {
                content.push(b'\n');
            }
            content.extend_from_slice(&decode_stream(stream)?);
        }
        Ok(content)
    }

    /// Extracted text of a page, computed once and cached
    pub fn text_page(&self, index: usize) -> Result<&TextPage> {
        let page_id = self.page_id(index)?;
        if let Some(page) = self.text_pages[index].get() {
            return Ok(page);
        }

        let content = self.page_content(page_id)?;
        let empty = Dictionary::new();
        let resources = self
            .inherited(page_id, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .unwrap_or(&empty);
        let words = extract_words(&self.doc, &content, resources, self.media_box(page_id))?;
        debug!(page = index, words = words.len(), "extracted page text");
        Ok(self.text_pages[index].get_or_init(|| TextPage::from_words(words)))
    }

    /// All words of a page with their boxes
    pub fn words(&self, index: usize) -> Result<&[Word]> {
        Ok(self.text_page(index)?.words())
    }

    /// Boxes of every occurrence of `needle` on a page, in reading order
    pub fn search_for(&self, index: usize, needle: &str) -> Result<Vec<Rect>> {
        Ok(self.text_page(index)?.search(needle))
    }

    /// Queue a straight line segment
    pub fn draw_line(
        &mut self,
        index: usize,
        from: Point,
        to: Point,
        color: Rgb,
        width: f64,
    ) -> Result<()> {
        self.page_id(index)?;
        self.overlays
            .entry(index)
            .or_default()
            .push(OverlayItem::Line {
                from,
                to,
                color,
                width,
            });
        Ok(())
    }

    /// Queue Helvetica text with its baseline starting at `origin`
    pub fn insert_text(
        &mut self,
        index: usize,
        origin: Point,
        text: &str,
        style: &TextStyle,
    ) -> Result<()> {
        self.page_id(index)?;
        self.overlays
            .entry(index)
            .or_default()
            .push(OverlayItem::Text {
                origin,
                text: text.to_string(),
                style: style.clone(),
            });
        Ok(())
    }

    /// Operations queued for a page so far
    pub fn overlay(&self, index: usize) -> &[OverlayItem] {
        self.overlays.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of queued operations across all pages
    pub fn overlay_len(&self) -> usize {
        self.overlays.values().map(Vec::len).sum()
    }

    /// Write queued overlays into the pages and serialize the document
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>> {
        let overlays = std::mem::take(&mut self.overlays);
        if !overlays.is_empty() {
            let font_id = self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            for (index, items) in &overlays {
                if items.is_empty() {
                    continue;
                }
                let page_id = self.page_id(*index)?;
                self.flush_overlay(page_id, items, font_id)?;
            }
            // Content changed; cached text no longer matches
            self.text_pages = self.page_ids.iter().map(|_| OnceCell::new()).collect();
        }

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfError::Serialization(e.to_string()))?;
        Ok(buffer)
    }

    fn flush_overlay(
        &mut self,
        page_id: ObjectId,
        items: &[OverlayItem],
        font_id: ObjectId,
    ) -> Result<()> {
        let overlay_bytes = encode_overlay(items, self.media_box(page_id))?;

        // Isolate the original content's graphics state from the overlay
        let mut tail = b"Q\n".to_vec();
        tail.extend_from_slice(&overlay_bytes);
        let head_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let tail_id = self.doc.add_object(Stream::new(Dictionary::new(), tail));

        let mut resources = self
            .inherited(page_id, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        let mut fonts = match resources.get(b"Font") {
            Ok(obj) => resolve(&self.doc, obj)
                .as_dict()
                .cloned()
                .unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        fonts.set(OVERLAY_FONT, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        let existing = match self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| PdfError::Operation(e.to_string()))?
            .get(b"Contents")
        {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(_) => {
                return Err(PdfError::Operation(
                    "/Contents is not a reference or array".to_string(),
                ))
            }
            Err(_) => Vec::new(),
        };
        let mut contents = vec![Object::Reference(head_id)];
        contents.extend(existing);
        contents.push(Object::Reference(tail_id));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PdfError::Operation(e.to_string()))?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use lopdf::StringFormat;

    fn create_test_pdf(content: &[u8]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_from_bytes_empty_fails() {
        assert!(matches!(
            PdfDocument::from_bytes(&[]),
            Err(PdfError::Empty)
        ));
    }

    #[test]
    fn test_from_bytes_garbage_fails() {
        let result = PdfDocument::from_bytes(&[0u8; 100]);
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    const PASSWORD_PAD: [u8; 32] = [
        0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA,
        0x01, 0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE,
        0x64, 0x53, 0x69, 0x7A,
    ];

    fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut s: Vec<u8> = (0..=255).collect();
        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        let (mut i, mut j) = (0u8, 0u8);
        data.iter()
            .map(|&b| {
                i = i.wrapping_add(1);
                j = j.wrapping_add(s[i as usize]);
                s.swap(i as usize, j as usize);
                b ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
            })
            .collect()
    }

    /// Encrypt a fixture with the 40-bit RC4 standard handler
    fn encrypt_pdf(bytes: &[u8], user_password: &str) -> Vec<u8> {
        let mut doc = Document::load_mem(bytes).unwrap();
        let file_id = Object::String(b"dvc-fixture-0001".to_vec(), StringFormat::Hexadecimal);
        doc.trailer.set("ID", vec![file_id.clone(), file_id]);
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "Length" => 40,
            "O" => Object::String(vec![0x5A; 32], StringFormat::Hexadecimal),
            "P" => -4,
        });
        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));

        let key = lopdf::encryption::get_encryption_key(&doc, user_password, false).unwrap();
        doc.get_object_mut(encrypt_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set(
                "U",
                Object::String(rc4(&key, &PASSWORD_PAD), StringFormat::Hexadecimal),
            );

        let stream_ids: Vec<ObjectId> = doc
            .objects
            .iter()
            .filter(|(_, obj)| obj.as_stream().is_ok())
            .map(|(id, _)| *id)
            .collect();
        for id in stream_ids {
            let obj = doc.get_object(id).unwrap();
            let sealed = lopdf::encryption::decrypt_object(&key, id, obj).unwrap();
            doc.get_object_mut(id)
                .and_then(Object::as_stream_mut)
                .unwrap()
                .set_content(sealed);
        }

        let mut raw = Vec::new();
        doc.save_to(&mut raw).unwrap();
        raw
    }

    #[test]
    fn test_owner_only_encryption_opens() {
        let bytes = create_test_pdf(b"BT /F1 12 Tf 72 700 Td (Yes No) Tj ET");
        let encrypted = encrypt_pdf(&bytes, "");
        assert!(contains(&encrypted, b"/Encrypt"));

        let mut pdf = PdfDocument::from_bytes(&encrypted).unwrap();
        let texts: Vec<_> = pdf.words(0).unwrap().iter().map(|w| w.text.clone()).collect();
        assert_eq!(texts, vec!["Yes", "No"]);

        pdf.insert_text(0, Point::new(72.0, 150.0), "NA", &TextStyle::new(11.0, Rgb::RED))
            .unwrap();
        let saved = pdf.save_to_bytes().unwrap();
        let reloaded = PdfDocument::from_bytes(&saved).unwrap();
        assert_eq!(reloaded.search_for(0, "NA").unwrap().len(), 1);
    }

    #[test]
    fn test_user_password_rejected() {
        let bytes = create_test_pdf(b"BT /F1 12 Tf 72 700 Td (Yes) Tj ET");
        let encrypted = encrypt_pdf(&bytes, "hunter2");
        assert!(matches!(
            PdfDocument::from_bytes(&encrypted),
            Err(PdfError::PasswordProtected)
        ));
    }

    #[test]
    fn test_encrypt_without_handler_rejected() {
        let bytes = create_test_pdf(b"BT /F1 12 Tf 72 700 Td (Yes) Tj ET");
        let mut raw = Vec::new();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let encrypt_id = doc.add_object(dictionary! { "Filter" => "Standard" });
        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
        doc.save_to(&mut raw).unwrap();
        assert!(matches!(
            PdfDocument::from_bytes(&raw),
            Err(PdfError::PasswordProtected)
        ));
    }

    #[test]
    fn test_inherited_media_box_and_words() {
        let bytes = create_test_pdf(b"BT /F1 12 Tf 72 700 Td (Yes No) Tj ET");
        let pdf = PdfDocument::from_bytes(&bytes).unwrap();
        assert_eq!(pdf.page_size(0).unwrap(), (612.0, 792.0));
        let words = pdf.words(0).unwrap();
        assert_eq!(words.len(), 2);
        assert!((words[0].rect.y1 - (92.0 + 2.4)).abs() < 1e-6);
    }

    #[test]
    fn test_page_out_of_range() {
        let bytes = create_test_pdf(b"");
        let mut pdf = PdfDocument::from_bytes(&bytes).unwrap();
        assert!(matches!(pdf.words(3), Err(PdfError::PageOutOfRange(3))));
        assert!(pdf
            .draw_line(1, Point::new(0.0, 0.0), Point::new(1.0, 1.0), Rgb::RED, 1.0)
            .is_err());
    }

    #[test]
    fn test_save_flushes_overlay_into_page() {
        let bytes = create_test_pdf(b"BT /F1 12 Tf 72 700 Td (Notes:) Tj ET");
        let mut pdf = PdfDocument::from_bytes(&bytes).unwrap();
        let notes = pdf.search_for(0, "Notes:").unwrap()[0];
        pdf.insert_text(
            0,
            Point::new(notes.x1 + 10.0, notes.y1 + 8.0),
            "NA",
            &TextStyle::new(11.0, Rgb::RED),
        )
        .unwrap();
        pdf.draw_line(0, Point::new(10.0, 10.0), Point::new(20.0, 20.0), Rgb::RED, 1.2)
            .unwrap();
        assert_eq!(pdf.overlay(0).len(), 2);

        let saved = pdf.save_to_bytes().unwrap();
        assert_eq!(pdf.overlay_len(), 0);

        let reloaded = PdfDocument::from_bytes(&saved).unwrap();
        let texts: Vec<_> = reloaded
            .words(0)
            .unwrap()
            .iter()
            .map(|w| w.text.clone())
            .collect();
        assert_eq!(texts, vec!["Notes:", "NA"]);

        let na = reloaded.search_for(0, "NA").unwrap()[0];
        assert!((na.x0 - (notes.x1 + 10.0)).abs() < 0.01);

        let page_id = reloaded.page_id(0).unwrap();
        let page = reloaded.doc.get_dictionary(page_id).unwrap();
        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 3);

        let content = reloaded.page_content(page_id).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        let depth = ops.iter().fold(0i32, |d, op| match op.operator.as_str() {
            "q" => d + 1,
            "Q" => d - 1,
            _ => d,
        });
        assert_eq!(depth, 0);
    }

    #[test]
    fn test_save_without_overlay_keeps_contents() {
        let bytes = create_test_pdf(b"BT /F1 12 Tf 72 700 Td (Yes) Tj ET");
        let mut pdf = PdfDocument::from_bytes(&bytes).unwrap();
        let saved = pdf.save_to_bytes().unwrap();
        let reloaded = PdfDocument::from_bytes(&saved).unwrap();
        let page = reloaded
            .doc
            .get_dictionary(reloaded.page_id(0).unwrap())
            .unwrap();
        assert!(matches!(page.get(b"Contents"), Ok(Object::Reference(_))));
    }
}
