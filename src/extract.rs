//! PDF text extraction.
//!
//! Opens a [`SourceDocument`]'s bytes as a paginated document and joins the
//! text of every page in physical order. Page boundaries are not marked in
//! the output. A document that parses but has no pages yields an empty
//! string; anything that does not parse is [`Error::UnparseableDocument`].
//! Partial text is never returned.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{ExtractedText, SourceDocument};

/// The PDF header may appear anywhere in the first 1024 bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A document that exposes its pages' plain text.
pub trait PagedDocument {
    fn page_count(&self) -> usize;
    /// Text of the page at zero-based `index`.
    fn page_text(&self, index: usize) -> std::result::Result<String, String>;
}

/// Converts a source document into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, doc: &SourceDocument) -> Result<ExtractedText>;
}

/// Concatenate every page's text with no separator. Fails on the first page
/// that cannot be read.
pub fn concat_pages(doc: &dyn PagedDocument) -> std::result::Result<String, String> {
    let mut out = String::new();
    for index in 0..doc.page_count() {
        let text = doc
            .page_text(index)
            .map_err(|e| format!("page {}: {}", index + 1, e))?;
        out.push_str(&text);
    }
    Ok(out)
}

/// True when the `%PDF-` magic appears within the header window.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// [`PagedDocument`] over a parsed `lopdf` document.
pub struct LopdfDocument {
    doc: lopdf::Document,
    /// Page numbers (1-based) in physical order.
    pages: Vec<u32>,
}

impl LopdfDocument {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        if !looks_like_pdf(bytes) {
            return Err(Error::UnparseableDocument(
                "missing %PDF- header".to_string(),
            ));
        }
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| Error::UnparseableDocument(e.to_string()))?;
        doc.catalog()
            .map_err(|e| Error::UnparseableDocument(format!("no document catalog: {}", e)))?;
        let pages = doc.get_pages().into_keys().collect();
        Ok(Self { doc, pages })
    }
}

impl PagedDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> std::result::Result<String, String> {
        let number = self
            .pages
            .get(index)
            .ok_or_else(|| format!("no page at index {}", index))?;
        self.doc
            .extract_text(&[*number])
            .map_err(|e| e.to_string())
    }
}

/// Default extractor: `lopdf` page by page, falling back to `pdf-extract`
/// for the whole document if any page cannot be decoded.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, doc: &SourceDocument) -> Result<ExtractedText> {
        let bytes = doc.bytes();
        let paged = LopdfDocument::load(bytes)?;
        let pages = paged.page_count();
        if pages == 0 {
            debug!(origin = %doc.origin(), "document has no pages");
            return Ok(ExtractedText::default());
        }

        let text = match concat_pages(&paged) {
            Ok(text) => text,
            Err(e) => {
                warn!(origin = %doc.origin(), error = %e, "page decoding failed, retrying with pdf-extract");
                pdf_extract::extract_text_from_mem(bytes)
                    .map_err(|e| Error::UnparseableDocument(e.to_string()))?
            }
        };

        debug!(origin = %doc.origin(), pages, chars = text.chars().count(), "text extracted");
        Ok(ExtractedText::new(text))
    }
}
