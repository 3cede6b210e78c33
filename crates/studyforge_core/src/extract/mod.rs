//! crates/studyforge_core/src/extract/mod.rs
//!
//! The text extractor: turns a raw document buffer into bounded plain text
//! plus page accounting, under a page budget and a character budget. A file
//! that cannot be parsed degrades to reading its bytes as text; only a
//! genuinely unreadable buffer is an error.

pub mod docx;
pub mod pdf;
pub mod sections;

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::{ExtractionResult, ExtractionStrategy, FileKind};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No readable text could be produced, even via byte salvage.
    #[error("document could not be read as text")]
    Unparseable,
}

static CRLF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static EXCESS_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{3,}").unwrap());

/// Extracts text from `bytes` under `page_budget` pages, then clamps to
/// `max_chars`. The two truncation mechanisms compose: page-based first,
/// character clamp second.
pub fn extract(
    bytes: &[u8],
    kind: FileKind,
    page_budget: u32,
    strategy: ExtractionStrategy,
    max_chars: usize,
) -> Result<ExtractionResult, ExtractError> {
    let (mut text, page_count, pages_processed, partial, sections) = match kind {
        FileKind::Pdf => match pdf::load_page_texts(bytes) {
            Ok(pages) => {
                let page_count = pages.len() as u32;
                let pages_processed = page_count.min(page_budget);
                let partial = pages_processed < page_count;
                let (text, sections) = if partial && strategy == ExtractionStrategy::Intelligent {
                    pdf::intelligent(&pages, pages_processed as usize)
                } else {
                    pdf::sequential(&pages, pages_processed as usize)
                };
                (text, page_count, pages_processed, partial, sections)
            }
            // Corrupt PDF: salvage whatever text the bytes hold and treat
            // the document as a single page.
            Err(_) => {
                let text = salvage_text(bytes)?;
                (text, 1, 1, false, Default::default())
            }
        },
        FileKind::Docx => {
            let d = docx::extract(bytes, page_budget)?;
            (d.text, d.page_count, d.pages_processed, d.partial, d.sections)
        }
    };

    text = cleanup_text(&text);
    truncate_to_chars(&mut text, max_chars);
    let extracted_chars = text.chars().count();

    Ok(ExtractionResult {
        text,
        page_count,
        pages_processed,
        partial_processing: partial,
        extracted_chars,
        sections,
    })
}

/// Normalizes line endings and collapses runaway whitespace.
fn cleanup_text(text: &str) -> String {
    let text = CRLF.replace_all(text, "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = EXCESS_SPACES.replace_all(&text, "  ");
    text.trim().to_string()
}

/// Truncates in place to at most `max_chars` characters, on a char boundary.
pub(crate) fn truncate_to_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
}

/// Last-resort extraction for unparseable files: read the bytes as text and
/// keep only printable ASCII, collapsing everything else into spaces.
pub(crate) fn salvage_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let lossy = String::from_utf8_lossy(bytes);
    let mut out = String::with_capacity(lossy.len().min(64 * 1024));
    let mut pending_space = false;
    for c in lossy.chars() {
        if (' '..='~').contains(&c) && c != ' ' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    if out.is_empty() {
        return Err(ExtractError::Unparseable);
    }
    Ok(out)
}
