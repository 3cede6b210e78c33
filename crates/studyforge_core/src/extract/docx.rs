//! crates/studyforge_core/src/extract/docx.rs
//!
//! DOCX text extraction. A DOCX has no true pagination, so the page count is
//! estimated from character volume and partial processing truncates the text
//! proportionally.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::sections::identify_sections;
use super::{salvage_text, truncate_to_chars, ExtractError};

/// Empirical average characters per printed page, used for the estimate.
const CHARS_PER_PAGE: usize = 3000;

pub struct DocxExtraction {
    pub text: String,
    pub page_count: u32,
    pub pages_processed: u32,
    pub partial: bool,
    pub sections: BTreeMap<String, String>,
}

/// Extracts text from a DOCX buffer under a page budget.
///
/// Reads `word/document.xml` out of the container and strips markup; a
/// buffer that is not a readable archive degrades to byte salvage rather
/// than failing.
pub fn extract(bytes: &[u8], page_budget: u32) -> Result<DocxExtraction, ExtractError> {
    let mut text = match document_xml(bytes) {
        Some(xml) => strip_markup(&xml),
        None => salvage_text(bytes)?,
    };
    if text.trim().is_empty() {
        return Err(ExtractError::Unparseable);
    }

    let total_chars = text.chars().count();
    let page_count = total_chars.div_ceil(CHARS_PER_PAGE).max(1) as u32;
    let pages_processed = page_count.min(page_budget);
    let partial = pages_processed < page_count;

    if partial {
        let chars_per_page = total_chars / page_count as usize;
        truncate_to_chars(&mut text, chars_per_page * pages_processed as usize);
    }

    let mut sections = BTreeMap::new();
    identify_sections(&text, &mut sections);

    Ok(DocxExtraction {
        text,
        page_count,
        pages_processed,
        partial,
        sections,
    })
}

fn document_xml(bytes: &[u8]) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).ok()?;
    let mut file = archive.by_name("word/document.xml").ok()?;
    let mut xml = String::new();
    file.read_to_string(&mut xml).ok()?;
    Some(xml)
}

/// Drops XML tags, decodes the handful of entities Word emits, and turns
/// paragraph boundaries into newlines.
fn strip_markup(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 2);
    let mut chars = xml.chars().peekable();
    let mut tag = String::new();

    while let Some(c) = chars.next() {
        if c == '<' {
            tag.clear();
            for t in chars.by_ref() {
                if t == '>' {
                    break;
                }
                tag.push(t);
            }
            // Paragraph and line-break elements become line breaks; every
            // other tag becomes a word separator so runs don't fuse.
            if tag == "/w:p" || tag.starts_with("w:br") {
                out.push('\n');
            } else {
                out.push(' ');
            }
        } else if c == '&' {
            let mut entity = String::new();
            for e in chars.by_ref() {
                if e == ';' {
                    break;
                }
                entity.push(e);
                if entity.len() > 8 {
                    break;
                }
            }
            match entity.as_str() {
                "amp" => out.push('&'),
                "lt" => out.push('<'),
                "gt" => out.push('>'),
                "quot" => out.push('"'),
                "apos" => out.push('\''),
                _ => {}
            }
        } else {
            out.push(c);
        }
    }

    // Collapse the space runs left behind by stripped tags, line by line.
    let mut cleaned = String::with_capacity(out.len());
    for line in out.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            cleaned.push_str(&line);
            cleaned.push('\n');
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document><w:body>"#,
    );
    for p in paragraphs {
        body.push_str("<w:p><w:r><w:t>");
        body.push_str(
            &p.replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;"),
        );
        body.push_str("</w:t></w:r></w:p>");
    }
    body.push_str("</w:body></w:document>");

    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_keeps_paragraph_breaks() {
        let bytes = build_docx(&["First paragraph.", "Second & third."]);
        let result = extract(&bytes, 100).unwrap();
        assert!(result.text.contains("First paragraph."));
        assert!(result.text.contains("Second & third."));
        assert!(result.text.contains('\n'));
        assert_eq!(result.page_count, 1);
        assert!(!result.partial);
    }

    #[test]
    fn estimates_pages_at_three_thousand_chars_each() {
        let paragraph = "x".repeat(2000);
        let bytes = build_docx(&[&paragraph, &paragraph]);
        let result = extract(&bytes, 100).unwrap();
        // ~4000 chars -> ceil(4000/3000) = 2 pages.
        assert_eq!(result.page_count, 2);
        assert_eq!(result.pages_processed, 2);
        assert!(!result.partial);
    }

    #[test]
    fn truncates_proportionally_under_a_page_budget() {
        let paragraph = "y".repeat(2999);
        let bytes = build_docx(&[&paragraph, &paragraph, &paragraph]);
        let result = extract(&bytes, 1).unwrap();
        assert_eq!(result.page_count, 3);
        assert_eq!(result.pages_processed, 1);
        assert!(result.partial);
        let kept = result.text.chars().count();
        assert!(kept <= 3005, "kept {} chars for a one-page budget", kept);
    }

    #[test]
    fn non_archive_bytes_degrade_to_salvage() {
        let result = extract(b"just some plain text, not a zip at all", 10).unwrap();
        assert!(result.text.contains("plain text"));
    }

    #[test]
    fn sections_are_identified_in_the_kept_text() {
        let bytes = build_docx(&["Abstract", "We measure latency across regions."]);
        let result = extract(&bytes, 10).unwrap();
        assert!(result.sections.contains_key("abstract"));
    }
}
