//! crates/studyforge_core/src/extract/pdf.rs
//!
//! PDF page loading plus the two page-budgeted extraction strategies. The
//! strategies are pure functions over per-page text so they can be tested
//! without PDF fixtures.

use lopdf::Document;
use std::collections::BTreeMap;

use super::sections::{extract_section_content, identify_sections};
use super::ExtractError;

/// Sections worth spending budget on when the whole document does not fit,
/// in priority order.
const PRIORITY_SECTIONS: &[&str] = &[
    "abstract",
    "introduction",
    "conclusion",
    "results",
    "discussion",
];

/// Loads a PDF and returns the text of each page in page order. A page
/// whose content stream cannot be decoded contributes an empty string; a
/// document that cannot be parsed at all is an error (the caller falls back
/// to byte salvage).
pub fn load_page_texts(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|_| ExtractError::Unparseable)?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractError::Unparseable);
    }
    Ok(pages
        .keys()
        .map(|number| doc.extract_text(&[*number]).unwrap_or_default())
        .collect())
}

/// Reads pages in order up to the budget, concatenating with a blank-line
/// separator. The section identifier runs opportunistically over the first
/// five pages.
pub fn sequential(pages: &[String], page_budget: usize) -> (String, BTreeMap<String, String>) {
    let mut text = String::new();
    let mut sections = BTreeMap::new();

    for (i, page) in pages.iter().take(page_budget).enumerate() {
        text.push_str(page);
        text.push_str("\n\n");
        if i < 5 {
            identify_sections(page, &mut sections);
        }
    }

    (text, sections)
}

/// Two-pass prioritized extraction for partial processing.
///
/// Pass one walks pages in order and spends budget on the first page seen
/// for each not-yet-captured priority section. Pass two re-scans from page
/// one, bounded by the remaining budget, appending pages whose text is not
/// already included. The restart from page one (rather than continuing past
/// the first pass) is long-standing behavior and is pinned by tests.
pub fn intelligent(pages: &[String], page_budget: usize) -> (String, BTreeMap<String, String>) {
    let mut text = String::new();
    let mut sections = BTreeMap::new();
    let mut pages_used = 0usize;

    for page in pages.iter().take(page_budget) {
        if pages_used >= page_budget {
            break;
        }
        let lower = page.to_lowercase();
        for section in PRIORITY_SECTIONS {
            if lower.contains(section) && !sections.contains_key(*section) {
                text.push_str(page);
                text.push_str("\n\n");
                sections.insert(section.to_string(), extract_section_content(page, section));
                pages_used += 1;
                break;
            }
        }
    }

    if pages_used < page_budget {
        for page in pages.iter().take(page_budget - pages_used) {
            if !text.contains(page.as_str()) {
                text.push_str(page);
                text.push_str("\n\n");
            }
        }
    }

    (text, sections)
}

/// Builds a minimal single-font PDF with one page per entry, for tests that
/// need to exercise the real loader.
#[cfg(test)]
pub(crate) fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
