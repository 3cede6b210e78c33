//! crates/studyforge_core/src/extract/sections.rs
//!
//! Heuristic section identification: scans raw page/paragraph text for
//! headings from a fixed vocabulary and captures a bounded excerpt after
//! each. Best-effort by design; missed sections are fine and never an error.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// The section vocabulary, kept as an explicit rule table: each logical
/// section maps to the heading keywords that indicate it, checked in order.
pub const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("abstract", &["abstract", "summary"]),
    ("introduction", &["introduction", "background"]),
    ("methodology", &["methodology", "methods", "materials and methods"]),
    ("results", &["results", "findings"]),
    ("conclusion", &["conclusion", "conclusions", "discussion"]),
];

/// A line that looks like the next section heading: at least 4 chars of
/// nothing but uppercase letters and whitespace.
static HEADING_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z\s]{4,}$").unwrap());

/// Scans `text` for known section headings and stores an excerpt per section
/// into `sections`. Already-populated keys are never overwritten.
pub fn identify_sections(text: &str, sections: &mut BTreeMap<String, String>) {
    let lower = text.to_lowercase();
    for (section, keywords) in SECTION_KEYWORDS {
        if sections.contains_key(*section) {
            continue;
        }
        for keyword in keywords.iter() {
            if lower.contains(keyword) {
                sections.insert(section.to_string(), extract_section_content(text, keyword));
                break;
            }
        }
    }
}

/// Accumulates the lines following the one containing `keyword`, stopping at
/// an ALL-CAPS heading-like line (once at least 5 lines are captured) or at
/// roughly 500 words.
pub fn extract_section_content(text: &str, keyword: &str) -> String {
    let mut capturing = false;
    let mut content = String::new();
    let mut line_count = 0usize;

    for line in text.lines() {
        if line.to_lowercase().contains(keyword) {
            capturing = true;
            continue;
        }
        if capturing {
            if line_count > 5 && HEADING_LINE.is_match(line.trim()) {
                break;
            }
            content.push_str(line);
            content.push('\n');
            line_count += 1;
            if content.split_whitespace().count() > 500 {
                break;
            }
        }
    }

    content.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sections_by_any_of_their_keywords() {
        let text = "Background\nThis study examines reaction rates.\n\
                    Findings\nRates doubled under heat.";
        let mut sections = BTreeMap::new();
        identify_sections(text, &mut sections);
        assert!(sections.contains_key("introduction"));
        assert!(sections.contains_key("results"));
        assert!(!sections.contains_key("methodology"));
    }

    #[test]
    fn does_not_overwrite_populated_sections() {
        let mut sections = BTreeMap::new();
        sections.insert("abstract".to_string(), "already here".to_string());
        identify_sections("Abstract\nsomething else entirely", &mut sections);
        assert_eq!(sections["abstract"], "already here");
    }

    #[test]
    fn excerpt_stops_at_an_all_caps_heading_after_five_lines() {
        let mut text = String::from("Introduction\n");
        for i in 0..8 {
            text.push_str(&format!("intro line {}\n", i));
        }
        text.push_str("RELATED WORK\n");
        text.push_str("should not appear\n");

        let excerpt = extract_section_content(&text, "introduction");
        assert!(excerpt.contains("intro line 7"));
        assert!(!excerpt.contains("should not appear"));
    }

    #[test]
    fn excerpt_is_capped_near_five_hundred_words() {
        let mut text = String::from("Methods\n");
        for _ in 0..200 {
            text.push_str("alpha beta gamma delta epsilon\n");
        }
        let excerpt = extract_section_content(&text, "methods");
        let words = excerpt.split_whitespace().count();
        assert!(words > 400 && words < 520, "captured {} words", words);
    }

    #[test]
    fn missing_sections_are_simply_absent() {
        let mut sections = BTreeMap::new();
        identify_sections("nothing relevant at all", &mut sections);
        assert!(sections.is_empty());
    }
}
