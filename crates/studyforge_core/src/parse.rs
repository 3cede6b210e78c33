//! crates/studyforge_core/src/parse.rs
//!
//! The response validator/parser. The upstream model is asked for JSON but
//! not guaranteed to produce it, so parsing never fails: a reply that cannot
//! be validated produces a degraded-but-coherent result instead. The
//! ok/degraded decision is made exactly once, here, and carried as a tagged
//! result.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::{DocumentType, ExtractionCoverage, Flashcard, StudyResult};

/// A model reply after validation. `Degraded` means the fallback path ran;
/// the request still succeeds, with the confidence score reflecting the
/// degradation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Ok(StudyResult),
    Degraded(StudyResult),
}

impl ParsedReply {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ParsedReply::Degraded(_))
    }

    pub fn into_result(self) -> StudyResult {
        match self {
            ParsedReply::Ok(r) | ParsedReply::Degraded(r) => r,
        }
    }
}

static SUMMARY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""summary"\s*:\s*"([^"]+)""#).unwrap());

/// Parses the model's raw text reply into a validated `StudyResult`.
///
/// `coverage` is the request's own partial/complete flag; the model's echoed
/// `extraction_coverage` field is untrusted and ignored.
pub fn parse(raw: &str, coverage: ExtractionCoverage) -> ParsedReply {
    let cleaned = strip_fences(raw);

    if let Some(result) = parse_valid(&cleaned, coverage) {
        return ParsedReply::Ok(result);
    }
    ParsedReply::Degraded(degraded_result(raw, coverage))
}

/// Strips Markdown code-fence wrappers, with or without a `json` tag.
fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_valid(cleaned: &str, coverage: ExtractionCoverage) -> Option<StudyResult> {
    let value: serde_json::Value = serde_json::from_str(cleaned).ok()?;

    // Structural validation: summary must be a non-empty string and
    // flashcards must be an array. Anything else falls to the degraded path.
    let summary = value.get("summary")?.as_str()?;
    if summary.trim().is_empty() {
        return None;
    }
    let cards = value.get("flashcards")?.as_array()?;

    // Malformed entries are filtered, never surfaced.
    let flashcards = cards
        .iter()
        .filter_map(|card| {
            let front = card.get("front")?.as_str()?;
            let back = card.get("back")?.as_str()?;
            if front.is_empty() || back.is_empty() {
                return None;
            }
            Some(Flashcard {
                front: front.to_string(),
                back: back.to_string(),
            })
        })
        .collect();

    let key_topics = value
        .get("key_topics")
        .and_then(|v| v.as_array())
        .map(|topics| {
            topics
                .iter()
                .filter_map(|t| t.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let document_type = value
        .get("document_type")
        .and_then(|v| v.as_str())
        .map(DocumentType::from_wire)
        .unwrap_or(DocumentType::Unknown);

    let confidence_score = value
        .get("confidence_score")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.8);

    Some(StudyResult {
        summary: summary.to_string(),
        flashcards,
        key_topics,
        document_type,
        confidence_score,
        extraction_coverage: coverage,
    })
}

/// The fallback: recover a summary from the raw text if possible, otherwise
/// use its first ~500 characters, and supply a single placeholder flashcard.
fn degraded_result(raw: &str, coverage: ExtractionCoverage) -> StudyResult {
    let summary = SUMMARY_PATTERN
        .captures(raw)
        .map(|c| c[1].to_string())
        .or_else(|| {
            let prefix: String = raw.trim().chars().take(500).collect();
            if prefix.is_empty() {
                None
            } else {
                Some(prefix)
            }
        })
        .unwrap_or_else(|| "Document processed successfully.".to_string());

    StudyResult {
        summary,
        flashcards: vec![Flashcard {
            front: "What is the main topic of this document?".to_string(),
            back: "Please review the summary for details.".to_string(),
        }],
        key_topics: vec!["Document Analysis".to_string()],
        document_type: DocumentType::Unknown,
        confidence_score: 0.5,
        extraction_coverage: coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: ExtractionCoverage = ExtractionCoverage::Complete;

    #[test]
    fn well_formed_reply_parses_cleanly() {
        let raw = r#"{
            "summary": "A study of tidal patterns.",
            "flashcards": [{"front": "Q", "back": "A"}],
            "key_topics": ["tides"],
            "document_type": "research_paper",
            "confidence_score": 0.92
        }"#;
        let reply = parse(raw, COMPLETE);
        assert!(!reply.is_degraded());
        let result = reply.into_result();
        assert_eq!(result.summary, "A study of tidal patterns.");
        assert_eq!(result.flashcards.len(), 1);
        assert_eq!(result.document_type, DocumentType::ResearchPaper);
        assert!((result.confidence_score - 0.92).abs() < 1e-6);
    }

    #[test]
    fn markdown_fences_are_stripped() {
        let raw = "```json\n{\"summary\": \"fenced\", \"flashcards\": []}\n```";
        let reply = parse(raw, COMPLETE);
        assert!(!reply.is_degraded());
        assert_eq!(reply.into_result().summary, "fenced");
    }

    #[test]
    fn invalid_flashcard_entries_are_filtered_silently() {
        let raw = r#"{"summary": "s", "flashcards": [
            {"front": "Q", "back": "A"},
            {"front": "", "back": "A"},
            {"front": "Q2"}
        ]}"#;
        let result = parse(raw, COMPLETE).into_result();
        assert_eq!(
            result.flashcards,
            vec![Flashcard {
                front: "Q".to_string(),
                back: "A".to_string()
            }]
        );
    }

    #[test]
    fn degraded_inputs_never_panic_and_stay_usable() {
        for raw in ["", "not json", "```json\n{broken", "{\"summary\":123}"] {
            let reply = parse(raw, COMPLETE);
            assert!(reply.is_degraded(), "expected degraded for {:?}", raw);
            let result = reply.into_result();
            assert!(!result.summary.is_empty());
            assert!(!result.flashcards.is_empty());
            assert_eq!(result.document_type, DocumentType::Unknown);
            assert!((result.confidence_score - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn degraded_path_recovers_summary_via_pattern_scan() {
        let raw = r#"Here is the analysis: {"summary": "recovered text", "flashcards": [}"#;
        let result = parse(raw, COMPLETE).into_result();
        assert_eq!(result.summary, "recovered text");
    }

    #[test]
    fn degraded_path_falls_back_to_reply_prefix() {
        let raw = "The model rambled instead of emitting JSON.";
        let result = parse(raw, COMPLETE).into_result();
        assert!(result.summary.starts_with("The model rambled"));
    }

    #[test]
    fn coverage_always_comes_from_the_request() {
        let raw = r#"{"summary": "s", "flashcards": [], "extraction_coverage": "complete"}"#;
        let result = parse(raw, ExtractionCoverage::Partial).into_result();
        assert_eq!(result.extraction_coverage, ExtractionCoverage::Partial);

        let result = parse("garbage", ExtractionCoverage::Partial).into_result();
        assert_eq!(result.extraction_coverage, ExtractionCoverage::Partial);
    }

    #[test]
    fn missing_optional_fields_get_defaults() {
        let raw = r#"{"summary": "s", "flashcards": []}"#;
        let result = parse(raw, COMPLETE).into_result();
        assert!(result.key_topics.is_empty());
        assert_eq!(result.document_type, DocumentType::Unknown);
        assert!((result.confidence_score - 0.8).abs() < 1e-6);
    }
}
