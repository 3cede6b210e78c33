//! crates/studyforge_core/src/prompt.rs
//!
//! Prompt construction for the study-material model call: a lightweight
//! document-type classifier selects one of three templates, and the builder
//! appends the fixed JSON response contract. The structural contract is
//! identical across templates; only summary length targets and flashcard
//! emphasis differ.

use crate::domain::ProcessingDirective;

/// Which prompt template a document gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Academic,
    Technical,
    General,
}

/// Keyword rule table for technical documents, checked against the text.
const TECHNICAL_MARKERS: &[&str] = &["api", "implementation", "architecture", "configuration"];

/// Filename hints that also mark a document as technical.
const TECHNICAL_FILENAME_HINTS: &[&str] = &["technical", "spec"];

/// Classifies a document by scanning for marker vocabulary. Academic papers
/// need an abstract plus one early-section and one late-section marker;
/// technical documents need any one technical marker; everything else is
/// general.
pub fn detect_document_kind(text: &str, file_name: &str) -> PromptKind {
    let lower = text.to_lowercase();
    let name = file_name.to_lowercase();

    if lower.contains("abstract")
        && (lower.contains("introduction") || lower.contains("methodology"))
        && (lower.contains("results") || lower.contains("conclusion"))
    {
        return PromptKind::Academic;
    }

    if TECHNICAL_MARKERS.iter().any(|m| lower.contains(m))
        || TECHNICAL_FILENAME_HINTS.iter().any(|h| name.contains(h))
    {
        return PromptKind::Technical;
    }

    PromptKind::General
}

struct Template {
    role: &'static str,
    summary_words: &'static str,
    summary_focus: &'static str,
    flashcard_focus: &'static str,
}

const ACADEMIC: Template = Template {
    role: "You are an expert academic assistant specializing in analyzing research papers and academic documents.",
    summary_words: "250-350",
    summary_focus: "\
   - Research question or hypothesis
   - Methodology and approach
   - Key findings and statistical significance
   - Conclusions, implications, and limitations",
    flashcard_focus: "\
   - Core concepts and definitions
   - Methodology and key findings
   - Critical analysis and application questions",
};

const TECHNICAL: Template = Template {
    role: "You are a technical documentation expert.",
    summary_words: "200-300",
    summary_focus: "\
   - Technology or system overview
   - Key features and implementation details
   - Performance characteristics and use cases
   - Limitations and constraints",
    flashcard_focus: "\
   - Technical terminology and architecture
   - Key algorithms and processes
   - Best practices and troubleshooting",
};

const GENERAL: Template = Template {
    role: "You are an expert document analyst.",
    summary_words: "200-300",
    summary_focus: "\
   - Main topic and purpose
   - Key points and supporting evidence
   - Conclusions or recommendations
   - Practical implications",
    flashcard_focus: "\
   - Important concepts and key facts
   - Main arguments and applications
   - Critical thinking questions",
};

/// Builds the full instruction payload for one model call.
pub fn build_prompt(
    text: &str,
    kind: PromptKind,
    directive: &ProcessingDirective,
    partial: bool,
    pages_to_process: u32,
    total_pages: u32,
) -> String {
    let template = match kind {
        PromptKind::Academic => &ACADEMIC,
        PromptKind::Technical => &TECHNICAL,
        PromptKind::General => &GENERAL,
    };
    let range = directive.flashcard_range;

    let partial_notice = if partial {
        format!(
            "\nNote: You are analyzing {} of {} pages of this document. \
             State clearly in the summary that this is a partial analysis.\n",
            pages_to_process, total_pages
        )
    } else {
        String::new()
    };

    format!(
        r#"{role}

Analyze the following document and provide a comprehensive analysis.
{partial_notice}
IMPORTANT INSTRUCTIONS:
1. Create a detailed summary ({summary_words} words) covering:
{summary_focus}

2. Generate {min}-{max} high-quality study flashcards emphasizing:
{flashcard_focus}
   Use clear language and progress from basic to advanced concepts.

Document Text ({chars} characters from {total_pages} pages):
"""
{text}
"""

Please respond in the following JSON format:
{{
  "summary": "Your comprehensive summary here",
  "flashcards": [
    {{
      "front": "Question or concept to recall",
      "back": "Detailed answer or explanation"
    }}
  ],
  "key_topics": ["topic1", "topic2", "topic3"],
  "document_type": "research_paper|review|report|thesis|other",
  "confidence_score": 0.95,
  "extraction_coverage": "{coverage}"
}}

Respond ONLY with valid JSON, no additional text or markdown formatting."#,
        role = template.role,
        partial_notice = partial_notice,
        summary_words = template.summary_words,
        summary_focus = template.summary_focus,
        min = range.min,
        max = range.max,
        flashcard_focus = template.flashcard_focus,
        chars = text.chars().count(),
        total_pages = total_pages,
        text = text,
        coverage = if partial { "partial" } else { "complete" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FlashcardRange, ModelChoice};

    fn directive() -> ProcessingDirective {
        ProcessingDirective {
            model: ModelChoice::Fast,
            max_tokens: 2500,
            temperature: 0.3,
            flashcard_range: FlashcardRange { min: 8, max: 12 },
            max_processing_chars: 50_000,
        }
    }

    #[test]
    fn academic_needs_abstract_plus_body_markers() {
        let text = "Abstract ... Introduction ... Results ...";
        assert_eq!(detect_document_kind(text, "paper.pdf"), PromptKind::Academic);
        // An abstract alone is not enough.
        assert_ne!(
            detect_document_kind("Abstract only", "paper.pdf"),
            PromptKind::Academic
        );
    }

    #[test]
    fn technical_markers_and_filename_hints_both_count() {
        assert_eq!(
            detect_document_kind("the API accepts JSON", "doc.pdf"),
            PromptKind::Technical
        );
        assert_eq!(
            detect_document_kind("plain prose", "widget-spec.docx"),
            PromptKind::Technical
        );
    }

    #[test]
    fn everything_else_is_general() {
        assert_eq!(
            detect_document_kind("a story about gardening", "garden.pdf"),
            PromptKind::General
        );
    }

    #[test]
    fn prompt_carries_the_json_contract_and_flashcard_range() {
        let p = build_prompt("body text", PromptKind::General, &directive(), false, 10, 10);
        for field in [
            "\"summary\"",
            "\"flashcards\"",
            "\"key_topics\"",
            "\"document_type\"",
            "\"confidence_score\"",
            "\"extraction_coverage\"",
        ] {
            assert!(p.contains(field), "missing {}", field);
        }
        assert!(p.contains("Generate 8-12"));
        assert!(p.contains("Respond ONLY with valid JSON"));
        assert!(p.contains("\"complete\""));
    }

    #[test]
    fn partial_requests_state_the_page_fraction() {
        let p = build_prompt("body", PromptKind::Academic, &directive(), true, 30, 50);
        assert!(p.contains("analyzing 30 of 50 pages"));
        assert!(p.contains("partial analysis"));
        assert!(p.contains("\"partial\""));
    }
}
