//! crates/studyforge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the processing pipeline.
//! These structs are independent of any database or HTTP layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The identity a processing request runs under.
///
/// Guests carry their own daily file counter (it lives client-side, supplied
/// per request); account holders are metered against persisted usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    User(Uuid),
    Guest { files_today: u32 },
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::User(id) => Some(*id),
            Identity::Guest { .. } => None,
        }
    }
}

/// A named subscription level with an associated `PlanLimits` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// Parses a stored tier name, falling back to the free tier for anything
    /// unrecognized (an inactive or unknown subscription is a free user).
    pub fn from_str_or_free(s: &str) -> Self {
        match s {
            "starter" => PlanTier::Starter,
            "pro" => PlanTier::Pro,
            "enterprise" => PlanTier::Enterprise,
            _ => PlanTier::Free,
        }
    }
}

/// The configured flashcard count range for a plan or directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRange {
    pub min: u32,
    pub max: u32,
}

/// Immutable per-tier configuration, loaded at startup and never mutated.
///
/// Exactly one of `files_per_day` / `files_per_month` is set per tier (daily
/// cap for free, monthly cap for paid); both `None` means unlimited files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub files_per_day: Option<u32>,
    pub files_per_month: Option<u32>,
    pub pages_per_month: u32,
    pub max_file_size_mb: f64,
    pub max_processing_chars: usize,
    pub flashcard_range: FlashcardRange,
    pub history_days: Option<u32>,
}

/// Per-user usage counters for the current daily/monthly periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub files_today: u32,
    pub files_this_month: u32,
    pub pages_this_month: u32,
    pub last_daily_reset: chrono::NaiveDate,
    pub last_monthly_reset: chrono::NaiveDate,
}

impl UsageSnapshot {
    /// A zeroed snapshot anchored at `today`, used for brand-new accounts.
    pub fn empty(today: chrono::NaiveDate) -> Self {
        Self {
            files_today: 0,
            files_this_month: 0,
            pages_this_month: 0,
            last_daily_reset: today,
            last_monthly_reset: today,
        }
    }
}

/// The supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
}

/// How to spend the page budget when it does not cover the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    Sequential,
    Intelligent,
}

/// The model tier a request is dispatched to. Concrete model ids are the
/// hosting layer's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Fast,
    Balanced,
    Powerful,
}

/// Per-request model invocation parameters, derived purely from file size
/// and plan by the budget allocator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingDirective {
    pub model: ModelChoice,
    pub max_tokens: u32,
    pub temperature: f32,
    pub flashcard_range: FlashcardRange,
    pub max_processing_chars: usize,
}

/// The transient output of text extraction for a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    /// Total pages in the source document (estimated for DOCX).
    pub page_count: u32,
    /// Pages actually extracted; `<= page_count`.
    pub pages_processed: u32,
    pub partial_processing: bool,
    pub extracted_chars: usize,
    /// Best-effort excerpts keyed by section name (abstract, introduction, ...).
    pub sections: BTreeMap<String, String>,
}

/// A single study flashcard. Both sides are guaranteed non-empty by the
/// response validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    ResearchPaper,
    Review,
    Report,
    Thesis,
    Other,
    Unknown,
}

impl DocumentType {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "research_paper" => DocumentType::ResearchPaper,
            "review" => DocumentType::Review,
            "report" => DocumentType::Report,
            "thesis" => DocumentType::Thesis,
            "other" => DocumentType::Other,
            _ => DocumentType::Unknown,
        }
    }
}

/// How much of the source document was actually analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionCoverage {
    Complete,
    Partial,
}

/// The externally visible result of a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyResult {
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub key_topics: Vec<String>,
    pub document_type: DocumentType,
    pub confidence_score: f32,
    pub extraction_coverage: ExtractionCoverage,
}

/// A processing-history record, persisted fire-and-forget after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub page_count: u32,
    pub pages_processed: u32,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub model: ModelChoice,
    pub extracted_chars: usize,
    pub partial_processing: bool,
}
