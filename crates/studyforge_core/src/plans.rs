//! crates/studyforge_core/src/plans.rs
//!
//! Static per-tier plan configuration. These tables are the single source of
//! truth for quota and budget decisions; they are never mutated at runtime.

use crate::domain::{FlashcardRange, PlanLimits, PlanTier};

/// How many files an anonymous visitor may process per day. The counter is
/// held client-side and supplied with each request; guests get no page
/// metering and are treated as within the free tier's page ceiling.
pub const GUEST_FILES_PER_DAY: u32 = 2;

const FREE: PlanLimits = PlanLimits {
    files_per_day: Some(2),
    files_per_month: None,
    pages_per_month: 100,
    max_file_size_mb: 10.0,
    max_processing_chars: 50_000,
    flashcard_range: FlashcardRange { min: 8, max: 12 },
    history_days: Some(7),
};

const STARTER: PlanLimits = PlanLimits {
    files_per_day: None,
    files_per_month: Some(30),
    pages_per_month: 500,
    max_file_size_mb: 15.0,
    max_processing_chars: 100_000,
    flashcard_range: FlashcardRange { min: 12, max: 18 },
    history_days: Some(30),
};

const PRO: PlanLimits = PlanLimits {
    files_per_day: None,
    files_per_month: Some(100),
    pages_per_month: 3_000,
    max_file_size_mb: 25.0,
    max_processing_chars: 150_000,
    flashcard_range: FlashcardRange { min: 20, max: 30 },
    history_days: None,
};

const ENTERPRISE: PlanLimits = PlanLimits {
    files_per_day: None,
    files_per_month: None,
    pages_per_month: 10_000,
    max_file_size_mb: 50.0,
    max_processing_chars: 200_000,
    flashcard_range: FlashcardRange { min: 30, max: 40 },
    history_days: None,
};

/// Returns the immutable limits for a plan tier.
pub fn limits(tier: PlanTier) -> &'static PlanLimits {
    match tier {
        PlanTier::Free => &FREE,
        PlanTier::Starter => &STARTER,
        PlanTier::Pro => &PRO,
        PlanTier::Enterprise => &ENTERPRISE,
    }
}
