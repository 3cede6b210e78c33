//! crates/studyforge_core/src/budget.rs
//!
//! The budget allocator: combines the document's page count with the plan's
//! remaining pages, and derives the model tier, token ceiling, and flashcard
//! range from file size and plan. Pure and deterministic; no I/O.

use crate::domain::{
    FlashcardRange, ModelChoice, PlanTier, ProcessingDirective,
};
use crate::plans;

/// Temperature for all study-material generation. Low to favor factual
/// consistency over creativity.
pub const TEMPERATURE: f32 = 0.3;

/// The final pages-to-process decision plus the derived model directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub pages_to_process: u32,
    pub partial: bool,
    pub directive: ProcessingDirective,
}

/// Decides how much of the document to process and with what parameters.
pub fn allocate(
    file_size_mb: f64,
    plan: PlanTier,
    total_pages: u32,
    remaining_pages: u32,
) -> Allocation {
    let limits = plans::limits(plan);
    let pages_to_process = total_pages.min(remaining_pages);
    let partial = pages_to_process < total_pages;

    Allocation {
        pages_to_process,
        partial,
        directive: ProcessingDirective {
            model: select_model(file_size_mb, plan),
            max_tokens: max_tokens(plan),
            temperature: TEMPERATURE,
            flashcard_range: flashcard_range(file_size_mb, plan),
            max_processing_chars: limits.max_processing_chars,
        },
    }
}

/// Cost-optimized model selection: a step function of file size and plan.
/// Small documents always get the fast tier; the free plan stretches the
/// fast tier up to its own size ceiling; everything else gets balanced.
fn select_model(file_size_mb: f64, plan: PlanTier) -> ModelChoice {
    if file_size_mb < 5.0 {
        return ModelChoice::Fast;
    }
    if file_size_mb < 10.0 && plan == PlanTier::Free {
        return ModelChoice::Fast;
    }
    ModelChoice::Balanced
}

fn max_tokens(plan: PlanTier) -> u32 {
    match plan {
        PlanTier::Pro | PlanTier::Enterprise => 4000,
        PlanTier::Free | PlanTier::Starter => 2500,
    }
}

/// Narrows the plan's configured flashcard range for small documents, and
/// shifts it toward the high end for medium documents on premium tiers.
fn flashcard_range(file_size_mb: f64, plan: PlanTier) -> FlashcardRange {
    let range = plans::limits(plan).flashcard_range;
    match plan {
        PlanTier::Pro | PlanTier::Enterprise => {
            if file_size_mb < 5.0 {
                FlashcardRange {
                    min: range.min,
                    max: range.min + 5,
                }
            } else if file_size_mb < 15.0 {
                FlashcardRange {
                    min: range.min + 5,
                    max: range.max.saturating_sub(5),
                }
            } else {
                range
            }
        }
        PlanTier::Free | PlanTier::Starter => {
            if file_size_mb < 5.0 {
                FlashcardRange {
                    min: range.min,
                    max: range.min + 2,
                }
            } else {
                range
            }
        }
    }
}
