pub mod budget;
pub mod domain;
pub mod error;
pub mod export;
pub mod extract;
pub mod parse;
pub mod pipeline;
pub mod plans;
pub mod ports;
pub mod prompt;
pub mod quota;

#[cfg(test)]
pub(crate) mod testutil;

pub use domain::{
    ExtractionCoverage, ExtractionResult, ExtractionStrategy, FileKind, Flashcard, FlashcardRange,
    HistoryEntry, Identity, ModelChoice, PlanLimits, PlanTier, ProcessingDirective, StudyResult,
    UsageSnapshot,
};
pub use error::ProcessError;
pub use pipeline::{DocumentProcessor, ProcessOutcome, ProcessRequest};
pub use ports::{
    HistoryStore, ModelError, PlanStore, PortError, PortResult, StudyModelService, UsageStore,
};
pub use quota::{QuotaService, QuotaStatus};
