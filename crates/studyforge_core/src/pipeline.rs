//! crates/studyforge_core/src/pipeline.rs
//!
//! The single entry point for document processing: quota check, cheap file
//! validation, budgeted extraction, model dispatch under a wall-clock
//! timeout, defensive parsing, then usage commit and fire-and-forget history.
//! Quota and validation failures are returned before any expensive work, and
//! a failed model call never consumes quota.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::budget;
use crate::domain::{
    ExtractionCoverage, ExtractionStrategy, FileKind, HistoryEntry, Identity, ModelChoice,
    StudyResult,
};
use crate::error::ProcessError;
use crate::extract;
use crate::parse;
use crate::ports::{HistoryStore, StudyModelService};
use crate::prompt;
use crate::quota::QuotaService;

/// A processing request as handed over by the upload layer.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub identity: Identity,
    pub file: Bytes,
    pub file_name: String,
    pub declared_mime: Option<String>,
    /// Defaults to intelligent extraction; only consulted when the page
    /// budget does not cover the whole document.
    pub strategy: Option<ExtractionStrategy>,
}

/// Coverage and accounting metadata for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ProcessingDetails {
    pub total_pages: u32,
    pub pages_processed: u32,
    pub partial_processing: bool,
    /// `pages_processed / total_pages`, rounded down to whole percent.
    pub coverage_percent: u32,
    pub extracted_chars: usize,
    pub model: ModelChoice,
    /// True when the response validator fell back to the degraded path.
    pub degraded_parse: bool,
    pub elapsed_ms: u64,
}

/// Remaining allowance after the run, for account-bound identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct UsageAfter {
    pub remaining_files: Option<u32>,
    pub remaining_pages: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessOutcome {
    pub result: StudyResult,
    pub details: ProcessingDetails,
    pub usage: Option<UsageAfter>,
}

/// The document-to-study-material pipeline. All collaborators are injected;
/// the hosting layer owns their lifetimes.
#[derive(Clone)]
pub struct DocumentProcessor {
    quotas: QuotaService,
    history: Arc<dyn HistoryStore>,
    model: Arc<dyn StudyModelService>,
    model_timeout: Duration,
}

impl DocumentProcessor {
    pub fn new(
        quotas: QuotaService,
        history: Arc<dyn HistoryStore>,
        model: Arc<dyn StudyModelService>,
        model_timeout: Duration,
    ) -> Self {
        Self {
            quotas,
            history,
            model,
            model_timeout,
        }
    }

    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutcome, ProcessError> {
        let started = Instant::now();
        let kind = detect_file_kind(&request.file_name, request.declared_mime.as_deref())?;
        let today = Utc::now().date_naive();

        let status = self.quotas.resolve(request.identity, today).await?;
        if !status.can_process {
            return Err(ProcessError::QuotaExceeded(status.reasons));
        }

        let file_size_mb = request.file.len() as f64 / (1024.0 * 1024.0);
        if file_size_mb > status.limits.max_file_size_mb {
            return Err(ProcessError::FileTooLarge {
                size_mb: file_size_mb,
                limit_mb: status.limits.max_file_size_mb,
            });
        }

        let strategy = request.strategy.unwrap_or(ExtractionStrategy::Intelligent);
        let remaining_pages = status.remaining_pages;
        let max_chars = status.limits.max_processing_chars;
        let bytes = request.file.clone();

        // Extraction is CPU-bound; keep it off the cooperative workers.
        let extraction = tokio::task::spawn_blocking(move || {
            extract::extract(&bytes, kind, remaining_pages, strategy, max_chars)
        })
        .await
        .map_err(|e| ProcessError::Internal(e.to_string()))?
        .map_err(|_| ProcessError::CorruptFile)?;

        // Scanned or image-only documents yield next to nothing.
        if extraction.text.trim().chars().count() < 50 {
            return Err(ProcessError::CorruptFile);
        }

        let allocation = budget::allocate(
            file_size_mb,
            status.plan,
            extraction.page_count,
            remaining_pages,
        );

        let doc_kind = prompt::detect_document_kind(&extraction.text, &request.file_name);
        let prompt_text = prompt::build_prompt(
            &extraction.text,
            doc_kind,
            &allocation.directive,
            allocation.partial,
            allocation.pages_to_process,
            extraction.page_count,
        );

        let raw_reply = tokio::time::timeout(
            self.model_timeout,
            self.model.generate(&prompt_text, &allocation.directive),
        )
        .await
        .map_err(|_| ProcessError::ModelTimeout)??;

        let coverage = if allocation.partial {
            ExtractionCoverage::Partial
        } else {
            ExtractionCoverage::Complete
        };
        let parsed = parse::parse(&raw_reply, coverage);
        let degraded_parse = parsed.is_degraded();
        if degraded_parse {
            warn!(
                file_name = %request.file_name,
                "model reply failed validation; returning degraded result"
            );
        }
        let result = parsed.into_result();

        // Counters move only after a successful model response.
        self.quotas
            .commit(request.identity, allocation.pages_to_process, today)
            .await?;

        let usage = request.identity.user_id().map(|_| UsageAfter {
            remaining_files: status.remaining_files.map(|f| f.saturating_sub(1)),
            remaining_pages: status.remaining_pages.saturating_sub(allocation.pages_to_process),
        });

        if let Identity::User(user_id) = request.identity {
            let entry = HistoryEntry {
                user_id,
                file_name: request.file_name.clone(),
                file_size_bytes: request.file.len() as u64,
                page_count: extraction.page_count,
                pages_processed: allocation.pages_to_process,
                summary: result.summary.clone(),
                flashcards: result.flashcards.clone(),
                model: allocation.directive.model,
                extracted_chars: extraction.extracted_chars,
                partial_processing: allocation.partial,
            };
            if let Err(e) = self.history.append_history(entry).await {
                warn!(error = %e, "failed to persist processing history");
            }
        }

        Ok(ProcessOutcome {
            result,
            details: ProcessingDetails {
                total_pages: extraction.page_count,
                pages_processed: allocation.pages_to_process,
                partial_processing: allocation.partial,
                coverage_percent: allocation.pages_to_process * 100 / extraction.page_count.max(1),
                extracted_chars: extraction.extracted_chars,
                model: allocation.directive.model,
                degraded_parse,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
            usage,
        })
    }
}

/// Resolves the file kind from the declared MIME type, falling back to the
/// filename extension.
pub fn detect_file_kind(file_name: &str, declared_mime: Option<&str>) -> Result<FileKind, ProcessError> {
    let name = file_name.to_lowercase();
    match declared_mime {
        Some("application/pdf") => return Ok(FileKind::Pdf),
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => {
            return Ok(FileKind::Docx)
        }
        _ => {}
    }
    if name.ends_with(".pdf") {
        Ok(FileKind::Pdf)
    } else if name.ends_with(".docx") {
        Ok(FileKind::Docx)
    } else {
        Err(ProcessError::UnsupportedFileType(
            declared_mime.unwrap_or(&name).to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlanTier, UsageSnapshot};
    use crate::extract::{docx::build_docx, pdf::build_pdf};
    use crate::testutil::{FakeBehavior, FakeModel, InMemoryStore};
    use uuid::Uuid;

    const VALID_REPLY: &str = r#"{
        "summary": "This paper measures sediment transport in estuaries.",
        "flashcards": [{"front": "What is measured?", "back": "Sediment transport."}],
        "key_topics": ["sediment", "estuaries"],
        "document_type": "research_paper",
        "confidence_score": 0.9
    }"#;

    struct Harness {
        store: Arc<InMemoryStore>,
        model: Arc<FakeModel>,
        processor: DocumentProcessor,
    }

    fn harness(model: FakeModel) -> Harness {
        harness_with_timeout(model, Duration::from_secs(5))
    }

    fn harness_with_timeout(model: FakeModel, timeout: Duration) -> Harness {
        let store = Arc::new(InMemoryStore::default());
        let model = Arc::new(model);
        let processor = DocumentProcessor::new(
            QuotaService::new(store.clone(), store.clone()),
            store.clone(),
            model.clone(),
            timeout,
        );
        Harness {
            store,
            model,
            processor,
        }
    }

    fn pdf_request(identity: Identity, pages: usize) -> ProcessRequest {
        let texts: Vec<String> = (1..=pages)
            .map(|n| format!("Page {} discusses sediment transport rates in detail.", n))
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        ProcessRequest {
            identity,
            file: Bytes::from(build_pdf(&refs)),
            file_name: "paper.pdf".to_string(),
            declared_mime: Some("application/pdf".to_string()),
            strategy: None,
        }
    }

    fn today() -> chrono::NaiveDate {
        Utc::now().date_naive()
    }

    #[tokio::test]
    async fn fifty_page_pdf_with_thirty_remaining_pages_is_partial() {
        let h = harness(FakeModel::replying(VALID_REPLY));
        let user = Uuid::new_v4();
        let mut usage = UsageSnapshot::empty(today());
        usage.pages_this_month = 70; // free plan: 100/month -> 30 remaining
        h.store.set_usage(user, usage);

        let outcome = h
            .processor
            .process(pdf_request(Identity::User(user), 50))
            .await
            .unwrap();

        assert_eq!(outcome.details.total_pages, 50);
        assert_eq!(outcome.details.pages_processed, 30);
        assert_eq!(outcome.details.coverage_percent, 60);
        assert!(outcome.details.partial_processing);
        assert_eq!(
            outcome.result.extraction_coverage,
            ExtractionCoverage::Partial
        );
        assert!(h.model.last_prompt().contains("analyzing 30 of 50 pages"));

        let snap = h.store.snapshot(user);
        assert_eq!(snap.files_today, 1);
        assert_eq!(snap.pages_this_month, 100);
        assert_eq!(outcome.usage.unwrap().remaining_pages, 0);
        assert_eq!(h.store.history_len(), 1);
    }

    #[tokio::test]
    async fn small_docx_is_processed_completely() {
        let h = harness(FakeModel::replying(VALID_REPLY));
        let paragraph = "w".repeat(2000);
        let request = ProcessRequest {
            identity: Identity::User(Uuid::new_v4()),
            file: Bytes::from(build_docx(&[&paragraph, &paragraph])),
            file_name: "notes.docx".to_string(),
            declared_mime: None,
            strategy: None,
        };

        let outcome = h.processor.process(request).await.unwrap();
        assert_eq!(outcome.details.total_pages, 2);
        assert_eq!(outcome.details.pages_processed, 2);
        assert!(!outcome.details.partial_processing);
        assert_eq!(
            outcome.result.extraction_coverage,
            ExtractionCoverage::Complete
        );
    }

    #[tokio::test]
    async fn quota_exhaustion_is_rejected_before_any_model_call() {
        let h = harness(FakeModel::replying(VALID_REPLY));
        let user = Uuid::new_v4();
        let mut usage = UsageSnapshot::empty(today());
        usage.files_today = 2; // free plan daily cap
        h.store.set_usage(user, usage);

        let err = h
            .processor
            .process(pdf_request(Identity::User(user), 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::QuotaExceeded(_)));
        assert!(h.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_files_are_rejected_cheaply() {
        let h = harness(FakeModel::replying(VALID_REPLY));
        let request = ProcessRequest {
            identity: Identity::Guest { files_today: 0 },
            file: Bytes::from(vec![0u8; 11 * 1024 * 1024]),
            file_name: "big.pdf".to_string(),
            declared_mime: Some("application/pdf".to_string()),
            strategy: None,
        };
        let err = h.processor.process(request).await.unwrap_err();
        assert!(matches!(err, ProcessError::FileTooLarge { .. }));
        assert!(h.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_extensions_are_rejected() {
        let h = harness(FakeModel::replying(VALID_REPLY));
        let request = ProcessRequest {
            identity: Identity::Guest { files_today: 0 },
            file: Bytes::from_static(b"plain text"),
            file_name: "notes.txt".to_string(),
            declared_mime: Some("text/plain".to_string()),
            strategy: None,
        };
        let err = h.processor.process(request).await.unwrap_err();
        assert!(matches!(err, ProcessError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn model_auth_failure_does_not_consume_quota() {
        let h = harness(FakeModel::with(FakeBehavior::Auth));
        let user = Uuid::new_v4();
        h.store.set_usage(user, UsageSnapshot::empty(today()));

        let err = h
            .processor
            .process(pdf_request(Identity::User(user), 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::ModelAuth));

        let snap = h.store.snapshot(user);
        assert_eq!(snap.files_today, 0);
        assert_eq!(snap.pages_this_month, 0);
        assert_eq!(h.store.history_len(), 0);
    }

    #[tokio::test]
    async fn rate_limits_surface_as_their_own_kind() {
        let h = harness(FakeModel::with(FakeBehavior::RateLimited));
        let err = h
            .processor
            .process(pdf_request(Identity::Guest { files_today: 0 }, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::ModelRateLimited));
    }

    #[tokio::test]
    async fn slow_model_calls_hit_the_wall_clock_budget() {
        let h = harness_with_timeout(
            FakeModel::with(FakeBehavior::Slow(
                Duration::from_millis(200),
                VALID_REPLY.to_string(),
            )),
            Duration::from_millis(20),
        );
        let err = h
            .processor
            .process(pdf_request(Identity::Guest { files_today: 0 }, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::ModelTimeout));
    }

    #[tokio::test]
    async fn unparseable_replies_still_succeed_with_a_degraded_result() {
        let h = harness(FakeModel::replying("the model went off script"));
        let user = Uuid::new_v4();

        let outcome = h
            .processor
            .process(pdf_request(Identity::User(user), 3))
            .await
            .unwrap();
        assert!(outcome.details.degraded_parse);
        assert!(!outcome.result.summary.is_empty());
        assert!(!outcome.result.flashcards.is_empty());
        // Degraded parsing is still a success: quota moves.
        assert_eq!(h.store.snapshot(user).files_today, 1);
    }

    #[tokio::test]
    async fn history_failures_never_fail_the_request() {
        let mut store = InMemoryStore::default();
        store.fail_history = true;
        let store = Arc::new(store);
        let model = Arc::new(FakeModel::replying(VALID_REPLY));
        let processor = DocumentProcessor::new(
            QuotaService::new(store.clone(), store.clone()),
            store.clone(),
            model,
            Duration::from_secs(5),
        );

        let outcome = processor
            .process(pdf_request(Identity::User(Uuid::new_v4()), 3))
            .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn guests_get_no_usage_block_and_no_history() {
        let h = harness(FakeModel::replying(VALID_REPLY));
        let outcome = h
            .processor
            .process(pdf_request(Identity::Guest { files_today: 0 }, 2))
            .await
            .unwrap();
        assert!(outcome.usage.is_none());
        assert_eq!(h.store.history_len(), 0);
    }
}
