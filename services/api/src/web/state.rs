//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use studyforge_core::{DocumentProcessor, QuotaService};

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub processor: DocumentProcessor,
    pub quotas: QuotaService,
}
