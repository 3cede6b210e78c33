//! services/api/src/web/mod.rs
//!
//! Declares the modules for the web layer.

pub mod rest;
pub mod state;

pub use rest::{export_flashcards_handler, process_document_handler, usage_handler};
