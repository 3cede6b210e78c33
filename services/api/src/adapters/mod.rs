//! services/api/src/adapters/mod.rs
//!
//! Declares the concrete adapter implementations for the core service ports.

pub mod db;
pub mod study_llm;

pub use db::DbAdapter;
pub use study_llm::OpenAiStudyAdapter;
