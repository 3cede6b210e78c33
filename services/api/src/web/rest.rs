//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use studyforge_core::pipeline::{ProcessingDetails, UsageAfter};
use studyforge_core::{
    export, ExtractionStrategy, Flashcard, Identity, ProcessRequest, StudyResult,
};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload for a successfully processed document.
#[derive(Serialize)]
pub struct ProcessResponse {
    pub file_name: String,
    pub result: StudyResult,
    pub details: ProcessingDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageAfter>,
}

/// The response payload for the current-usage endpoint.
#[derive(Serialize)]
pub struct UsageResponse {
    pub plan: &'static str,
    pub can_process: bool,
    pub remaining_files: Option<u32>,
    pub remaining_pages: u32,
    pub reasons: Vec<String>,
}

//=========================================================================================
// Identity Resolution
//=========================================================================================

/// Resolves the caller's identity from request headers.
///
/// An `x-user-id` header selects the account-bound path. Without it the
/// request runs as a guest, with the guest's own daily counter supplied via
/// `x-guest-files-today` (absent means zero).
fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, ApiError> {
    if let Some(value) = headers.get("x-user-id") {
        let raw = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid x-user-id header".to_string()))?;
        let user_id = Uuid::parse_str(raw)
            .map_err(|_| ApiError::BadRequest("Invalid x-user-id format".to_string()))?;
        return Ok(Identity::User(user_id));
    }

    let files_today = headers
        .get("x-guest-files-today")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    Ok(Identity::Guest { files_today })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Process an uploaded document into a summary and flashcards.
///
/// Accepts a multipart/form-data request with a required `file` part and an
/// optional `strategy` text part (`sequential` or `intelligent`).
pub async fn process_document_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_from_headers(&headers)?;

    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut strategy: Option<ExtractionStrategy> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("untitled").to_string();
                let mime = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file bytes: {}", e))
                })?;
                file = Some((name, mime, data));
            }
            Some("strategy") => {
                let raw = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read strategy field: {}", e))
                })?;
                strategy = Some(match raw.as_str() {
                    "sequential" => ExtractionStrategy::Sequential,
                    "intelligent" => ExtractionStrategy::Intelligent,
                    other => {
                        return Err(ApiError::BadRequest(format!(
                            "Unknown extraction strategy '{}'",
                            other
                        )))
                    }
                });
            }
            _ => {}
        }
    }

    let (file_name, declared_mime, bytes) = file
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let outcome = app_state
        .processor
        .process(ProcessRequest {
            identity,
            file: bytes,
            file_name: file_name.clone(),
            declared_mime,
            strategy,
        })
        .await?;

    Ok(Json(ProcessResponse {
        file_name,
        result: outcome.result,
        details: outcome.details,
        usage: outcome.usage,
    }))
}

/// Report the caller's current quota standing without consuming anything.
pub async fn usage_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>, ApiError> {
    let identity = identity_from_headers(&headers)?;
    let today = Utc::now().date_naive();
    let status = app_state.quotas.resolve(identity, today).await?;

    Ok(Json(UsageResponse {
        plan: status.plan.as_str(),
        can_process: status.can_process,
        remaining_files: status.remaining_files,
        remaining_pages: status.remaining_pages,
        reasons: status.reasons,
    }))
}

/// Export a set of flashcards as an RFC 4180 CSV download.
pub async fn export_flashcards_handler(
    Json(cards): Json<Vec<Flashcard>>,
) -> Result<impl IntoResponse, ApiError> {
    if cards.is_empty() {
        return Err(ApiError::BadRequest(
            "No flashcards provided for export".to_string(),
        ));
    }
    let csv = export::flashcards_to_csv(&cards);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"flashcards.csv\"",
            ),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_header_selects_account_identity() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(&id.to_string()).unwrap());

        assert_eq!(identity_from_headers(&headers).unwrap(), Identity::User(id));
    }

    #[test]
    fn missing_headers_mean_a_fresh_guest() {
        let headers = HeaderMap::new();
        assert_eq!(
            identity_from_headers(&headers).unwrap(),
            Identity::Guest { files_today: 0 }
        );
    }

    #[test]
    fn guest_counter_is_read_from_its_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-guest-files-today", HeaderValue::from_static("2"));
        assert_eq!(
            identity_from_headers(&headers).unwrap(),
            Identity::Guest { files_today: 2 }
        );
    }

    #[test]
    fn malformed_user_id_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        assert!(identity_from_headers(&headers).is_err());
    }
}
