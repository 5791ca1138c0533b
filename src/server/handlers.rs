//! Endpoint handlers for the query surface.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::AppState;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Substring search over content, location, and mission names.
///
/// A missing `q` is a caller error, not an empty search.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let Some(query) = params.q else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "missing query parameter 'q'" })),
        )
            .into_response();
    };

    match state.repo.search(&query).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("search for '{}' failed: {}", query, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "search failed" })),
            )
                .into_response()
        }
    }
}

/// Indexing progress as last persisted by the indexing loop.
pub async fn indexing_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.status.observed_indexing())
}

/// Acquisition progress and instantaneous throughput.
pub async fn download_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.status.download_snapshot())
}

/// Corpus listing: the documents currently on disk per subcorpus, plus
/// the indexed record count.
pub async fn corpus_summary(State(state): State<AppState>) -> impl IntoResponse {
    let indexed = state.repo.count().await.unwrap_or(0);

    let subcorpora: Vec<serde_json::Value> = state
        .subcorpora
        .iter()
        .map(|subcorpus| {
            serde_json::json!({
                "name": subcorpus,
                "documents": list_documents(&state.data_dir.join(subcorpus)),
            })
        })
        .collect();

    Json(serde_json::json!({
        "indexed_documents": indexed,
        "subcorpora": subcorpora,
    }))
}

/// Corpus filenames in one subcorpus directory, sorted; a missing
/// directory reads as empty.
fn list_documents(dir: &std::path::Path) -> Vec<String> {
    let mut files: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case(crate::config::DOCUMENT_EXTENSION))
                    .unwrap_or(false)
            })
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}
