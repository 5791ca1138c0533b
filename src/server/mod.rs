//! HTTP query surface over the indexed corpus.
//!
//! Read-only: search, status, and a small corpus summary. The indexing
//! and acquisition loops usually run in other processes, so indexing
//! status is read through the durable snapshot.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::repository::IndexRepository;
use crate::services::StatusBoard;

/// Shared state for the query surface.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<IndexRepository>,
    pub status: Arc<StatusBoard>,
    pub data_dir: PathBuf,
    pub subcorpora: Vec<String>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let repo = IndexRepository::new(&settings.database_path())?;
        Ok(Self {
            repo: Arc::new(repo),
            status: Arc::new(StatusBoard::new(settings.status_file_path())),
            data_dir: settings.data_dir.clone(),
            subcorpora: settings.subcorpora.clone(),
        })
    }
}

/// Start the query surface.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::models::{DocumentMetadata, IndexedRecord};

    async fn setup_test_app() -> (axum::Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        settings.ensure_directories().unwrap();

        let state = AppState::new(&settings).unwrap();
        state
            .repo
            .upsert(&IndexedRecord {
                id: "national_archives_memo-104".to_string(),
                filename: "national_archives/memo-104.pdf".to_string(),
                content: "Page 1:\nOperation Overlord briefing in Dallas".to_string(),
                index_time: Utc::now(),
                metadata: DocumentMetadata {
                    date: Some("November 22, 1963".to_string()),
                    time: None,
                    location: Some("Dallas".to_string()),
                    mission_names: Some("Operation Overlord".to_string()),
                },
            })
            .await
            .unwrap();

        std::fs::write(
            settings.subcorpus_dir("national_archives").join("memo-104.pdf"),
            b"%PDF-1.4",
        )
        .unwrap();

        let app = create_router(state);
        (app, dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn search_returns_matching_records() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/search?q=overlord")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["id"], "national_archives_memo-104");
        assert_eq!(json[0]["location"], "Dallas");
    }

    #[tokio::test]
    async fn search_without_query_is_bad_request() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/search").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn corpus_listing_enumerates_documents_on_disk() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["indexed_documents"], 1);

        let subcorpora = json["subcorpora"].as_array().unwrap();
        let national = subcorpora
            .iter()
            .find(|s| s["name"] == "national_archives")
            .unwrap();
        assert_eq!(
            national["documents"].as_array().unwrap().as_slice(),
            [serde_json::json!("memo-104.pdf")]
        );
        // Configured but empty subcorpora still appear, with no documents.
        let municipal = subcorpora
            .iter()
            .find(|s| s["name"] == "municipal_records")
            .unwrap();
        assert!(municipal["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_endpoints_return_snapshots() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/indexing_status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["in_progress"], false);
        assert_eq!(json["files_processed"], 0);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download_status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["in_progress"], false);
        assert_eq!(json["download_speed"], 0.0);
    }
}
