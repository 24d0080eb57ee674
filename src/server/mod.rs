use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::coordinator::RequestCoordinator;
use routes::{
    download::download, files::serve_file, liveness::live, search::search,
};

pub mod error;
mod routes;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RequestCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self { coordinator }
    }
}

/// Routes for search, download and file retrieval.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/live", get(live))
        .route("/search", get(search))
        .route("/download", get(download))
        .route("/file/{filename}", get(serve_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{DiskArtifactStore, SearchCache, StoreLimits},
        sources::{ExtractionOutput, MockAudioExtractor, MockSearchProvider},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(dir: &Path, searcher: MockSearchProvider, extractor: MockAudioExtractor) -> Router {
        let store = DiskArtifactStore::new(dir, StoreLimits::default()).unwrap();
        let coordinator = RequestCoordinator::new(
            SearchCache::new(15),
            Arc::new(store),
            Arc::new(searcher),
            Arc::new(extractor),
            10,
        );
        app_routes(AppState::new(Arc::new(coordinator)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn liveness() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), MockSearchProvider::new(), MockAudioExtractor::new());

        let (status, body) = get_json(app, "/live").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn search_contract() {
        let dir = TempDir::new().unwrap();
        let mut searcher = MockSearchProvider::new();
        searcher
            .expect_search()
            .times(1)
            .returning(|_, _| Ok(vec![json!({"videoId": "abc123", "title": "Song"})]));
        let app = app(dir.path(), searcher, MockAudioExtractor::new());

        let (status, body) = get_json(app.clone(), "/search?q=a").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing or too short query"}));

        let (status, body) = get_json(app.clone(), "/search?q=some%20song").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"videoId": "abc123", "title": "Song"}]));

        // Segunda vez desde caché: el mock sólo admite una llamada
        let (status, _) = get_json(app, "/search?q=some%20song").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn search_failure_is_500() {
        let dir = TempDir::new().unwrap();
        let mut searcher = MockSearchProvider::new();
        searcher
            .expect_search()
            .returning(|_, _| Err(anyhow::anyhow!("provider down")));
        let app = app(dir.path(), searcher, MockAudioExtractor::new());

        let (status, body) = get_json(app, "/search?q=some%20song").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Search failed");
    }

    #[tokio::test]
    async fn download_contract() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().to_path_buf();
        let mut extractor = MockAudioExtractor::new();
        extractor.expect_extract().times(1).returning(move |id, format| {
            let path = out_dir.join(format!("{id}.{format}"));
            std::fs::write(&path, b"audio").unwrap();
            Ok(ExtractionOutput {
                stdout: format!("[ExtractAudio] Destination: {}\n", path.display()),
                stderr: String::new(),
            })
        });
        let app = app(dir.path(), MockSearchProvider::new(), extractor);

        let (status, body) = get_json(app.clone(), "/download").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing video ID"}));

        let (status, body) = get_json(app.clone(), "/download?id=abc123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Downloaded", "filename": "abc123.mp3", "url": "/file/abc123.mp3"})
        );

        let (status, body) = get_json(app, "/download?id=abc123&format=mp3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Already downloaded");
    }

    #[tokio::test]
    async fn serves_managed_files_as_attachments() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc123.mp3"), b"ID3 audio").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"private").unwrap();
        let app = app(dir.path(), MockSearchProvider::new(), MockAudioExtractor::new());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/file/abc123.mp3")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"abc123.mp3\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ID3 audio");

        for uri in ["/file/notes.txt", "/file/missing.mp3", "/file/..%2Fabc123.mp3"] {
            let (status, _) = get_json(app.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
