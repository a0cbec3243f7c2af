pub mod documents;
pub mod generate;
pub mod health;
pub mod sessions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for multipart boundaries and headers around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_file_size_bytes() + MULTIPART_OVERHEAD;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/{id}/document", post(documents::upload))
        .route("/api/sessions/{id}/generate", post(generate::generate))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use config::Environment;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::services::pipeline::{DualGenerator, Merger, Pipeline};
    use crate::session::NO_TEXT_WARNING;
    use crate::test_support::{ScriptedGenerator, pdf_with_pages};

    const BOUNDARY: &str = "study-forge-test-boundary";

    fn test_state(quiz: ScriptedGenerator) -> AppState {
        let env = Environment::with_prefix("APP")
            .separator("__")
            .source(Some(config::Map::new()));
        let config = AppConfig::load_with("test", env, Some("test-key".to_string())).unwrap();

        let pipeline = Pipeline::new(
            config.pipeline.chunk_size,
            DualGenerator::new(
                Arc::new(ScriptedGenerator::new("notes")),
                Arc::new(quiz),
            ),
            Merger::new(Arc::new(ScriptedGenerator::new("merged"))),
        );
        AppState::new(config, pipeline)
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn upload_req(
        id: &str,
        filename: &str,
        content_type: &str,
        content: impl AsRef<[u8]>,
    ) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content.as_ref());
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post(format!("/api/sessions/{id}/document"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_session(state: &AppState) -> String {
        let response = send(state, post("/api/sessions")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json(response).await["id"].as_str().unwrap().to_string()
    }

    async fn load_text(state: &AppState, id: &str, text: &str) {
        state.sessions.begin_extraction(id, "doc.pdf").await.unwrap();
        state
            .sessions
            .complete_extraction(id, text.to_string())
            .await
            .unwrap();
    }

    async fn wait_until_settled(state: &AppState, id: &str) -> Value {
        for _ in 0..200 {
            let body = json(send(state, get_req(&format!("/api/sessions/{id}"))).await).await;
            if body["status"] != "generating" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {id} never left generating");
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let response = send(&state, get_req("/api/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;

        let body = json(send(&state, get_req(&format!("/api/sessions/{id}"))).await).await;
        assert_eq!(body["status"], "idle");
        assert_eq!(body["can_generate"], false);

        let response = send(
            &state,
            Request::delete(format!("/api/sessions/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&state, get_req(&format!("/api/sessions/{id}"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["status"], 404);
    }

    #[tokio::test]
    async fn test_generate_requires_text() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;

        let response = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&state, post("/api/sessions/missing/generate")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;

        let response = send(&state, upload_req(&id, "notes.txt", "text/plain", "hello")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &state,
            upload_req(&id, "fake.pdf", "application/pdf", "just some text"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // rejected uploads leave the session untouched
        let body = json(send(&state, get_req(&format!("/api/sessions/{id}"))).await).await;
        assert_eq!(body["status"], "idle");
    }

    #[tokio::test]
    async fn test_unreadable_pdf_fails_session() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;

        let response = send(
            &state,
            upload_req(&id, "broken.pdf", "application/pdf", "%PDF-1.4 truncated"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json(send(&state, get_req(&format!("/api/sessions/{id}"))).await).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["filename"], "broken.pdf");
        assert!(body["text"].is_null());
        assert!(
            body["error_message"]
                .as_str()
                .unwrap()
                .starts_with("Error processing PDF")
        );
    }

    #[tokio::test]
    async fn test_upload_pdf_makes_session_ready() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;

        let pdf = pdf_with_pages(&["Hello World!"]);
        let response = send(&state, upload_req(&id, "hello.pdf", "application/pdf", pdf)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["filename"], "hello.pdf");
        assert_eq!(body["can_generate"], true);
        assert!(body["warning"].is_null());
        let text = body["text"].as_str().unwrap();
        assert!(text.contains("Hello World!"), "extracted: {text:?}");
        assert!(text.ends_with('\n'));

        // the stored session matches what the upload returned
        let stored = json(send(&state, get_req(&format!("/api/sessions/{id}"))).await).await;
        assert_eq!(stored["status"], "ready");
        assert_eq!(stored["text"], body["text"]);
    }

    #[tokio::test]
    async fn test_upload_blank_pdf_warns_and_stays_idle() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;

        let pdf = pdf_with_pages(&[""]);
        let response = send(
            &state,
            upload_req(&id, "scan.pdf", "application/octet-stream", pdf),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "idle");
        assert_eq!(body["warning"], NO_TEXT_WARNING);
        assert_eq!(body["can_generate"], false);
        assert!(body["error_message"].is_null());

        let response = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_generate_runs_to_done() {
        let state = test_state(ScriptedGenerator::new("quiz"));
        let id = create_session(&state).await;
        load_text(&state, &id, "photosynthesis converts light into chemical energy").await;

        let response = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json(response).await["status"], "generating");

        let body = wait_until_settled(&state, &id).await;
        assert_eq!(body["status"], "done");
        assert_eq!(body["chunk_count"], 1);
        assert_eq!(body["notes"], "notes #0");
        assert_eq!(body["quizzes"], "quiz #0");
        assert_eq!(body["merged"], "merged #0");
        assert_eq!(body["can_generate"], true);
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces_single_error() {
        let state = test_state(ScriptedGenerator::new("quiz").failing_on(0));
        let id = create_session(&state).await;
        load_text(&state, &id, "some study material").await;

        let response = send(&state, post(&format!("/api/sessions/{id}/generate"))).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = wait_until_settled(&state, &id).await;
        assert_eq!(body["status"], "failed");
        assert!(body["notes"].is_null());
        assert!(body["quizzes"].is_null());
        assert!(body["merged"].is_null());
        let error = body["error_message"].as_str().unwrap();
        assert!(error.starts_with("Error generating notes and quiz"));
        assert!(error.contains("quiz backend unavailable"));
    }
}
