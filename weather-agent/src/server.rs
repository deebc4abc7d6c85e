//! HTTP surface: `POST /api/weather/query`, `GET /api/weather/health`, `GET /`.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use weather_agent_core::{QueryProcessor, QueryRequest, QueryResponse};

pub const SERVICE_NAME: &str = "Weather AI Agent";

const UNEXPECTED_TEXT: &str = "An unexpected error occurred while processing your request.";

#[derive(Clone)]
struct AppState {
    processor: Arc<dyn QueryProcessor>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    service: &'static str,
}

pub fn router(processor: Arc<dyn QueryProcessor>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/weather/query", post(query_handler))
        .route("/api/weather/health", get(health_handler))
        .with_state(AppState { processor })
}

pub async fn serve(addr: &str, processor: Arc<dyn QueryProcessor>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(target: "server", url = %format!("http://{addr}"), "Weather agent ready");

    axum::serve(listener, router(processor))
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to Weather AI Agent API",
        "endpoints": {
            "weatherQuery": "/api/weather/query",
            "health": "/api/weather/health"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(Health {
        status: "healthy",
        timestamp: Utc::now(),
        service: SERVICE_NAME,
    })
}

async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let Some(query) = payload
        .ok()
        .and_then(|Json(req)| req.non_blank_query().map(str::to_string))
    else {
        warn!(target: "server", "Invalid weather query request received");
        return (StatusCode::BAD_REQUEST, "Query cannot be empty").into_response();
    };

    info!(target: "server", query = %query, "Received weather query");

    // Run on its own task so a panic inside the orchestrator still yields an envelope.
    let processor = state.processor.clone();
    let outcome = tokio::spawn(async move { processor.process(&query).await }).await;

    match outcome {
        Ok(resp) if resp.success => (StatusCode::OK, Json(resp)).into_response(),
        Ok(resp) => {
            error!(
                target: "server",
                error = resp.error_message.as_deref().unwrap_or_default(),
                "Weather query processing failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(resp)).into_response()
        }
        Err(err) => {
            error!(target: "server", error = %err, "Unexpected error processing weather query");
            let resp = QueryResponse::failure(UNEXPECTED_TEXT, err.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(resp)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    enum Behavior {
        Answer,
        Fail,
        Panic,
    }

    struct FakeProcessor {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeProcessor {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QueryProcessor for FakeProcessor {
        async fn process(&self, query: &str) -> QueryResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Answer => QueryResponse::success(format!("You asked: {query}"), None),
                Behavior::Fail => QueryResponse::failure("Sorry.", "rate limited"),
                Behavior::Panic => panic!("orchestrator exploded"),
            }
        }
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/weather/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(processor: Arc<FakeProcessor>, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router(processor).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn answers_non_blank_query() {
        let processor = FakeProcessor::new(Behavior::Answer);
        let (status, body) = send(processor.clone(), post_query(r#"{"query": "Weather in Rome?"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["response"], "You asked: Weather in Rome?");
        assert!(json["weatherData"].is_null());
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_blank_or_missing_query_without_processing() {
        let processor = FakeProcessor::new(Behavior::Answer);

        for body in [r#"{"query": ""}"#, r#"{"query": "   "}"#, "{}", "", "not json"] {
            let (status, text) = send(processor.clone(), post_query(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            assert_eq!(text, b"Query cannot be empty");
        }

        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejects_body_without_json_content_type() {
        let processor = FakeProcessor::new(Behavior::Answer);
        let req = Request::builder()
            .method("POST")
            .uri("/api/weather/query")
            .body(Body::from(r#"{"query": "Weather?"}"#))
            .unwrap();

        let (status, _) = send(processor.clone(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_processing_is_500_with_envelope() {
        let processor = FakeProcessor::new(Behavior::Fail);
        let (status, body) = send(processor, post_query(r#"{"query": "Weather?"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["response"], "Sorry.");
        assert_eq!(json["errorMessage"], "rate limited");
    }

    #[tokio::test]
    async fn panicking_processor_still_returns_envelope() {
        let processor = FakeProcessor::new(Behavior::Panic);
        let (status, body) = send(processor, post_query(r#"{"query": "Weather?"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["response"], UNEXPECTED_TEXT);
        assert!(json["errorMessage"].is_string());
    }

    #[tokio::test]
    async fn health_is_always_healthy() {
        let processor = FakeProcessor::new(Behavior::Fail);
        let req = Request::builder()
            .uri("/api/weather/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(processor.clone(), req).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(FakeProcessor::new(Behavior::Answer), req).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["endpoints"]["weatherQuery"], "/api/weather/query");
    }
}
