//! HTTP surface of the AI proxy.
//!
//! - `POST /generate`, `POST /deep-dive`: 200 with the body plus a `status`
//!   of `generated` or `unconfigured`. Without a backend every request gets
//!   the guidance body. Otherwise 400 `{error}` for missing input and 500
//!   `{error}` when the upstream call or its reply fails.
//! - `POST /transcribe`: 200 `{text}` or the browser-speech fallback.
//! - `GET /health`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::ai::{
    unconfigured_deep_dive, unconfigured_generate, AiProxy, DeepDiveRequest, GenerateRequest,
    ProxyReply, ProxyService, TranscribeRequest,
};
use crate::config::ClarityConfig;
use crate::{ClarityError, Result};

type ApiResponse = (StatusCode, Json<Value>);

pub fn router(service: Arc<ProxyService>) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/deep-dive", post(deep_dive))
        .route("/transcribe", post(transcribe))
        .route("/health", get(health))
        .with_state(service)
}

/// Bind `config.bind` and serve until the process exits.
pub async fn serve(config: &ClarityConfig) -> Result<()> {
    let service = Arc::new(ProxyService::from_config(config));
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Clarity proxy listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

async fn generate(
    State(service): State<Arc<ProxyService>>,
    body: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(_) if !service.is_configured() => {
            return respond(Ok(ProxyReply::Unconfigured(unconfigured_generate())));
        }
        Err(rejection) => return bad_body(rejection),
    };
    respond(service.synthesize(&request).await)
}

async fn deep_dive(
    State(service): State<Arc<ProxyService>>,
    body: std::result::Result<Json<DeepDiveRequest>, JsonRejection>,
) -> ApiResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(_) if !service.is_configured() => {
            return respond(Ok(ProxyReply::Unconfigured(unconfigured_deep_dive())));
        }
        Err(rejection) => return bad_body(rejection),
    };
    respond(service.deep_dive(&request).await)
}

async fn transcribe(
    State(service): State<Arc<ProxyService>>,
    body: std::result::Result<Json<TranscribeRequest>, JsonRejection>,
) -> ApiResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_body(rejection),
    };
    match service.transcribe(&request).await {
        Ok(reply) => match serde_json::to_value(reply) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => error_response(e.into()),
        },
        Err(e) => error_response(e),
    }
}

async fn health(State(service): State<Arc<ProxyService>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "aiConfigured": service.is_configured(),
    }))
}

fn respond<T: Serialize>(result: Result<ProxyReply<T>>) -> ApiResponse {
    let reply = match result {
        Ok(reply) => reply,
        Err(e) => return error_response(e),
    };
    let status = reply.status();
    match serde_json::to_value(reply.body()) {
        Ok(mut value) => {
            if let Value::Object(map) = &mut value {
                map.insert("status".to_string(), json!(status));
            }
            (StatusCode::OK, Json(value))
        }
        Err(e) => error_response(e.into()),
    }
}

fn error_response(error: ClarityError) -> ApiResponse {
    let code = if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(json!({ "error": error.to_string() })))
}

fn bad_body(rejection: JsonRejection) -> ApiResponse {
    warn!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": rejection.body_text() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    /// Configured against a port nothing listens on.
    fn configured_service() -> ProxyService {
        let config = ClarityConfig::new("/unused".into())
            .with_base_url("http://127.0.0.1:9/v1")
            .with_api_key(Some("sk-test".into()));
        ProxyService::from_config(&config)
    }

    async fn call(method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        call_with(ProxyService::unconfigured(), method, uri, body).await
    }

    async fn call_with(
        service: ProxyService,
        method: &str,
        uri: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let app = router(Arc::new(service));
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_unconfigured_is_ok() {
        let (status, body) = call(
            "POST",
            "/generate",
            json!({"steps": [{"label": "The Plan", "content": "Quit"}], "thinkingLens": "stoic"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unconfigured");
        assert_eq!(body["sentenceOfTruth"], "");
        assert!(body["insights"].as_array().is_some_and(|a| a.len() == 1));
    }

    #[tokio::test]
    async fn test_unconfigured_never_returns_error_status() {
        let (status, body) = call("POST", "/generate", json!({"steps": []})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unconfigured");
        assert_eq!(body["sentenceOfTruth"], "");

        let (status, body) = call("POST", "/deep-dive", json!({"insight": 42})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unconfigured");
        assert_eq!(body["refinedInsight"], "");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_configured_generate_without_content_is_bad_request() {
        let (status, body) =
            call_with(configured_service(), "POST", "/generate", json!({"steps": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_configured_malformed_body_is_bad_request() {
        let (status, body) = call_with(
            configured_service(),
            "POST",
            "/deep-dive",
            json!({"insight": 42}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let app = router(Arc::new(ProxyService::unconfigured()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok", "aiConfigured": false}));
    }
}
