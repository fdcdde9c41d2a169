//! Integration tests for Clarity

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use clarity::ai::{AiProxy, GenerateRequest, ProxyReply, TranscribeReply, TranscribeRequest};
use clarity::export::{parse_markdown, to_markdown};
use clarity::lifecycle::{self, SynthesisOutcome};
use clarity::model::StepRecord;
use clarity::store::{JsonFilePersister, Persister, SNAPSHOT_VERSION, STORAGE_NAMESPACE};
use clarity::{
    views, ClarityConfig, HttpAiProxy, ProxyService, Store, ThinkingLens, ToolkitType,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Serve `app` on an ephemeral local port.
async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A stand-in for an OpenAI-compatible backend that always answers `content`.
async fn fake_llm(content: Value) -> SocketAddr {
    let reply = json!({
        "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
    });
    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        )
        .route(
            "/v1/audio/transcriptions",
            post(|| async { Json(json!({"text": " hello there "})) }),
        );
    spawn(app).await
}

async fn failing_llm() -> SocketAddr {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"message": "rate limited"}})),
            )
        }),
    );
    spawn(app).await
}

fn configured(addr: SocketAddr) -> ClarityConfig {
    ClarityConfig::new(PathBuf::from("/unused"))
        .with_base_url(format!("http://{}/v1", addr))
        .with_api_key(Some("sk-test".into()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test that the snapshot survives a restart
#[tokio::test]
async fn test_store_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let (workspace_id, session_id) = {
        let mut store = Store::load(JsonFilePersister::in_dir(temp_dir.path())).await;
        let workspace = store.create_workspace("Career", "Where next").await;
        let session = store
            .create_session(workspace.id.clone(), ToolkitType::ValuesCheck)
            .await;
        store.update_step(&session.id, 0, "Autonomy matters most").await;
        store.set_lens(&session.id, ThinkingLens::Stoic).await;
        (workspace.id, session.id)
    };

    let file = temp_dir.path().join(format!("{}.json", STORAGE_NAMESPACE));
    assert!(file.exists());

    let store = Store::load(JsonFilePersister::in_dir(temp_dir.path())).await;
    assert_eq!(store.workspace(&workspace_id).unwrap().title, "Career");
    let session = store.session(&session_id).unwrap();
    assert_eq!(session.steps[0].content, "Autonomy matters most");
    assert_eq!(session.thinking_lens, ThinkingLens::Stoic);
}

/// Test that an unreadable snapshot starts a fresh store without losing the file
#[tokio::test]
async fn test_corrupt_snapshot_starts_fresh() {
    let temp_dir = TempDir::new().unwrap();
    let persister = JsonFilePersister::in_dir(temp_dir.path());
    let corrupt = persister.quarantine_path();
    tokio::fs::write(persister.path(), "{ not json").await.unwrap();

    let store = Store::load(persister).await;
    assert!(store.workspaces().is_empty());
    assert_eq!(store.user().name, "Thinker");

    let reloaded = JsonFilePersister::in_dir(temp_dir.path()).load().await.unwrap();
    assert!(reloaded.is_some());
    assert_eq!(tokio::fs::read_to_string(&corrupt).await.unwrap(), "{ not json");
}

/// Test that a snapshot from a newer build survives being opened by this one
#[tokio::test]
async fn test_newer_snapshot_is_preserved() {
    let temp_dir = TempDir::new().unwrap();
    let persister = JsonFilePersister::in_dir(temp_dir.path());
    let newer = json!({
        "version": SNAPSHOT_VERSION + 1,
        "user": {"id": "u1", "name": "Future"},
        "workspaces": [{
            "id": "w1",
            "title": "Precious",
            "description": "",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        }]
    });
    tokio::fs::write(persister.path(), newer.to_string()).await.unwrap();
    let corrupt = persister.quarantine_path();

    let mut store = Store::load(persister).await;
    assert!(store.workspaces().is_empty());
    store.create_workspace("Scratch", "").await;

    let kept = tokio::fs::read_to_string(&corrupt).await.unwrap();
    assert!(kept.contains("Precious"));
    let current = tokio::fs::read_to_string(temp_dir.path().join("clarity-storage.json"))
        .await
        .unwrap();
    assert!(current.contains("Scratch"));
}

/// Test the whole journal flow against a fake model backend
#[tokio::test]
async fn test_synthesis_flow_with_fake_backend() {
    let addr = fake_llm(json!({
        "insights": ["You are waiting for permission"],
        "sentenceOfTruth": "Nobody is coming to decide for you.",
        "necessaryMoves": ["Pick a date", "Tell one person"],
        "ethicalMatrix": [{"stakeholder": "Team", "impact": "More load", "consideration": "Hand over first"}]
    }))
    .await;
    let proxy = ProxyService::from_config(&configured(addr));
    assert!(proxy.is_configured());

    let mut store = Store::in_memory().await;
    let session = lifecycle::start_toolkit(&mut store, ToolkitType::DecisionMatrix).await;
    store.update_step(&session.id, 0, "Stay or go").await;
    store.set_lens(&session.id, ThinkingLens::Ethical).await;

    let outcome = lifecycle::synthesize(&mut store, &proxy, &session.id, true).await;
    let SynthesisOutcome::Generated(outputs) = outcome else {
        panic!("expected a generated synthesis");
    };
    assert_eq!(outputs.necessary_moves.len(), 2);
    assert!(outputs.structured_payload.is_some());

    let stored = store.session(&session.id).unwrap();
    assert_eq!(stored.outputs, outputs);
    assert_eq!(
        views::clarity_score(views::workspace_sessions(store.sessions(), &session.workspace_id)),
        69
    );

    let (found, workspace) = views::resolve_session(store.state(), &session.id).unwrap();
    let parsed = parse_markdown(&to_markdown(found, workspace, chrono::Utc::now()));
    assert_eq!(parsed.sentence_of_truth, "Nobody is coming to decide for you.");
    assert_eq!(parsed.necessary_moves, outputs.necessary_moves);
    assert_eq!(parsed.steps[0].1, "Stay or go");
}

/// Test that upstream failures surface as 500 and leave the session alone
#[tokio::test]
async fn test_upstream_failure() {
    let addr = failing_llm().await;
    let service = Arc::new(ProxyService::from_config(&configured(addr)));

    let response = clarity::server::router(service.clone())
        .oneshot(post_json(
            "/generate",
            json!({"steps": [{"label": "The Problem", "content": "Burnout"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("rate limited"));

    let mut store = Store::in_memory().await;
    let session = lifecycle::start_toolkit(&mut store, ToolkitType::RootCause).await;
    store.update_step(&session.id, 0, "Burnout").await;
    let before = store.session(&session.id).unwrap().clone();
    let outcome = lifecycle::synthesize(&mut store, &*service, &session.id, false).await;
    assert!(matches!(outcome, SynthesisOutcome::Failed(_)));
    assert_eq!(store.session(&session.id).unwrap(), &before);
}

/// Test that the unconfigured server answers with guidance, not errors
#[tokio::test]
async fn test_unconfigured_router_shapes() {
    let app = clarity::server::router(Arc::new(ProxyService::unconfigured()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/deep-dive",
            json!({"insight": "I hoard tasks", "originalLens": "automatic", "deepDiveLens": "inversion"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unconfigured");
    assert_eq!(body["refinedInsight"], "");
    assert!(body["nextSteps"].as_array().is_some());

    let response = app
        .clone()
        .oneshot(post_json("/deep-dive", json!({"originalLens": "stoic"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unconfigured");

    let response = app
        .clone()
        .oneshot(post_json("/generate", json!({"steps": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unconfigured");
    assert_eq!(body["sentenceOfTruth"], "");

    let response = app
        .clone()
        .oneshot(post_json("/transcribe", json!({"audio": "data:audio/webm;base64,AAAA"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["useBrowserSpeech"], true);

    let response = app
        .oneshot(post_json("/transcribe", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test that HttpAiProxy carries the reply status across the wire
#[tokio::test]
async fn test_http_proxy_against_running_server() {
    let llm = fake_llm(json!({
        "insights": ["a"],
        "sentenceOfTruth": "b",
        "necessaryMoves": ["c"],
        "narrativeArc": {"setup": "s", "conflict": "c", "turningPoint": "t", "resolution": "r"}
    }))
    .await;
    let configured_server = spawn(clarity::server::router(Arc::new(ProxyService::from_config(
        &configured(llm),
    ))))
    .await;
    let bare_server = spawn(clarity::server::router(Arc::new(ProxyService::unconfigured()))).await;

    let request = GenerateRequest {
        toolkit_type: Some("reframe".into()),
        steps: vec![StepRecord {
            label: "The Situation".into(),
            content: "Stuck on the thesis".into(),
        }],
        thinking_lens: ThinkingLens::Narrative,
        ..Default::default()
    };

    let live = HttpAiProxy::new(format!("http://{}", configured_server));
    let reply = live.synthesize(&request).await.unwrap();
    assert!(matches!(reply, ProxyReply::Generated(_)));
    assert_eq!(reply.body().sentence_of_truth, "b");
    assert!(reply.body().structured_payload.is_some());

    let transcript = live
        .transcribe(&TranscribeRequest {
            audio: "data:audio/webm;base64,aGVsbG8=".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        transcript,
        TranscribeReply::Text {
            text: "hello there".into()
        }
    );

    let err = live
        .synthesize(&GenerateRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let bare = HttpAiProxy::new(format!("http://{}", bare_server));
    let reply = bare.synthesize(&request).await.unwrap();
    assert!(matches!(reply, ProxyReply::Unconfigured(_)));
    let reply = bare.synthesize(&GenerateRequest::default()).await.unwrap();
    assert!(matches!(reply, ProxyReply::Unconfigured(_)));
}
