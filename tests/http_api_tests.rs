// Tests for the multi-session HTTP surface, driven through the router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use voxsession::{
    create_router, AppState, EngineEvent, EngineFactory, EngineSelection, MockEngine,
    RecognitionEngine, RecognitionService, ScriptedEvent, SessionOptions,
};

fn mock_service() -> Arc<RecognitionService> {
    let mut service = RecognitionService::new(
        EngineFactory::new(),
        SessionOptions::default(),
        EngineSelection::primary_only("mock"),
    );
    service.register_engine(
        "silent",
        Arc::new(|| Ok(Box::new(MockEngine::silent("silent")) as Box<dyn RecognitionEngine>)),
    );
    service.register_engine(
        "failing",
        Arc::new(|| {
            Ok(Box::new(MockEngine::new(
                "failing",
                vec![ScriptedEvent::new(
                    30,
                    EngineEvent::Error("server died".into()),
                )],
            )) as Box<dyn RecognitionEngine>)
        }),
    );
    Arc::new(service)
}

fn router() -> axum::Router {
    create_router(AppState::new(mock_service()))
}

async fn request_json(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let router = router();
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_mock_vendor_runs_through_full_event_contract() {
    let router = router();

    let (status, body) = request_json(&router, "POST", "/sessions/start", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], 1, "first id must be 1");
    assert_eq!(body["state"], "recording");

    // The loopback script auto-stops and finishes on its own; poll until
    // the record returns to idle with the final text delivered.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let (status, body) = request_json(&router, "GET", "/sessions/1", None).await;
        assert_eq!(status, StatusCode::OK);
        if body["state"] == "idle" && !body["final_text"].is_null() {
            assert_eq!(body["final_text"], "Loopback ok.");
            assert_eq!(body["stats"]["phase"], "done");
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "loopback session never finished: {}",
            body
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_busy_start_returns_conflict() {
    let router = router();

    let (status, body) = request_json(
        &router,
        "POST",
        "/sessions/start",
        Some(json!({ "vendor": "silent" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["session_id"].as_u64().unwrap();

    let (status, body) = request_json(&router, "POST", "/sessions/start", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "busy");

    // Cancel frees the surface for the next attempt.
    let (status, _) = request_json(
        &router,
        "POST",
        &format!("/sessions/{}/cancel", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let (status, _) = request_json(&router, "POST", "/sessions/start", Some(json!({}))).await;
        if status == StatusCode::OK {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "busy flag was not released after cancel"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_session_ids_are_monotonic() {
    let router = router();

    let (_, body) = request_json(
        &router,
        "POST",
        "/sessions/start",
        Some(json!({ "vendor": "silent" })),
    )
    .await;
    let first = body["session_id"].as_u64().unwrap();

    let (status, _) = request_json(
        &router,
        "POST",
        &format!("/sessions/{}/cancel", first),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_, body) = request_json(
        &router,
        "POST",
        "/sessions/start",
        Some(json!({ "vendor": "silent" })),
    )
    .await;
    let second = body["session_id"].as_u64().unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn test_unknown_vendor_is_an_engine_build_error() {
    let router = router();
    let (status, body) = request_json(
        &router,
        "POST",
        "/sessions/start",
        Some(json!({ "vendor": "nowhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "engine_build");
}

#[tokio::test]
async fn test_unknown_session_id_is_not_found() {
    let router = router();

    let (status, _) = request_json(&router, "GET", "/sessions/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request_json(&router, "POST", "/sessions/42/stop", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request_json(&router, "POST", "/sessions/42/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_returns_session_to_idle() {
    let router = router();

    let (_, body) = request_json(
        &router,
        "POST",
        "/sessions/start",
        Some(json!({ "vendor": "silent" })),
    )
    .await;
    let id = body["session_id"].as_u64().unwrap();

    let (status, _) = request_json(&router, "POST", &format!("/sessions/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = request_json(&router, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert!(body["final_text"].is_null());
    assert_eq!(body["stats"]["phase"], "canceled");
}

#[tokio::test]
async fn test_cancel_after_error_keeps_the_error_visible() {
    let router = router();

    let (status, body) = request_json(
        &router,
        "POST",
        "/sessions/start",
        Some(json!({ "vendor": "failing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["session_id"].as_u64().unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let (_, body) = request_json(&router, "GET", &format!("/sessions/{}", id), None).await;
        if body["state"] == "error" {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "failing vendor never reached the error state: {}",
            body
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // A cancel that arrives after the failure must not erase it.
    let (status, _) = request_json(&router, "POST", &format!("/sessions/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request_json(&router, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "error");
    assert_eq!(body["error"], "server");
    assert_eq!(body["stats"]["phase"], "error");
}

#[tokio::test]
async fn test_finished_sessions_are_evicted_past_the_retention_bound() {
    let router = router();
    let mut first_id = None;
    let mut last_id = 0;

    // Churn through well over the retention bound of finished sessions.
    for _ in 0..40 {
        // The previous session's slot frees asynchronously; poll the start.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        let id = loop {
            let (status, body) = request_json(
                &router,
                "POST",
                "/sessions/start",
                Some(json!({ "vendor": "silent" })),
            )
            .await;
            if status == StatusCode::OK {
                break body["session_id"].as_u64().unwrap();
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "busy flag was not released between sessions"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        };
        first_id.get_or_insert(id);
        last_id = id;

        let (status, _) =
            request_json(&router, "POST", &format!("/sessions/{}/cancel", id), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = request_json(
        &router,
        "GET",
        &format!("/sessions/{}", first_id.unwrap()),
        None,
    )
    .await;
    assert_eq!(
        status,
        StatusCode::NOT_FOUND,
        "oldest finished session must be evicted"
    );

    let (status, _) = request_json(&router, "GET", &format!("/sessions/{}", last_id), None).await;
    assert_eq!(status, StatusCode::OK, "newest session must stay queryable");
}
