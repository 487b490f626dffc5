//! 集成测试：用内存中的问答链构造路由，直接通过 `oneshot` 调用 /api/chat。

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chat_backend::core::chain::{AnswerChain, ChainError};
use chat_backend::models::context::ChainInput;
use chat_backend::{router, AppState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// 记录每次调用的参数，按问题返回 `{"answer": "re: <question>"}`
#[derive(Default)]
struct RecordingChain {
    calls: Mutex<Vec<ChainInput>>,
}

#[async_trait]
impl AnswerChain for RecordingChain {
    async fn invoke(&self, input: ChainInput) -> Result<Value, ChainError> {
        self.calls.lock().unwrap().push(input.clone());
        // 第一个问题故意慢一些，让并发请求交错完成
        if input.question == "slow" {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(json!({ "answer": format!("re: {}", input.question) }))
    }
}

struct FailingChain;

#[async_trait]
impl AnswerChain for FailingChain {
    async fn invoke(&self, _input: ChainInput) -> Result<Value, ChainError> {
        Err(ChainError::Transport("connection refused to 10.0.0.7".into()))
    }
}

fn app_with(chain: Arc<dyn AnswerChain>) -> Router {
    router(AppState { chain })
}

fn post_chat(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

#[tokio::test]
async fn refund_policy_round_trip() {
    let chain = Arc::new(RecordingChain::default());
    let app = app_with(chain.clone());

    let resp = app
        .oneshot(post_chat(
            r#"{"question": "What is the refund policy?", "chat_history": []}"#,
        ))
        .await
        .expect("request");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"answer": "re: What is the refund policy?"})
    );

    let calls = chain.calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "chain must be invoked exactly once");
    assert_eq!(
        serde_json::to_value(&calls[0]).unwrap(),
        json!({"question": "What is the refund policy?", "chat_history": []})
    );
}

#[tokio::test]
async fn history_is_passed_through_verbatim() {
    let chain = Arc::new(RecordingChain::default());
    let app = app_with(chain.clone());

    let history = json!([
        {"human": "Do you ship abroad?", "ai": "Yes, to 40 countries."},
        {"role": "user", "content": "Which ones?"}
    ]);
    let body = json!({"question": "And Canada?", "chat_history": history}).to_string();

    let resp = app.oneshot(post_chat(&body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let calls = chain.calls.lock().unwrap();
    assert_eq!(serde_json::to_value(&calls[0].chat_history).unwrap(), history);
}

#[tokio::test]
async fn chain_output_is_returned_unmodified() {
    struct Fixed;

    #[async_trait]
    impl AnswerChain for Fixed {
        async fn invoke(&self, _input: ChainInput) -> Result<Value, ChainError> {
            Ok(json!(["any", {"shape": null}, 3.5]))
        }
    }

    let resp = app_with(Arc::new(Fixed))
        .oneshot(post_chat(r#"{"question": "q"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!(["any", {"shape": null}, 3.5]));
}

#[tokio::test]
async fn missing_question_is_rejected_without_calling_chain() {
    let chain = Arc::new(RecordingChain::default());
    let app = app_with(chain.clone());

    let resp = app
        .oneshot(post_chat(r#"{"chat_history": []}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["detail"][0]["loc"], json!(["body", "question"]));
    assert!(chain.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected_without_calling_chain() {
    let chain = Arc::new(RecordingChain::default());
    let app = app_with(chain.clone());

    let resp = app.oneshot(post_chat(r#"{"question": "#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "bad_request");
    assert!(chain.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_content_type_is_rejected() {
    let chain = Arc::new(RecordingChain::default());
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .body(Body::from(r#"{"question": "q"}"#))
        .unwrap();

    let resp = app_with(chain.clone()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(chain.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chain_failure_maps_to_generic_500() {
    let resp = app_with(Arc::new(FailingChain))
        .oneshot(post_chat(r#"{"question": "q", "chat_history": []}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(
        body,
        json!({"error": "internal_error", "message": "Internal server error"})
    );
}

#[tokio::test]
async fn concurrent_requests_get_their_own_answers() {
    let chain = Arc::new(RecordingChain::default());
    let app = app_with(chain.clone());

    let (slow, fast) = tokio::join!(
        app.clone().oneshot(post_chat(r#"{"question": "slow"}"#)),
        app.clone().oneshot(post_chat(r#"{"question": "fast"}"#)),
    );

    assert_eq!(body_json(slow.unwrap()).await, json!({"answer": "re: slow"}));
    assert_eq!(body_json(fast.unwrap()).await, json!({"answer": "re: fast"}));
    assert_eq!(chain.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let resp = app_with(Arc::new(RecordingChain::default()))
        .oneshot(post_chat(r#"{"question": "q"}"#))
        .await
        .unwrap();

    let id = resp
        .headers()
        .get("x-request-id")
        .expect("x-request-id header")
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "not a uuid: {id}");
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/chat")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "content-type,x-custom-token",
        )
        .body(Body::empty())
        .unwrap();

    let resp = app_with(Arc::new(RecordingChain::default()))
        .oneshot(req)
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "content-type,x-custom-token"
    );
}

#[tokio::test]
async fn cors_actual_request_allows_any_origin() {
    let chain = Arc::new(RecordingChain::default());
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"question": "q"}"#))
        .unwrap();

    let resp = app_with(chain.clone()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    let exposed = headers[header::ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap();
    assert!(exposed.contains("x-request-id"), "exposed: {exposed}");
    assert_eq!(chain.calls.lock().unwrap().len(), 1);
}
