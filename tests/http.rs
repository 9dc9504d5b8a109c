//! End-to-end tests for the HTTP service.
//!
//! Each test starts a stub of the two upstream services and a real restyle
//! server on ephemeral localhost ports, then talks to it with reqwest. No
//! network access or API key is needed.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use edgequake_restyle::server::{self, DEFAULT_BODY_LIMIT};
use edgequake_restyle::{RestyleConfig, Restyler};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

// ── Stub upstream ────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Reply {
    Json(u16, Value),
    Text(u16, &'static str),
    Hang,
}

impl Reply {
    async fn render(self) -> Response {
        match self {
            Reply::Json(status, body) => (code(status), Json(body)).into_response(),
            Reply::Text(status, body) => (code(status), body).into_response(),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                StatusCode::OK.into_response()
            }
        }
    }
}

fn code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}

struct Upstream {
    edit: Reply,
    chat: Reply,
    edit_calls: Mutex<Vec<(Option<String>, Value)>>,
    chat_calls: Mutex<Vec<Value>>,
}

impl Upstream {
    fn new(edit: Reply, chat: Reply) -> Arc<Self> {
        Arc::new(Self {
            edit,
            chat,
            edit_calls: Mutex::new(Vec::new()),
            chat_calls: Mutex::new(Vec::new()),
        })
    }
}

async fn stub_edit(
    State(up): State<Arc<Upstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    up.edit_calls.lock().unwrap().push((auth, body));
    up.edit.clone().render().await
}

async fn stub_chat(State(up): State<Arc<Upstream>>, Json(body): Json<Value>) -> Response {
    up.chat_calls.lock().unwrap().push(body);
    up.chat.clone().render().await
}

fn chat_reply(content: &str) -> Reply {
    Reply::Json(
        200,
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }),
    )
}

fn edited(b64: &str) -> Reply {
    Reply::Json(200, json!({ "data": [{ "b64_json": b64 }] }))
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Harness {
    base: String,
    upstream: Arc<Upstream>,
    client: reqwest::Client,
}

impl Harness {
    async fn start(edit: Reply, chat: Reply) -> Self {
        Self::start_with(edit, chat, |b| b.api_key("sk-test")).await
    }

    async fn start_with(
        edit: Reply,
        chat: Reply,
        configure: impl FnOnce(edgequake_restyle::RestyleConfigBuilder) -> edgequake_restyle::RestyleConfigBuilder,
    ) -> Self {
        Self::start_limited(edit, chat, DEFAULT_BODY_LIMIT, configure).await
    }

    async fn start_limited(
        edit: Reply,
        chat: Reply,
        body_limit: usize,
        configure: impl FnOnce(edgequake_restyle::RestyleConfigBuilder) -> edgequake_restyle::RestyleConfigBuilder,
    ) -> Self {
        let upstream = Upstream::new(edit, chat);
        let stub = Router::new()
            .route("/v1/images/edits", post(stub_edit))
            .route("/v1/chat/completions", post(stub_chat))
            .with_state(upstream.clone());
        let stub_addr = spawn(stub).await;

        let builder = RestyleConfig::builder()
            .edit_url(format!("http://{stub_addr}/v1/images/edits"))
            .chat_url(format!("http://{stub_addr}/v1/chat/completions"))
            .edit_timeout_secs(5)
            .extract_timeout_secs(1);
        let config = configure(builder).build().unwrap();

        let restyler = Restyler::new(config).unwrap();
        let addr = spawn(server::router(Arc::new(restyler), body_limit)).await;

        Self {
            base: format!("http://{addr}"),
            upstream,
            client: reqwest::Client::new(),
        }
    }

    async fn post_raw(&self, body: impl Into<reqwest::Body>) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}/api/transform", self.base))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, body: Value) -> (u16, Value) {
        self.post_raw(body.to_string()).await
    }

    fn chat_calls(&self) -> usize {
        self.upstream.chat_calls.lock().unwrap().len()
    }
}

// ── Success paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn transform_returns_image_and_items() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply(r#"{"itens":["Sofá","Mesa"]}"#)).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "imageBase64": "RURJVEVE", "items": ["Sofá", "Mesa"] }));
}

#[tokio::test]
async fn edit_request_carries_contract_fields() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply(r#"{"itens":[]}"#)).await;
    h.post(json!({ "imageBase64": "  iVBORw0K\n" })).await;

    let calls = h.upstream.edit_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (auth, body) = &calls[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-image-1.5");
    assert_eq!(body["n"], 1);
    assert_eq!(body["size"], "1024x1024");
    assert_eq!(body["quality"], "high");
    assert_eq!(body["images"][0]["image_url"], "data:image/png;base64,iVBORw0K");
    assert!(body["prompt"].as_str().unwrap().contains("Altere apenas os móveis"));
}

#[tokio::test]
async fn listing_reads_the_edited_image_not_the_upload() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply(r#"{"itens":["Sofá"]}"#)).await;
    h.post(json!({ "imageBase64": "data:image/jpeg;base64,T1JJR0lOQUw=" }))
        .await;

    let calls = h.upstream.chat_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let body = &calls[0];
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["max_tokens"], 1024);
    assert_eq!(
        body["messages"][0]["content"][1]["image_url"]["url"],
        "data:image/png;base64,RURJVEVE"
    );
}

#[tokio::test]
async fn free_text_listing_falls_back_to_lines() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply("1. Sofá preto\n2. Mesa de centro")).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["items"], json!(["Sofá preto", "Mesa de centro"]));
}

#[tokio::test]
async fn listing_timeout_still_returns_image() {
    let h = Harness::start(edited("RURJVEVE"), Reply::Hang).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "imageBase64": "RURJVEVE", "items": [] }));
}

#[tokio::test]
async fn listing_server_error_still_returns_image() {
    let h = Harness::start(edited("RURJVEVE"), Reply::Text(500, "boom")).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply(r#"{"itens":["Tapete","Tapete"]}"#)).await;

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let resp = h
            .client
            .post(format!("{}/api/transform", h.base))
            .json(&json!({ "imageBase64": "iVBORw0K" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        bodies.push(resp.bytes().await.unwrap());
    }
    assert_eq!(bodies[0], bodies[1]);
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_image_field_is_bad_request() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply("{}")).await;

    for body in [json!({}), json!({ "imageBase64": 7 }), json!({ "image": "abc" })] {
        let (status, resp) = h.post(body).await;
        assert_eq!(status, 400);
        assert!(resp["error"].as_str().unwrap().contains("imageBase64"));
        assert_eq!(resp.as_object().unwrap().len(), 1);
    }
    assert!(h.upstream.edit_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply("{}")).await;

    let (status, resp) = h.post_raw("{not json").await;

    assert_eq!(status, 400);
    assert!(resp["error"].is_string());
}

#[tokio::test]
async fn oversized_body_gets_error_envelope() {
    let h = Harness::start_limited(edited("RURJVEVE"), chat_reply("{}"), 1024, |b| {
        b.api_key("sk-test")
    })
    .await;

    let image = "A".repeat(4096);
    let (status, body) = h.post(json!({ "imageBase64": image })).await;

    assert_eq!(status, 413);
    assert!(body["error"].is_string());
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert!(h.upstream.edit_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upstream_auth_failure_is_bad_request() {
    let h = Harness::start(
        Reply::Json(401, json!({ "error": { "message": "invalid credential" } })),
        chat_reply(r#"{"itens":["Sofá"]}"#),
    )
    .await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 400);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("invalid credential"), "got {msg}");
    assert!(msg.starts_with("OpenAI: "));
    assert_eq!(h.chat_calls(), 0);
}

#[tokio::test]
async fn upstream_server_failure_is_bad_gateway() {
    let h = Harness::start(Reply::Text(503, "<html>down</html>"), chat_reply("{}")).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "OpenAI: Service Unavailable");
    assert_eq!(h.chat_calls(), 0);
}

#[tokio::test]
async fn missing_image_payload_is_bad_gateway() {
    let h = Harness::start(Reply::Json(200, json!({ "data": [] })), chat_reply("{}")).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 502);
    assert!(body["error"].is_string());
    assert_eq!(h.chat_calls(), 0);
}

#[tokio::test]
async fn edit_timeout_is_gateway_timeout() {
    let h = Harness::start_with(Reply::Hang, chat_reply("{}"), |b| {
        b.api_key("sk-test").edit_timeout_secs(1)
    })
    .await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 504);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn unreachable_edit_service_is_internal_error() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let h = Harness::start_with(edited("RURJVEVE"), chat_reply("{}"), move |b| {
        b.api_key("sk-test")
            .edit_url(format!("http://{closed}/v1/images/edits"))
    })
    .await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("request failed"));
    assert_eq!(h.chat_calls(), 0);
}

#[tokio::test]
async fn missing_credential_is_internal_error() {
    let h = Harness::start_with(edited("RURJVEVE"), chat_reply("{}"), |b| b).await;

    let (status, body) = h.post(json!({ "imageBase64": "iVBORw0K" })).await;

    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("OPENAI_API_KEY"));
    assert!(h.upstream.edit_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::start(edited("RURJVEVE"), chat_reply("{}")).await;

    let resp = h
        .client
        .get(format!("{}/health", h.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "status": "ok" }));
}
