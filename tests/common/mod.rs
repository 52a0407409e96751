#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use doe::api::create_router;
use doe::auth::{TokenError, TokenProvider};
use doe::discovery::DiscoveryEngineClient;
use doe::proxy::SearchProxy;

pub const SERVING_CONFIG: &str =
    "projects/p/locations/global/collections/default_collection/engines/e/servingConfigs/default_search";

/// Token provider that hands out a fixed token (or fails) and counts calls.
pub struct FakeTokens {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeTokens {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn access_token(&self) -> Result<String, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TokenError::Stderr(
                "ERROR: (gcloud.auth.print-access-token) no credentialed accounts".to_string(),
            ));
        }
        Ok("test-token".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct UpstreamState {
    calls: Arc<Mutex<Vec<CapturedCall>>>,
    replies: Arc<HashMap<&'static str, (StatusCode, String)>>,
}

/// In-process stand-in for Discovery Engine, answering `:search` and
/// `:answer` with canned replies.
pub struct FakeUpstream {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<CapturedCall>>>,
}

impl FakeUpstream {
    pub async fn start(replies: Vec<(&'static str, StatusCode, Value)>) -> Self {
        let replies = replies
            .into_iter()
            .map(|(method, status, body)| (method, (status, body.to_string())))
            .collect();
        Self::start_raw(replies).await
    }

    pub async fn start_raw(replies: HashMap<&'static str, (StatusCode, String)>) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = UpstreamState {
            calls: calls.clone(),
            replies: Arc::new(replies),
        };
        let app = Router::new().fallback(upstream_handler).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, calls }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/v1alpha", self.addr)
    }

    pub fn calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().unwrap().clone()
    }
}

async fn upstream_handler(
    State(state): State<UpstreamState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    state.calls.lock().unwrap().push(CapturedCall {
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let method = path.rsplit(':').next().unwrap_or_default();
    match state.replies.get(method) {
        Some((status, body)) => {
            (*status, [(header::CONTENT_TYPE, "application/json")], body.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no canned reply").into_response(),
    }
}

/// Address on which nothing is listening.
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1alpha")
}

pub fn proxy_router(tokens: Arc<FakeTokens>, endpoint: &str) -> Router {
    let engine = DiscoveryEngineClient::new(endpoint, SERVING_CONFIG);
    let proxy = Arc::new(SearchProxy::new(tokens, engine));
    create_router(proxy, "static-does-not-exist")
}

/// POST a raw body to the router and return status plus parsed JSON.
pub async fn post_raw(router: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(router, uri, &body.to_string()).await
}

/// Serve a router on an ephemeral port, returning its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
