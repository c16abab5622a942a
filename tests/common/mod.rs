#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
};
use serde_json::{Value, json};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use upstairs::UpstairsClient;
use upstairs::config::{BackendConfig, BasicConfig};
use url::Url;

pub const TOKEN: &str = "t0k3n";
pub const PREFIX: &str = "/api/portofino-upstairs";

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Scripted backend. Responses queue per `(method, path)`; the last one repeats.
/// Unscripted requests get a 404.
#[derive(Clone, Default)]
pub struct MockBackend {
    responses: Arc<Mutex<HashMap<(Method, String), VecDeque<(StatusCode, Value)>>>>,
    reqs: Arc<Mutex<Vec<Captured>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `path` is relative to the upstairs prefix, e.g. `/database/connections`.
    pub fn on(self, method: Method, path: &str, status: StatusCode, body: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method, format!("{PREFIX}{path}")))
            .or_default()
            .push_back((status, body));
        self
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<Captured> {
        let full = format!("{PREFIX}{path}");
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method && r.path == full)
            .collect()
    }

    pub async fn spawn(&self) -> UpstairsClient {
        let app = Router::new().fallback(handle).with_state(self.clone());
        let base = spawn_test_server(app).await;

        let basic = BasicConfig {
            api_root: base.join("api/").expect("valid api root"),
            api_token: Some(TOKEN.to_string()),
            ..BasicConfig::default()
        };
        let backend = BackendConfig {
            retry_max_times: 2,
            ..BackendConfig::default()
        };
        UpstairsClient::new(&basic, &backend).expect("client builds")
    }
}

async fn handle(
    State(state): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    state.reqs.lock().unwrap().push(Captured {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let mut responses = state.responses.lock().unwrap();
    let (status, body) = match responses.get_mut(&(method, path)) {
        Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty queue"),
        Some(queue) => queue.front().cloned().expect("scripted response"),
        None => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
    };
    (status, Json(body))
}

async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}/", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

pub fn connection_details(name: &str) -> Value {
    json!({
        "databaseName": { "value": name },
        "driver": { "value": "org.h2.Driver" },
        "url": { "value": format!("jdbc:h2:mem:{name}") },
        "status": { "value": "connected" },
        "lastTested": { "value": 1700000000000i64 },
        "schemas": [
            { "catalog": null, "name": "public", "schema": "PUBLIC", "selected": true },
            { "catalog": null, "name": "audit", "schema": "AUDIT", "selected": false }
        ],
        "hibernateDialect": { "value": null, "displayValue": "(default)" }
    })
}
