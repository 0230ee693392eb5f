use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MockResponse {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub status: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MockRequest {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub times: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub response: Option<MockResponse>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Results {
    pub expected: Vec<MockRequest>,
    pub unexpected: Vec<MockRequest>,
}

/// Pending expectations with their remaining use count, plus every call that
/// matched none of them.
#[derive(Debug, Default)]
pub struct Registry {
    pending: Vec<(MockRequest, u32)>,
    unexpected: Vec<MockRequest>,
}

pub type Db = Arc<RwLock<Registry>>;

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Registry {
    pub fn results(&self) -> Results {
        let expected = self
            .pending
            .iter()
            .map(|(mock, remaining)| {
                let mut mock = mock.clone();
                if mock.times > 0 {
                    mock.times = *remaining;
                }
                mock
            })
            .collect();
        Results {
            expected,
            unexpected: self.unexpected.clone(),
        }
    }

    pub fn expect(&mut self, mock: MockRequest) {
        let uses = mock.times.max(1);
        self.pending.push((mock, uses));
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.unexpected.clear();
    }

    /// Consume one use of the first pending expectation matching `call`.
    /// Records `call` as unexpected and returns `None` when nothing matches.
    pub fn answer(&mut self, call: MockRequest) -> Option<MockResponse> {
        let Some(index) = self.pending.iter().position(|(mock, _)| is_match(mock, &call)) else {
            self.unexpected.push(call);
            return None;
        };
        let (mock, remaining) = &mut self.pending[index];
        let response = mock.response.clone().unwrap_or_default();
        *remaining -= 1;
        if *remaining == 0 {
            self.pending.remove(index);
        }
        Some(response)
    }
}

fn is_match(mock: &MockRequest, call: &MockRequest) -> bool {
    if !mock.method.eq_ignore_ascii_case(&call.method) || mock.path != call.path {
        return false;
    }
    let query_ok = mock
        .query
        .iter()
        .all(|(k, v)| call.query.get(k) == Some(v));
    let headers_ok = mock
        .headers
        .iter()
        .all(|(k, v)| call.headers.get(&k.to_ascii_lowercase()) == Some(v));
    let body_ok = match &mock.body {
        Some(expected) => call.body.as_ref() == Some(expected),
        None => true,
    };
    query_ok && headers_ok && body_ok
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Registry::default()));
    Router::new()
        .route("/mocks", get(list_mocks).post(create_mock).delete(clear_mocks))
        .fallback(serve_mocked)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_mocks(State(db): State<Db>) -> Json<Results> {
    Json(db.read().await.results())
}

async fn create_mock(State(db): State<Db>, body: Bytes) -> Response {
    let mock: MockRequest = match serde_json::from_slice(&body) {
        Ok(mock) => mock,
        Err(e) => return invalid(vec![e.to_string()]),
    };

    let mut errors = Vec::new();
    if mock.method.is_empty() {
        errors.push("method is required".to_string());
    }
    if mock.path.is_empty() {
        errors.push("path is required".to_string());
    }
    if mock.response.is_none() {
        errors.push("response is required".to_string());
    }
    if !errors.is_empty() {
        return invalid(errors);
    }

    log::info!("expecting {} {}", mock.method, mock.path);
    db.write().await.expect(mock);
    StatusCode::CREATED.into_response()
}

async fn clear_mocks(State(db): State<Db>) -> StatusCode {
    db.write().await.clear();
    log::debug!("cleared all mocks");
    StatusCode::NO_CONTENT
}

async fn serve_mocked(
    State(db): State<Db>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Response {
    let call = MockRequest {
        headers: headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect(),
        body: decode_body(&body),
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query,
        ..MockRequest::default()
    };

    let Some(mocked) = db.write().await.answer(call) else {
        log::info!("unexpected call {method} {uri}");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("no mock for {method} {}", uri.path())})),
        )
            .into_response();
    };

    log::debug!("matched {method} {uri} -> {}", mocked.status);
    into_response(mocked)
}

fn decode_body(raw: &[u8]) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(raw)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned())),
    )
}

fn into_response(mocked: MockResponse) -> Response {
    let status = StatusCode::from_u16(mocked.status).unwrap_or(StatusCode::OK);
    let mut response = match mocked.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    };
    for (name, value) in mocked.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

fn invalid(errors: Vec<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
}
