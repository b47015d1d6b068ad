//! Fake table API on axum.
//!
//! Provides `FakeTableApi::spawn()`: starts an HTTP server on a random port
//! serving `/rest/v1/user_charts` keyed by `email`.

#![allow(clippy::expect_used, dead_code)]

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering}
  },
  time::Duration
};

use axum::{
  Json, Router,
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  routing::get
};
use serde_json::{Value, json};
use tokio::sync::RwLock;

/// API key the fake server accepts.
pub const API_KEY: &str = "test-key";

/// Internal state of the fake API.
#[derive(Debug, Default)]
pub struct FakeState {
  /// `chart_data` by email.
  pub rows: RwLock<HashMap<String, Value>>,
  /// Raw bodies of every upsert.
  pub upsert_bodies: RwLock<Vec<Value>>,
  /// `Prefer` headers of every upsert.
  pub prefer_headers: RwLock<Vec<String>>,
  /// Raw query maps of every select.
  pub select_queries: RwLock<Vec<HashMap<String, String>>>,
  /// Forced answer for the next request.
  pub fail_next: RwLock<Option<(StatusCode, Value)>>,
  /// Delay applied to selects, per email.
  pub select_delays: RwLock<HashMap<String, Duration>>,
  /// Number of requests served.
  pub requests: AtomicUsize
}

impl FakeState {
  /// Store a row directly.
  pub async fn put_row(&self, email: &str, chart_data: Value) {
    self.rows.write().await.insert(email.to_string(), chart_data);
  }

  /// Stored `chart_data` for `email`.
  pub async fn row(&self, email: &str) -> Option<Value> {
    self.rows.read().await.get(email).cloned()
  }

  /// Answer the next request with `status` and `body`.
  pub async fn fail_next(&self, status: StatusCode, body: Value) {
    *self.fail_next.write().await = Some((status, body));
  }

  /// Delay selects for `email`.
  pub async fn delay_select(&self, email: &str, delay: Duration) {
    self
      .select_delays
      .write()
      .await
      .insert(email.to_string(), delay);
  }

  /// Number of requests served.
  pub fn request_count(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  /// Number of upserts received.
  pub async fn upsert_count(&self) -> usize {
    self.upsert_bodies.read().await.len()
  }
}

/// Fake table API: start and get base URL + state.
pub struct FakeTableApi;

impl FakeTableApi {
  /// Start a fake API server on a random port.
  pub async fn spawn() -> (String, Arc<FakeState>) {
    let state = Arc::new(FakeState::default());

    let app = Router::new()
      .route("/rest/v1/user_charts", get(handle_select).post(handle_upsert))
      .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
      .await
      .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    let base_url = format!("http://{addr}");

    tokio::spawn(async move {
      axum::serve(listener, app).await.expect("serve");
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    (base_url, state)
  }
}

/// Series values as stored in `chart_data`.
pub fn chart_json(values: [f64; 5]) -> Value {
  let days = ["Mon", "Tue", "Wed", "Thu", "Fri"];
  Value::Array(
    days
      .iter()
      .zip(values)
      .map(|(d, v)| json!({"day": d, "duration": v}))
      .collect()
  )
}

// -- Handlers --

fn unauthorized() -> Response {
  (
    StatusCode::UNAUTHORIZED,
    Json(json!({"code": "PGRST301", "message": "JWT invalid", "details": null}))
  )
    .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
  let key = headers.get("apikey").and_then(|v| v.to_str().ok());
  let bearer = headers
    .get("authorization")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "));
  key == Some(API_KEY) && bearer == Some(API_KEY)
}

/// Common preamble: count, authorize, apply a forced failure.
async fn preamble(state: &FakeState, headers: &HeaderMap) -> Option<Response> {
  state.requests.fetch_add(1, Ordering::SeqCst);
  if !authorized(headers) {
    return Some(unauthorized());
  }
  if let Some((status, body)) = state.fail_next.write().await.take() {
    return Some((status, Json(body)).into_response());
  }
  None
}

async fn handle_select(
  State(state): State<Arc<FakeState>>,
  headers: HeaderMap,
  Query(q): Query<HashMap<String, String>>
) -> Response {
  if let Some(resp) = preamble(&state, &headers).await {
    return resp;
  }
  state.select_queries.write().await.push(q.clone());

  let Some(email) = q.get("email").and_then(|f| f.strip_prefix("eq.")) else {
    return (
      StatusCode::BAD_REQUEST,
      Json(json!({"code": "PGRST100", "message": "missing filter"}))
    )
      .into_response();
  };

  let delay = state.select_delays.read().await.get(email).copied();
  if let Some(d) = delay {
    tokio::time::sleep(d).await;
  }

  let rows = state.rows.read().await;
  let body: Vec<Value> = rows
    .get(email)
    .map(|chart| json!({"chart_data": chart}))
    .into_iter()
    .collect();
  Json(Value::Array(body)).into_response()
}

async fn handle_upsert(
  State(state): State<Arc<FakeState>>,
  headers: HeaderMap,
  Query(q): Query<HashMap<String, String>>,
  Json(body): Json<Value>
) -> Response {
  if let Some(resp) = preamble(&state, &headers).await {
    return resp;
  }

  let prefer = headers
    .get("prefer")
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string();
  state.prefer_headers.write().await.push(prefer.clone());
  state.upsert_bodies.write().await.push(body.clone());

  let conflict_key = q.get("on_conflict").map(String::as_str);
  let mut rows = state.rows.write().await;
  for row in body.as_array().into_iter().flatten() {
    let (Some(email), Some(chart)) = (row.get("email").and_then(Value::as_str), row.get("chart_data"))
    else {
      return (
        StatusCode::BAD_REQUEST,
        Json(json!({"code": "PGRST102", "message": "bad row"}))
      )
        .into_response();
    };
    let merge = conflict_key == Some("email") && prefer.contains("merge-duplicates");
    if rows.contains_key(email) && !merge {
      return (
        StatusCode::CONFLICT,
        Json(json!({"code": "23505", "message": "duplicate key value"}))
      )
        .into_response();
    }
    rows.insert(email.to_string(), chart.clone());
  }

  StatusCode::CREATED.into_response()
}
