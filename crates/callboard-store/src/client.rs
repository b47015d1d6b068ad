//! Table API HTTP client.
//!
//! Speaks the PostgREST dialect: `GET` with `eq.` filters for lookups,
//! `POST` with `Prefer: resolution=merge-duplicates` for upserts.

use std::time::{Duration, Instant};

use callboard_core::{Identity, SeriesModel, StoreError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::{debug, error, trace, warn};

use crate::models::{ApiError, ChartRow, NO_ROWS_CODE};

/// Upsert preference: replace on key conflict, no body in the response.
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// Longest response body kept in error values.
const MAX_ERROR_BODY: usize = 512;

/// Table API HTTP client.
pub struct Client {
  /// reqwest HTTP client.
  c: reqwest::Client,
  /// Base URL (without trailing `/`).
  base: String,
  /// Table name.
  table: String,
  /// Column holding the identity.
  key_column: String
}

impl Client {
  /// Creates a table API client.
  ///
  /// # Errors
  ///
  /// Returns an error if the input parameters are empty or the HTTP client cannot be built.
  pub fn new(
    base_url: &str,
    api_key: &str,
    table: &str,
    key_column: &str,
    timeout: Duration
  ) -> anyhow::Result<Self> {
    if base_url.trim().is_empty() {
      anyhow::bail!("base_url must not be empty");
    }
    if api_key.trim().is_empty() {
      anyhow::bail!("api_key must not be empty");
    }
    if table.trim().is_empty() || key_column.trim().is_empty() {
      anyhow::bail!("table and key_column must not be empty");
    }

    let key = HeaderValue::from_str(api_key).map_err(|e| anyhow::anyhow!("invalid api_key: {e}"))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
      .map_err(|e| anyhow::anyhow!("invalid api_key: {e}"))?;

    let mut h = HeaderMap::new();
    h.insert(HeaderName::from_static("apikey"), key);
    h.insert(AUTHORIZATION, bearer);
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(Self {
      c: reqwest::Client::builder()
        .default_headers(h)
        .timeout(timeout)
        .no_proxy()
        .build()?,
      base: base_url.trim_end_matches('/').to_string(),
      table: table.to_string(),
      key_column: key_column.to_string()
    })
  }

  fn table_url(&self) -> String {
    format!("{}/rest/v1/{}", self.base, self.table)
  }

  /// Reads the series stored for `identity`.
  ///
  /// # Errors
  ///
  /// `NotFound` for a "0 rows" answer; otherwise network/HTTP/decoding errors.
  pub async fn fetch_chart(&self, identity: &Identity) -> Result<Option<SeriesModel>, StoreError> {
    let filter = format!("eq.{identity}");
    let r = self
      .c
      .get(self.table_url())
      .query(&[(self.key_column.as_str(), filter.as_str()), ("select", "chart_data")]);

    let (status, body, elapsed) = self.send(r).await?;
    if !(200..300).contains(&status) {
      return Err(Self::check_error_response(status, &body, elapsed));
    }

    let rows: Vec<ChartRow> =
      serde_json::from_str(&body).map_err(|e| StoreError::Malformed(format!("{e}")))?;
    if rows.len() > 1 {
      warn!(%identity, rows = rows.len(), "several rows for one identity, using the first");
    }

    Ok(rows.into_iter().next().map(|row| row.chart_data))
  }

  /// Inserts or replaces the row for `identity`.
  ///
  /// # Errors
  ///
  /// Returns a network/HTTP error.
  pub async fn upsert_chart(&self, identity: &Identity, series: &SeriesModel) -> Result<(), StoreError> {
    let chart_data =
      serde_json::to_value(series).map_err(|e| StoreError::Malformed(format!("{e}")))?;

    let mut row = Map::new();
    row.insert(self.key_column.clone(), Value::String(identity.as_str().to_string()));
    row.insert("chart_data".to_string(), chart_data);

    let r = self
      .c
      .post(self.table_url())
      .query(&[("on_conflict", self.key_column.as_str())])
      .header("Prefer", PREFER_UPSERT)
      .json(&[Value::Object(row)]);

    let (status, body, elapsed) = self.send(r).await?;
    if (200..300).contains(&status) {
      return Ok(());
    }

    Err(Self::check_error_response(status, &body, elapsed))
  }

  /// Execute a request; returns status, body and elapsed milliseconds.
  async fn send(&self, r: reqwest::RequestBuilder) -> Result<(u16, String, u128), StoreError> {
    let rq = r.build().map_err(|e| StoreError::Transport(format!("{e}")))?;

    let start = Instant::now();
    debug!(method = %rq.method(), url = %rq.url(), "store request");

    let resp = self
      .c
      .execute(rq)
      .await
      .map_err(|e| StoreError::Transport(format!("{e}")))?;
    let st = resp.status();
    let txt = resp
      .text()
      .await
      .map_err(|e| StoreError::Transport(format!("{e}")))?;

    debug!(
      status = st.as_u16(),
      ms = start.elapsed().as_millis(),
      bytes = txt.len(),
      "store response"
    );

    if tracing::enabled!(tracing::Level::TRACE) {
      trace!(status = st.as_u16(), body = %truncate(&txt, 4096), "store response body");
    }

    Ok((st.as_u16(), txt, start.elapsed().as_millis()))
  }

  /// Map an HTTP error to `StoreError`.
  fn check_error_response(status: u16, body: &str, elapsed_ms: u128) -> StoreError {
    let e: ApiError = serde_json::from_str(body).unwrap_or_default();
    let code = e.code.as_deref();

    if status == 406 && code == Some(NO_ROWS_CODE) {
      debug!(status, code, ms = elapsed_ms, "no stored row");
      return StoreError::NotFound;
    }

    error!(status, code, ms = elapsed_ms, "store error");
    if status == 401 || status == 403 {
      return StoreError::Unauthorized(status);
    }

    StoreError::Http {
      status,
      body: truncate(body, MAX_ERROR_BODY).to_string()
    }
  }
}

/// Cut `s` to at most `max` bytes on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
  if s.len() <= max {
    return s;
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  &s[..end]
}
