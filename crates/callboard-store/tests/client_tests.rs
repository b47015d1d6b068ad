//! Table API client tests via `FakeTableApi`.

#![allow(clippy::expect_used)]

mod common;

use std::{sync::Arc, time::Duration};

use axum::http::StatusCode;
use callboard_core::{Identity, SeriesModel, StoreError};
use callboard_store::client::Client;
use common::{API_KEY, FakeState, FakeTableApi, chart_json};
use serde_json::json;

/// Timeout for async tests (30s, HTTP server operations).
const TEST_TIMEOUT: Duration = Duration::from_secs(30);

async fn setup() -> (Client, Arc<FakeState>) {
  let (base_url, state) = FakeTableApi::spawn().await;
  let client = Client::new(&base_url, API_KEY, "user_charts", "email", Duration::from_secs(5))
    .expect("client");
  (client, state)
}

fn id(raw: &str) -> Identity {
  Identity::parse(raw).expect("identity")
}

#[tokio::test]
async fn test_fetch_existing_row() {
  eprintln!("[TEST] test_fetch_existing_row");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    state
      .put_row("ann@example.com", chart_json([10.0, 20.0, 30.0, 40.0, 50.0]))
      .await;

    let series = client
      .fetch_chart(&id("ann@example.com"))
      .await
      .expect("fetch")
      .expect("row");
    assert_eq!(series.values(), [10.0, 20.0, 30.0, 40.0, 50.0]);

    let queries = state.select_queries.read().await;
    assert_eq!(queries[0].get("email").map(String::as_str), Some("eq.ann@example.com"));
    assert_eq!(queries[0].get("select").map(String::as_str), Some("chart_data"));
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_missing_row_is_none() {
  eprintln!("[TEST] test_fetch_missing_row_is_none");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, _state) = setup().await;
    let found = client.fetch_chart(&id("nobody@example.com")).await.expect("fetch");
    assert!(found.is_none());
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_plus_sign_identity_is_encoded() {
  eprintln!("[TEST] test_fetch_plus_sign_identity_is_encoded");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    state
      .put_row("a+tag@example.com", chart_json([1.0, 1.0, 1.0, 1.0, 1.0]))
      .await;

    let found = client.fetch_chart(&id("a+tag@example.com")).await.expect("fetch");
    assert!(found.is_some());
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_no_rows_error_maps_to_not_found() {
  eprintln!("[TEST] test_fetch_no_rows_error_maps_to_not_found");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    state
      .fail_next(
        StatusCode::NOT_ACCEPTABLE,
        json!({"code": "PGRST116", "message": "The result contains 0 rows"})
      )
      .await;

    let err = client.fetch_chart(&id("ann@example.com")).await.expect_err("must fail");
    assert_eq!(err, StoreError::NotFound);
    assert!(err.is_not_found());
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_malformed_chart_data() {
  eprintln!("[TEST] test_fetch_malformed_chart_data");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    state
      .put_row("ann@example.com", json!([{"day": "Mon", "duration": 1}]))
      .await;

    let err = client.fetch_chart(&id("ann@example.com")).await.expect_err("must fail");
    assert!(matches!(err, StoreError::Malformed(_)), "got {err:?}");
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_server_error_maps_to_http() {
  eprintln!("[TEST] test_server_error_maps_to_http");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    state
      .fail_next(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"code": "XX000", "message": "boom"})
      )
      .await;

    let err = client.fetch_chart(&id("ann@example.com")).await.expect_err("must fail");
    match err {
      StoreError::Http { status, body } => {
        assert_eq!(status, 500);
        assert!(body.contains("boom"));
      }
      other => panic!("unexpected {other:?}")
    }
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_wrong_key_is_unauthorized() {
  eprintln!("[TEST] test_wrong_key_is_unauthorized");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (base_url, _state) = FakeTableApi::spawn().await;
    let client = Client::new(&base_url, "wrong", "user_charts", "email", Duration::from_secs(5))
      .expect("client");

    let err = client.fetch_chart(&id("ann@example.com")).await.expect_err("must fail");
    assert_eq!(err, StoreError::Unauthorized(401));

    let err = client
      .upsert_chart(&id("ann@example.com"), &SeriesModel::default())
      .await
      .expect_err("must fail");
    assert_eq!(err, StoreError::Unauthorized(401));
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
  eprintln!("[TEST] test_unreachable_server_is_transport_error");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let client = Client::new(
      "http://127.0.0.1:9",
      API_KEY,
      "user_charts",
      "email",
      Duration::from_secs(2)
    )
    .expect("client");

    let err = client.fetch_chart(&id("ann@example.com")).await.expect_err("must fail");
    assert!(matches!(err, StoreError::Transport(_)), "got {err:?}");
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_upsert_inserts_then_replaces() {
  eprintln!("[TEST] test_upsert_inserts_then_replaces");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    let who = id("ann@example.com");

    client
      .upsert_chart(&who, &SeriesModel::default())
      .await
      .expect("insert");
    let edited = SeriesModel::from_values([22.0, 60.0, 38.0, 55.0, 42.0]).expect("series");
    client.upsert_chart(&who, &edited).await.expect("replace");

    assert_eq!(
      state.row("ann@example.com").await,
      Some(chart_json([22.0, 60.0, 38.0, 55.0, 42.0]))
    );
    assert_eq!(state.upsert_count().await, 2);

    let prefer = state.prefer_headers.read().await;
    assert!(prefer.iter().all(|p| p.contains("resolution=merge-duplicates")));
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_upsert_body_shape() {
  eprintln!("[TEST] test_upsert_body_shape");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, state) = setup().await;
    client
      .upsert_chart(&id("ann@example.com"), &SeriesModel::default())
      .await
      .expect("upsert");

    let bodies = state.upsert_bodies.read().await;
    assert_eq!(
      bodies[0],
      json!([{
        "email": "ann@example.com",
        "chart_data": chart_json([22.0, 45.0, 38.0, 55.0, 42.0])
      }])
    );
  })
  .await
  .expect("test timed out");
}

#[tokio::test]
async fn test_fetch_returns_upserted_series() {
  eprintln!("[TEST] test_fetch_returns_upserted_series");
  tokio::time::timeout(TEST_TIMEOUT, async {
    let (client, _state) = setup().await;
    let who = id("bob@example.com");
    let series = SeriesModel::from_values([0.0, 1.5, 2.0, 3.0, 4.0]).expect("series");

    client.upsert_chart(&who, &series).await.expect("upsert");
    let back = client.fetch_chart(&who).await.expect("fetch");
    assert_eq!(back, Some(series));
  })
  .await
  .expect("test timed out");
}
