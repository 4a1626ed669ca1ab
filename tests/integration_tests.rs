//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → HTTP requests → ordered rows → table

use futures::StreamExt;
use pretty_assertions::assert_eq;
use rest_ingest::http::RetryConfig;
use rest_ingest::{
    BackoffType, ColumnType, Error, FieldValue, IngestConfig, IngestionEngine, Method,
    PaginationConfig, SchemaMode, StopCondition, Table, TypeKind,
};
use serde_json::json;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        base_delay_ms: 5,
        max_delay_ms: 20,
        backoff: BackoffType::Exponential,
        jitter: false,
    }
}

fn offset_config(server: &MockServer, limit: u64) -> IngestConfig {
    IngestConfig::new(format!("{}/items", server.uri()))
        .with_pagination(PaginationConfig::offset(limit))
        .with_retry(fast_retry())
        .without_rate_limit()
}

async fn mount_page(server: &MockServer, offset: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", offset))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn ids(table: &Table) -> Vec<i64> {
    table
        .column("id")
        .unwrap_or_default()
        .into_iter()
        .filter_map(FieldValue::as_i64)
        .collect()
}

// ============================================================================
// Pagination Integration Tests
// ============================================================================

#[tokio::test]
async fn test_offset_pages_from_yaml_config() {
    let server = MockServer::start().await;

    for (offset, body) in [
        ("0", json!({"items": [{"id": 1}, {"id": 2}]})),
        ("2", json!({"items": [{"id": 3}, {"id": 4}]})),
        ("4", json!({"items": [{"id": 5}]})),
    ] {
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("offset", offset))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let yaml = format!(
        r#"
base_url: "{}/items"
records_path: items
pagination:
  type: offset
  limit: 2
rate_limit: null
"#,
        server.uri()
    );
    let config = IngestConfig::from_yaml_str(&yaml).unwrap();
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let (table, stats) = engine.ingest_table_with_stats().await.unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3, 4, 5]);
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.rows_emitted, 5);
}

#[tokio::test]
async fn test_cursor_pagination_with_has_more() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("starting_after", "cus_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 3}],
            "has_more": false,
            "last": "cus_3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}, {"id": 2}],
            "has_more": true,
            "last": "cus_2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = IngestConfig::new(format!("{}/customers", server.uri()))
        .with_records_path("data")
        .with_pagination(
            PaginationConfig::cursor("starting_after", "last")
                .with_page_size("limit", 2)
                .with_stop_condition(StopCondition::has_more("has_more")),
        )
        .without_rate_limit();
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_next_url_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 3}],
            "next": null
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 1}, {"id": 2}],
            "next": format!("{}/repos?page=2", server.uri())
        })))
        .mount(&server)
        .await;

    let config = IngestConfig::new(format!("{}/repos", server.uri()))
        .with_records_path("results")
        .with_pagination(PaginationConfig::next_url("next"))
        .without_rate_limit();
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_page_number_stops_at_total_pages() {
    let server = MockServer::start().await;

    for page in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [{"id": page.parse::<i64>().unwrap()}],
                "meta": {"pages": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = IngestConfig::new(format!("{}/events", server.uri()))
        .with_records_path("events")
        .with_pagination(
            PaginationConfig::page_number("page", 1)
                .with_stop_condition(StopCondition::total_pages("meta.pages")),
        )
        .without_rate_limit();
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(ids(&table), vec![1, 2]);
}

#[test_case(1 ; "sequential")]
#[test_case(4 ; "concurrent")]
#[tokio::test]
async fn test_max_pages_never_exceeded(concurrency: usize) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(3)
        .mount(&server)
        .await;

    let config = offset_config(&server, 1)
        .with_max_pages(3)
        .with_concurrency(concurrency);
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(table.num_rows(), 3);
}

#[tokio::test]
async fn test_repeated_cursor_is_a_loop() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}],
            "next": "same"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = IngestConfig::new(format!("{}/feed", server.uri()))
        .with_records_path("data")
        .with_pagination(PaginationConfig::cursor("cursor", "next"))
        .without_rate_limit();
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let failure = engine.ingest_table().await.unwrap_err();

    assert!(matches!(failure.root(), Error::PaginationLoop { .. }));
}

// ============================================================================
// Ordering Integration Tests
// ============================================================================

#[test_case(1 ; "sequential")]
#[test_case(4 ; "concurrent")]
#[tokio::test]
async fn test_row_order_matches_page_order(concurrency: usize) {
    let server = MockServer::start().await;

    // Early pages answer slowest
    for offset in 0..6u64 {
        let delay = Duration::from_millis(150u64.saturating_sub(offset * 30));
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": offset}]))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = offset_config(&server, 1).with_concurrency(concurrency);
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(ids(&table), vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_replay_yields_identical_table() {
    let server = MockServer::start().await;
    mount_page(&server, "0", json!([{"id": 1, "v": 1}, {"id": 2, "v": 2.5}])).await;
    mount_page(&server, "2", json!([{"id": 3, "v": "x"}])).await;

    let engine = IngestionEngine::with_reqwest(offset_config(&server, 2)).unwrap();

    let first = engine.ingest_table().await.unwrap();
    let second = engine.ingest_table().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.num_rows(), 3);
}

// ============================================================================
// Schema Integration Tests
// ============================================================================

#[tokio::test]
async fn test_missing_field_becomes_nullable() {
    let server = MockServer::start().await;
    mount_page(&server, "0", json!([{"id": 1}])).await;
    mount_page(&server, "1", json!([{"id": 2, "name": "x"}])).await;
    mount_page(&server, "2", json!([])).await;

    let engine = IngestionEngine::with_reqwest(offset_config(&server, 1)).unwrap();

    let table = engine.ingest_table().await.unwrap();

    let schema = table.schema();
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "name"]);
    assert_eq!(schema.column_type("id"), Some(ColumnType::of(TypeKind::Integer)));
    assert_eq!(
        schema.column_type("name"),
        Some(ColumnType::nullable(TypeKind::String))
    );
    assert_eq!(
        table.to_json_rows(),
        vec![json!({"id": 1, "name": null}), json!({"id": 2, "name": "x"})]
    );
}

#[test_case(SchemaMode::Buffered ; "buffered")]
#[test_case(SchemaMode::Eager ; "eager")]
#[tokio::test]
async fn test_widening_across_pages(mode: SchemaMode) {
    let server = MockServer::start().await;
    mount_page(&server, "0", json!([{"id": 1, "v": 1}])).await;
    mount_page(&server, "1", json!([{"id": 2, "v": 2.5}])).await;
    mount_page(&server, "2", json!([{"id": 3, "v": "high"}])).await;
    mount_page(&server, "3", json!([])).await;

    let config = offset_config(&server, 1).with_schema_mode(mode);
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(
        table.schema().column_type("v"),
        Some(ColumnType::of(TypeKind::String))
    );
    let values: Vec<_> = table
        .column("v")
        .unwrap()
        .into_iter()
        .filter_map(FieldValue::to_text)
        .collect();
    assert_eq!(values, vec!["1", "2.5", "high"]);
}

#[tokio::test]
async fn test_table_exports_record_batch() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "0",
        json!([{"id": 1, "score": 0.5, "ok": true}, {"id": 2, "score": 1.5, "ok": false}]),
    )
    .await;

    let engine = IngestionEngine::with_reqwest(offset_config(&server, 10)).unwrap();

    let table = engine.ingest_table().await.unwrap();
    let batch = table.to_record_batch().unwrap();

    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 3);
    assert_eq!(batch.schema().field(1).name(), "score");
}

// ============================================================================
// Request Integration Tests
// ============================================================================

#[tokio::test]
async fn test_post_with_body_headers_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("Authorization", "Bearer secret"))
        .and(query_param("fields", "id"))
        .and(body_json(json!({"filter": {"active": true}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": [{"id": 7}]})))
        .expect(1)
        .mount(&server)
        .await;

    let config = IngestConfig::new(format!("{}/search", server.uri()))
        .with_post_body(json!({"filter": {"active": true}}))
        .with_header("Authorization", "Bearer secret")
        .with_query("fields", "id")
        .with_records_path("hits")
        .without_rate_limit();
    assert_eq!(config.method, Method::POST);
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let table = engine.ingest_table().await.unwrap();

    assert_eq!(ids(&table), vec![7]);
}

// ============================================================================
// Failure Integration Tests
// ============================================================================

#[tokio::test]
async fn test_server_errors_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("unavailable"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "2", json!([])).await;

    let engine = IngestionEngine::with_reqwest(offset_config(&server, 2)).unwrap();

    let (table, stats) = engine.ingest_table_with_stats().await.unwrap();

    assert_eq!(ids(&table), vec![1, 2]);
    assert_eq!(stats.retries, 2);
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "0", json!([{"id": 1}])).await;

    let engine = IngestionEngine::with_reqwest(offset_config(&server, 5)).unwrap();

    let (table, stats) = engine.ingest_table_with_stats().await.unwrap();

    assert_eq!(ids(&table), vec![1]);
    assert_eq!(stats.retries, 1);
}

#[tokio::test]
async fn test_unauthorized_aborts_with_rows_produced() {
    let server = MockServer::start().await;
    mount_page(&server, "0", json!([{"id": 1}, {"id": 2}])).await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let config = offset_config(&server, 2).with_schema_mode(SchemaMode::Eager);
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let failure = engine.ingest_table().await.unwrap_err();

    assert!(matches!(
        failure.root(),
        Error::ClientError { status: 401, .. }
    ));
    assert!(matches!(
        failure.error,
        Error::Aborted { rows_produced: 2, .. }
    ));
    assert_eq!(ids(&failure.partial), vec![1, 2]);
    assert_eq!(failure.stats.retries, 0);
}

#[tokio::test]
async fn test_stream_yields_rows_before_error() {
    let server = MockServer::start().await;
    mount_page(&server, "0", json!([{"id": 1}])).await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let config = offset_config(&server, 1).with_schema_mode(SchemaMode::Eager);
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let items: Vec<_> = engine.ingest().collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    let error = items[1].as_ref().unwrap_err();
    assert!(matches!(error.root(), Error::MalformedResponse { .. }));
    assert_eq!(error.rows_produced(), Some(1));
}

#[tokio::test]
async fn test_ingest_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1}]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = offset_config(&server, 1).with_ingest_timeout(Duration::from_millis(200));
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let failure = engine.ingest_table().await.unwrap_err();

    assert!(matches!(
        failure.root(),
        Error::Timeout { timeout_ms: 200 }
    ));
}

#[tokio::test]
async fn test_request_timeout_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1}]))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "0", json!([{"id": 1}])).await;

    let config = offset_config(&server, 5).with_request_timeout(Duration::from_millis(100));
    let engine = IngestionEngine::with_reqwest(config).unwrap();

    let (table, stats) = engine.ingest_table_with_stats().await.unwrap();

    assert_eq!(ids(&table), vec![1]);
    assert_eq!(stats.retries, 1);
}
