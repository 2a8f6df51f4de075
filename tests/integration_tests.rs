//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: stream registry → Graph API requests →
//! Arrow batches, state checkpoints, and Parquet output.

use fbads_sync::config::ConnectorConfig;
use fbads_sync::engine::{Message, SyncConfig, SyncEngine};
use fbads_sync::http::HttpClient;
use fbads_sync::output::{arrow_to_json, output_file_name, write_batches_to_parquet};
use fbads_sync::state::StateManager;
use fbads_sync::stream::{registry, Catalog};
use fbads_sync::types::LogLevel;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

fn test_config(api_url: &str, account_ids: &[&str]) -> ConnectorConfig {
    ConnectorConfig::from_value(json!({
        "access_token": "test-token",
        "account_ids": account_ids,
        "api_url": api_url,
        "page_size": 25,
        "http": {"max_retries": 0, "rate_limit_rps": null}
    }))
    .unwrap()
}

fn rule(id: &str, updated_time: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Rule {id}"),
        "account_id": "120218956",
        "evaluation_spec": {
            "evaluation_type": "SCHEDULE",
            "filters": [
                {"field": "spent", "operator": "GREATER_THAN", "value": "100000"}
            ]
        },
        "execution_spec": {"execution_type": "PAUSE"},
        "updated_time": updated_time
    })
}

fn label(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "created_time": "2024-03-01T12:00:00+0000",
        "updated_time": "2024-03-02T12:00:00+0000"
    })
}

fn page(records: Vec<Value>, after: Option<&str>) -> Value {
    let mut body = json!({ "data": records });
    if let Some(cursor) = after {
        body["paging"] = json!({ "cursors": { "before": "B0", "after": cursor } });
    }
    body
}

fn record_rows(messages: &[Message]) -> usize {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { batch, .. } => Some(batch.num_rows()),
            _ => None,
        })
        .sum()
}

fn first_bookmark(messages: &[Message], pointer: &str) -> Option<String> {
    messages.iter().find_map(|m| match m {
        Message::State { value } => value
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}

// ============================================================================
// Full Sync Flow
// ============================================================================

#[tokio::test]
async fn test_adrules_sync_end_to_end() {
    let mock_server = MockServer::start().await;

    // Page 1 carries a cursor, page 2 ends the stream
    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adrules_library"))
        .and(query_param("access_token", "test-token"))
        .and(query_param("limit", "25"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                rule("rule-1", "2024-05-21T07:24:30+0000"),
                rule("rule-2", "2024-05-21T08:00:00+0000"),
            ],
            Some("CURSOR-2"),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adrules_library"))
        .and(query_param("after", "CURSOR-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![rule("rule-3", "2024-05-22T10:15:00+0000")],
            None,
        )))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["120218956"]);
    let client = HttpClient::from_connector(&config);
    let mut engine = SyncEngine::new(client, StateManager::in_memory());

    let definitions = vec![registry::adrules_library().unwrap()];
    let messages = engine.sync_streams(&definitions, &config).await.unwrap();

    // Schema comes before any record
    match &messages[0] {
        Message::Schema {
            stream,
            key_properties,
            ..
        } => {
            assert_eq!(stream, "adrules_library");
            assert_eq!(key_properties, &["id", "updated_time"]);
        }
        other => panic!("Expected schema message first, got {other:?}"),
    }

    assert_eq!(record_rows(&messages), 3);

    // Bookmark lands on the highest updated_time seen
    let bookmark = first_bookmark(
        &messages,
        "/streams/adrules_library/accounts/120218956/bookmark",
    );
    assert_eq!(bookmark.as_deref(), Some("2024-05-22T10:15:00+0000"));

    let stats = engine.stats();
    assert_eq!(stats.records_synced, 3);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.streams_synced, 1);
    assert_eq!(stats.accounts_synced, 1);
    assert_eq!(stats.errors, 0);

    // Nested specs survive the Arrow round trip
    let batch = messages
        .iter()
        .find_map(|m| match m {
            Message::Record { batch, .. } => Some(batch.clone()),
            _ => None,
        })
        .unwrap();
    let rows = arrow_to_json(&batch).unwrap();
    assert_eq!(rows[0]["id"], "rule-1");
    assert_eq!(rows[0]["evaluation_spec"]["evaluation_type"], "SCHEDULE");
    assert_eq!(
        rows[0]["evaluation_spec"]["filters"][0]["operator"],
        "GREATER_THAN"
    );
}

#[tokio::test]
async fn test_second_run_resumes_from_bookmark() {
    let mock_server = MockServer::start().await;

    // First run syncs without a filter
    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adrules_library"))
        .and(query_param_is_missing("filtering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![rule("rule-1", "2024-05-21T07:24:30+0000")],
            None,
        )))
        .mount(&mock_server)
        .await;

    // Second run must ask Graph for rows past the stored bookmark
    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adrules_library"))
        .and(query_param(
            "filtering",
            r#"[{"field":"adrules_library.updated_time","operator":"GREATER_THAN","value":1716276270}]"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![rule("rule-2", "2024-06-01T00:00:00+0000")],
            None,
        )))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["120218956"]);
    let state = StateManager::in_memory();
    let definitions = vec![registry::adrules_library().unwrap()];

    let mut first = SyncEngine::new(HttpClient::from_connector(&config), state.clone());
    let messages = first.sync_streams(&definitions, &config).await.unwrap();
    assert_eq!(record_rows(&messages), 1);
    assert_eq!(
        state.get_bookmark("adrules_library", "120218956").await,
        Some("2024-05-21T07:24:30+0000".to_string())
    );

    let mut second = SyncEngine::new(HttpClient::from_connector(&config), state.clone());
    let messages = second.sync_streams(&definitions, &config).await.unwrap();
    assert_eq!(record_rows(&messages), 1);
    assert_eq!(
        state.get_bookmark("adrules_library", "120218956").await,
        Some("2024-06-01T00:00:00+0000".to_string())
    );
}

#[tokio::test]
async fn test_campaigns_filter_addresses_campaign_entity() {
    let mock_server = MockServer::start().await;

    // Campaigns address the filtering field as "campaign", not the stream name
    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/campaigns"))
        .and(query_param(
            "filtering",
            r#"[{"field":"campaign.updated_time","operator":"GREATER_THAN","value":1716276270}]"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({
                "id": "cmp-1",
                "name": "Spring Sale",
                "account_id": "120218956",
                "objective": "OUTCOME_TRAFFIC",
                "status": "ACTIVE",
                "updated_time": "2024-06-02T09:30:00+0000"
            })],
            None,
        )))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["120218956"]);
    let state = StateManager::from_json(
        r#"{
            "streams": {
                "campaigns": {
                    "accounts": {
                        "120218956": {"bookmark": "2024-05-21T07:24:30+0000"}
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let mut engine = SyncEngine::new(HttpClient::from_connector(&config), state.clone());
    let definitions = vec![registry::campaigns().unwrap()];
    let messages = engine.sync_streams(&definitions, &config).await.unwrap();

    assert_eq!(record_rows(&messages), 1);
    assert_eq!(
        state.get_bookmark("campaigns", "120218956").await,
        Some("2024-06-02T09:30:00+0000".to_string())
    );
}

#[tokio::test]
async fn test_adlabels_full_table_sends_no_filter_or_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adlabels"))
        .and(query_param_is_missing("filtering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![label("lbl-1", "Brand"), label("lbl-2", "Retargeting")],
            None,
        )))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["120218956"]);
    let mut engine = SyncEngine::new(
        HttpClient::from_connector(&config),
        StateManager::in_memory(),
    );

    let definitions = vec![registry::adlabels().unwrap()];
    let messages = engine.sync_streams(&definitions, &config).await.unwrap();

    assert_eq!(record_rows(&messages), 2);
    assert!(
        !messages.iter().any(Message::is_state),
        "Full-table streams never checkpoint"
    );
}

// ============================================================================
// Retry Behavior
// ============================================================================

#[tokio::test]
async fn test_transient_graph_error_is_retried() {
    let mock_server = MockServer::start().await;

    // Graph reports throttling as HTTP 400 with a transient body code
    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adlabels"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Application request limit reached",
                "type": "OAuthException",
                "code": 4,
                "fbtrace_id": "AbCdEfGh"
            }
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adlabels"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![label("lbl-1", "Brand")], None)),
        )
        .mount(&mock_server)
        .await;

    let config = ConnectorConfig::from_value(json!({
        "access_token": "test-token",
        "account_ids": ["120218956"],
        "api_url": mock_server.uri(),
        "http": {
            "max_retries": 2,
            "rate_limit_rps": null,
            "retry_backoff": {"type": "constant", "initial_ms": 10, "max_ms": 50}
        }
    }))
    .unwrap();

    let mut engine = SyncEngine::new(
        HttpClient::from_connector(&config),
        StateManager::in_memory(),
    );
    let definitions = vec![registry::adlabels().unwrap()];
    let messages = engine.sync_streams(&definitions, &config).await.unwrap();

    assert_eq!(record_rows(&messages), 1);
    assert_eq!(engine.stats().errors, 0);
}

#[tokio::test]
async fn test_expired_token_fails_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adrules_library"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Error validating access token: Session has expired",
                "type": "OAuthException",
                "code": 190,
                "error_subcode": 463,
                "fbtrace_id": "AbCdEfGh"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ConnectorConfig::from_value(json!({
        "access_token": "stale-token",
        "account_ids": ["120218956"],
        "api_url": mock_server.uri(),
        "http": {
            "max_retries": 3,
            "rate_limit_rps": null,
            "retry_backoff": {"type": "constant", "initial_ms": 10, "max_ms": 50}
        }
    }))
    .unwrap();

    let mut engine = SyncEngine::new(
        HttpClient::from_connector(&config),
        StateManager::in_memory(),
    );
    let definitions = vec![registry::adrules_library().unwrap()];
    let err = engine
        .sync_streams(&definitions, &config)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Graph API error 190"));
    assert_eq!(engine.stats().errors, 1);
}

#[tokio::test]
async fn test_keep_going_syncs_remaining_accounts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_111/adlabels"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_222/adlabels"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![label("lbl-1", "Brand")], None)),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["111", "222"]);
    let mut engine = SyncEngine::new(
        HttpClient::from_connector(&config),
        StateManager::in_memory(),
    )
    .with_config(SyncConfig::new().with_fail_fast(false));

    let definitions = vec![registry::adlabels().unwrap()];
    let messages = engine.sync_streams(&definitions, &config).await.unwrap();

    assert_eq!(record_rows(&messages), 1);
    assert!(messages
        .iter()
        .any(|m| matches!(m, Message::Log { level: LogLevel::Error, .. })));
    assert_eq!(engine.stats().errors, 1);
    assert_eq!(engine.stats().accounts_synced, 1);
}

// ============================================================================
// Parquet Output
// ============================================================================

#[tokio::test]
async fn test_multi_account_parquet_output() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_111/adlabels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![label("lbl-1", "Brand"), label("lbl-2", "Retargeting")],
            None,
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_222/adlabels"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![label("lbl-9", "Prospecting")], None)),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["111", "222"]);
    let mut engine = SyncEngine::new(
        HttpClient::from_connector(&config),
        StateManager::in_memory(),
    );
    let definitions = vec![registry::adlabels().unwrap()];
    let messages = engine.sync_streams(&definitions, &config).await.unwrap();

    let mut by_account: BTreeMap<String, Vec<_>> = BTreeMap::new();
    for message in &messages {
        if let Message::Record {
            stream,
            account_id,
            batch,
        } = message
        {
            assert_eq!(stream, "adlabels");
            by_account
                .entry(account_id.clone())
                .or_default()
                .push(batch.clone());
        }
    }
    assert_eq!(by_account.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let mut written = Vec::new();
    for (account_id, batches) in &by_account {
        let file_name = output_file_name("adlabels", account_id);
        let path = dir.path().join(&file_name);
        let rows = write_batches_to_parquet(&path, batches, None).unwrap();
        written.push((file_name, rows));
    }

    assert_eq!(
        written,
        vec![
            ("adlabels-act_111.parquet".to_string(), 2),
            ("adlabels-act_222.parquet".to_string(), 1),
        ]
    );

    // Files read back with the rows intact
    let file = std::fs::File::open(dir.path().join("adlabels-act_111.parquet")).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let total: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(total, 2);
}

// ============================================================================
// State Persistence
// ============================================================================

#[tokio::test]
async fn test_state_file_round_trip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v21.0/act_120218956/adrules_library"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![rule("rule-1", "2024-05-21T07:24:30+0000")],
            None,
        )))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let config = test_config(&mock_server.uri(), &["120218956"]);
    let mut engine = SyncEngine::new(
        HttpClient::from_connector(&config),
        StateManager::new(&state_path),
    );
    let definitions = vec![registry::adrules_library().unwrap()];
    engine.sync_streams(&definitions, &config).await.unwrap();

    // Checkpoint reaches disk
    let contents = std::fs::read_to_string(&state_path).unwrap();
    let on_disk: Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        on_disk
            .pointer("/streams/adrules_library/accounts/120218956/bookmark")
            .and_then(Value::as_str),
        Some("2024-05-21T07:24:30+0000")
    );

    // A fresh manager picks the bookmark back up
    let reloaded = StateManager::from_file(&state_path).unwrap();
    assert_eq!(
        reloaded.get_bookmark("adrules_library", "120218956").await,
        Some("2024-05-21T07:24:30+0000".to_string())
    );
}

// ============================================================================
// Catalog Discovery
// ============================================================================

#[test]
fn test_catalog_lists_builtin_streams() {
    let definitions = registry::all().unwrap();
    let catalog = Catalog::from_definitions(&definitions).to_json();

    let streams = catalog["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 3);

    assert_eq!(streams[0]["stream"], "adrules_library");
    assert_eq!(streams[0]["tap_stream_id"], "adrules_library");
    assert_eq!(streams[0]["replication_method"], "INCREMENTAL");
    assert_eq!(streams[0]["replication_key"], "updated_time");
    assert_eq!(streams[0]["key_properties"], json!(["id", "updated_time"]));
    assert_eq!(
        streams[0]["schema"]["properties"]["updated_time"]["format"],
        "date-time"
    );

    assert_eq!(streams[1]["stream"], "campaigns");
    assert_eq!(streams[2]["stream"], "adlabels");
    assert_eq!(streams[2]["replication_method"], "FULL_TABLE");
}
