//! End-to-end import scenarios against an in-memory database

mod common;

use apiflow_core::ImportConfig;
use apiflow_entities::{
    environments, files, flow_edges, flow_node_requests, flow_nodes, flows, http, http_asserts,
    http_body_raw, http_body_urlencoded, http_headers, http_search_params, variables,
};
use apiflow_events::EventKind;
use apiflow_import_formats::TranslatorRegistry;
use apiflow_import_types::{
    BodyKind, DomainMapping, EnvironmentKind, FileContentType, ImportFormat, MissingData,
};
use common::{Harness, ORDERS, PETSTORE, SCENARIO_HAR, SHOP_FLOW};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

fn api_host() -> Vec<DomainMapping> {
    vec![DomainMapping::new("api.example.com", "API_HOST")]
}

#[tokio::test]
async fn test_har_first_call_lists_domains_and_stores_nothing() -> anyhow::Result<()> {
    let h = Harness::new().await?;

    let response = h.coordinator.import(h.request(SCENARIO_HAR)).await?;

    assert_eq!(response.missing_data, MissingData::Domain);
    assert_eq!(response.domains, vec!["api.example.com".to_string()]);
    assert_eq!(response.flow_id, None);
    assert_eq!(h.count::<http::Entity>().await, 0);
    assert_eq!(h.count::<files::Entity>().await, 0);
    assert_eq!(h.count::<flows::Entity>().await, 0);
    assert_eq!(h.count::<environments::Entity>().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_har_second_call_commits_with_domain_variable() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let db = h.db();

    let response = h
        .coordinator
        .import(h.commit_request(SCENARIO_HAR, api_host()))
        .await?;

    assert_eq!(response.missing_data, MissingData::Unspecified);
    assert!(response.domains.is_empty());
    let flow_id = response.flow_id.expect("stored import returns its flow");

    let requests = http::Entity::find().all(db.as_ref()).await?;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "{{API_HOST}}/users");
    assert_eq!(requests[0].method, "GET");

    let envs = environments::Entity::find().all(db.as_ref()).await?;
    assert_eq!(envs.len(), 1);
    assert_eq!(envs[0].name, "default");
    assert_eq!(envs[0].kind, EnvironmentKind::Global);
    let vars = variables::Entity::find().all(db.as_ref()).await?;
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].key, "API_HOST");
    assert_eq!(vars[0].value, "https://api.example.com");
    assert_eq!(vars[0].env_id, envs[0].id);

    let stored_flows = flows::Entity::find().all(db.as_ref()).await?;
    assert_eq!(stored_flows.len(), 1);
    assert_eq!(stored_flows[0].id, flow_id.to_string());
    assert_eq!(stored_flows[0].name, "import");

    let nodes = flow_nodes::Entity::find().all(db.as_ref()).await?;
    assert_eq!(nodes.len(), 2);
    let edges = flow_edges::Entity::find().all(db.as_ref()).await?;
    assert_eq!(edges.len(), 1);
    let request_node = flow_node_requests::Entity::find().one(db.as_ref()).await?.unwrap();
    assert_eq!(request_node.http_id, Some(requests[0].id.clone()));
    assert_eq!(edges[0].target_id, request_node.flow_node_id);

    // the flow shows up in the file tree
    let sidebar = files::Entity::find_by_id(flow_id.to_string())
        .one(db.as_ref())
        .await?
        .unwrap();
    assert_eq!(sidebar.content_type, FileContentType::Flow);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_imports_share_domain_variable() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let first = h.commit_request(SCENARIO_HAR, api_host());
    let second = h.commit_request(SCENARIO_HAR, api_host());

    let (a, b) = tokio::join!(h.coordinator.import(first), h.coordinator.import(second));
    assert!(a?.flow_id.is_some());
    assert!(b?.flow_id.is_some());

    let envs = environments::Entity::find().all(h.db().as_ref()).await?;
    assert_eq!(envs.len(), 1);
    let vars = variables::Entity::find().all(h.db().as_ref()).await?;
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].key, "API_HOST");
    assert_eq!(vars[0].env_id, envs[0].id);
    assert_eq!(h.count::<http::Entity>().await, 1);
    assert_eq!(h.count::<flows::Entity>().await, 2);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_import_reuses_requests() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let mut http_events = h.events.http.subscribe_key(h.workspace_id);
    let mut file_events = h.events.files.subscribe_key(h.workspace_id);
    let mut flow_events = h.events.flows.subscribe_key(h.workspace_id);

    for _ in 0..2 {
        h.coordinator
            .import(h.commit_request(SCENARIO_HAR, api_host()))
            .await?;
    }

    assert_eq!(h.count::<http::Entity>().await, 1);
    assert_eq!(h.count::<flows::Entity>().await, 2);
    let inserts = http_events
        .drain()
        .iter()
        .filter(|e| e.event.kind == EventKind::Insert)
        .count();
    assert_eq!(inserts, 1);

    // a third import only adds a flow and its sidebar entry
    file_events.drain();
    flow_events.drain();
    h.coordinator
        .import(h.commit_request(SCENARIO_HAR, api_host()))
        .await?;

    assert!(http_events.drain().is_empty());
    let file_kinds: Vec<EventKind> = file_events.drain().iter().map(|e| e.event.kind).collect();
    assert_eq!(file_kinds, vec![EventKind::Create]);
    assert_eq!(flow_events.drain().len(), 1);
    assert_eq!(h.count::<http::Entity>().await, 1);
    assert_eq!(h.count::<variables::Entity>().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_petstore_swagger_import() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let db = h.db();

    // no XHR-like question for specs; commit straight away
    let response = h.coordinator.import(h.commit_request(PETSTORE, Vec::new())).await?;
    assert!(response.flow_id.is_some());

    let requests = http::Entity::find().all(db.as_ref()).await?;
    assert_eq!(requests.len(), 14);
    assert!(requests
        .iter()
        .any(|r| r.method == "GET" && r.url == "https://petstore.swagger.io/v2/pet/42"));

    let create = requests
        .iter()
        .find(|r| r.method == "POST" && r.url == "https://petstore.swagger.io/v2/pet")
        .unwrap();
    assert_eq!(create.body_kind, BodyKind::Raw);
    let body = http_body_raw::Entity::find()
        .filter(http_body_raw::Column::HttpId.eq(create.id.clone()))
        .one(db.as_ref())
        .await?
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body.raw_data)?;
    assert_eq!(json["name"], "doggie");
    let content_type = http_headers::Entity::find()
        .filter(http_headers::Column::HttpId.eq(create.id.clone()))
        .filter(http_headers::Column::Key.eq("Content-Type"))
        .one(db.as_ref())
        .await?
        .unwrap();
    assert_eq!(content_type.value, "application/json");

    for post in requests.iter().filter(|r| r.method == "POST") {
        let asserts = http_asserts::Entity::find()
            .filter(http_asserts::Column::HttpId.eq(post.id.clone()))
            .all(db.as_ref())
            .await?;
        assert_eq!(asserts.len(), 1, "{}", post.url);
        assert_eq!(asserts[0].expression, "response.status == 200");
    }
    Ok(())
}

#[tokio::test]
async fn test_openapi3_prefers_urlencoded_over_xml() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let db = h.db();
    h.coordinator.import(h.commit_request(ORDERS, Vec::new())).await?;

    let create = http::Entity::find()
        .filter(http::Column::Method.eq("POST"))
        .one(db.as_ref())
        .await?
        .unwrap();
    assert_eq!(create.url, "https://eu.orders.example.com/api/orders");
    assert_eq!(create.body_kind, BodyKind::UrlEncoded);
    let rows: Vec<(String, String)> = http_body_urlencoded::Entity::find()
        .filter(http_body_urlencoded::Column::HttpId.eq(create.id.clone()))
        .order_by_asc(http_body_urlencoded::Column::Key)
        .all(db.as_ref())
        .await?
        .into_iter()
        .map(|row| (row.key, row.value))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("quantity".to_string(), "3".to_string()),
            ("sku".to_string(), "A1".to_string())
        ]
    );

    let registry = TranslatorRegistry::default();
    for _ in 0..50 {
        let result = registry.translate(ImportFormat::OpenApi, ORDERS.as_bytes(), h.workspace_id)?;
        let post = result.http_requests.iter().find(|r| r.method == "POST").unwrap();
        assert_eq!(post.body_kind, BodyKind::UrlEncoded);
        assert_eq!(result.asserts[0].expression, "response.status == 200");
    }
    Ok(())
}

#[tokio::test]
async fn test_yaml_flow_commits_in_one_call() -> anyhow::Result<()> {
    let h = Harness::new().await?;
    let db = h.db();

    let response = h.coordinator.import(h.request(SHOP_FLOW)).await?;
    assert_eq!(response.missing_data, MissingData::Unspecified);
    assert!(response.domains.is_empty());
    assert!(response.flow_id.is_some());

    assert_eq!(h.count::<http::Entity>().await, 3);
    let nodes = flow_nodes::Entity::find().all(db.as_ref()).await?;
    // start + one node per step
    assert_eq!(nodes.len(), 4);
    let node = |name: &str| {
        nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.id.clone())
            .unwrap()
    };
    let start = node("Start");

    let edges: Vec<(String, String)> = flow_edges::Entity::find()
        .all(db.as_ref())
        .await?
        .into_iter()
        .map(|e| (e.source_id, e.target_id))
        .collect();
    assert_eq!(edges.len(), 4);
    for expected in [
        (start, node("users")),
        (node("users"), node("create")),
        (node("users"), node("audit")),
        (node("create"), node("audit")),
    ] {
        assert!(edges.contains(&expected), "missing edge {:?}", expected);
    }

    // templated URLs are kept; no environment is invented
    assert_eq!(h.count::<environments::Entity>().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_reimported_delta_carries_no_duplicate_rows() -> anyhow::Result<()> {
    let config = ImportConfig {
        har_delta_mode: true,
        ..ImportConfig::default()
    };
    let h = Harness::with_config(config).await?;
    let db = h.db();
    let har = r#"{"log":{"entries":[{"request":{"method":"GET","url":"https://api.example.com/users?page=2","headers":[{"name":"Accept","value":"application/json"}],"queryString":[{"name":"page","value":"2"}]},"response":{"status":200}}]}}"#;

    h.coordinator.import(h.commit_request(har, api_host())).await?;
    h.coordinator.import(h.commit_request(har, api_host())).await?;

    let deltas = http::Entity::find()
        .filter(http::Column::IsDelta.eq(true))
        .all(db.as_ref())
        .await?;
    assert_eq!(deltas.len(), 2);
    let base_count = http::Entity::find()
        .filter(http::Column::IsDelta.eq(false))
        .count(db.as_ref())
        .await?;
    assert_eq!(base_count, 1);

    // the reimported delta drops rows its base already has
    let mut row_counts = Vec::new();
    for delta in &deltas {
        let headers = http_headers::Entity::find()
            .filter(http_headers::Column::HttpId.eq(delta.id.clone()))
            .count(db.as_ref())
            .await?;
        let params = http_search_params::Entity::find()
            .filter(http_search_params::Column::HttpId.eq(delta.id.clone()))
            .count(db.as_ref())
            .await?;
        row_counts.push((headers, params));
    }
    row_counts.sort();
    assert_eq!(row_counts, vec![(0, 0), (1, 1)]);
    Ok(())
}
