//! Integration tests for the Kubeflow REST binding.
//!
//! These tests use wiremock to stand in for the API server and check that
//! requests are shaped the way the server expects and responses map onto
//! the service contract.

use kfp_client::{KfpClient, ServiceConfig};
use pipeline_service::{ExperimentId, PipelineId, PipelineService, RunId, RunStatus, ServiceError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connected(server: &MockServer) -> KfpClient {
    connected_with(server, ServiceConfig::new(&server.uri())).await
}

async fn connected_with(server: &MockServer, config: ServiceConfig) -> KfpClient {
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "multi_user": config.multi_user
        })))
        .mount(server)
        .await;
    KfpClient::connect(config).await.expect("connect")
}

fn team_config(server: &MockServer) -> ServiceConfig {
    ServiceConfig::new(&server.uri())
        .with_multi_user(true)
        .with_namespace("team-a")
}

#[tokio::test]
async fn connect_fails_when_health_check_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/healthz"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = KfpClient::connect(ServiceConfig::new(&server.uri()))
        .await
        .unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn connect_fails_when_nothing_listens() {
    // Port 9 (discard) is essentially never served locally.
    let err = KfpClient::connect(ServiceConfig::new("http://127.0.0.1:9"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Connection { .. }));
}

#[tokio::test]
async fn token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/healthz"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    KfpClient::connect(ServiceConfig::new(&server.uri()).with_token("s3cret"))
        .await
        .expect("connect with token");
}

#[tokio::test]
async fn resolve_experiment_returns_existing() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/experiments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "experiments": [{"id": "exp-1", "name": "Default"}],
            "total_size": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/experiments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let experiment = client.resolve_experiment("Default").await.unwrap();
    assert_eq!(experiment.id, ExperimentId::from("exp-1"));
}

#[tokio::test]
async fn resolve_experiment_creates_when_missing() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/experiments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/experiments"))
        .and(body_partial_json(json!({"name": "nightly"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "exp-9", "name": "nightly"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let experiment = client.resolve_experiment("nightly").await.unwrap();
    assert_eq!(experiment.id.as_str(), "exp-9");
}

#[tokio::test]
async fn lookup_pipeline_id_absent_is_none() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_size": 0})))
        .mount(&server)
        .await;

    assert_eq!(client.lookup_pipeline_id("hello").await.unwrap(), None);
}

#[tokio::test]
async fn lookup_pipeline_id_found() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pipelines": [{"id": "p-1", "name": "hello", "created_at": "2024-01-01T00:00:00Z"}]
        })))
        .mount(&server)
        .await;

    assert_eq!(
        client.lookup_pipeline_id("hello").await.unwrap(),
        Some(PipelineId::from("p-1"))
    );
}

#[tokio::test]
async fn upload_pipeline_posts_multipart_with_name() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("hello.yaml");
    std::fs::write(&package, "pipelineSpec: {}\n").unwrap();

    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/pipelines/upload"))
        .and(query_param("name", "hello"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "p-new", "name": "hello"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let record = client.upload_pipeline(&package, "hello").await.unwrap();
    assert_eq!(record.id, PipelineId::from("p-new"));
    assert_eq!(record.name, "hello");
}

#[tokio::test]
async fn upload_pipeline_rejection_maps_to_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("hello.yaml");
    std::fs::write(&package, "pipelineSpec: {}\n").unwrap();

    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/pipelines/upload"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "The name hello already exist. Please specify a new name.",
            "code": 6
        })))
        .mount(&server)
        .await;

    match client.upload_pipeline(&package, "hello").await {
        Err(ServiceError::Rejected { status, message }) => {
            assert_eq!(status, 409);
            assert!(message.contains("already exist"));
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn upload_version_passes_pipeline_id() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("hello.yaml");
    std::fs::write(&package, "pipelineSpec: {}\n").unwrap();

    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/pipelines/upload_version"))
        .and(query_param("name", "hello-1700000000"))
        .and(query_param("pipelineid", "p-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "v-1", "name": "hello-1700000000"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let version = client
        .upload_pipeline_version(&package, "hello-1700000000", &PipelineId::from("p-1"))
        .await
        .unwrap();
    assert_eq!(version.pipeline_id, PipelineId::from("p-1"));
    assert_eq!(version.id, "v-1");
}

#[tokio::test]
async fn trigger_run_references_experiment() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/runs"))
        .and(body_partial_json(json!({
            "name": "hello-job",
            "pipeline_spec": {"pipeline_id": "p-1"},
            "resource_references": [
                {"key": {"type": "EXPERIMENT", "id": "exp-1"}, "relationship": "OWNER"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": {"id": "run-1", "name": "hello-job"},
            "pipeline_runtime": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let run_id = client
        .trigger_run(
            &ExperimentId::from("exp-1"),
            "hello-job",
            &PipelineId::from("p-1"),
        )
        .await
        .unwrap();
    assert_eq!(run_id, RunId::from("run-1"));
}

#[tokio::test]
async fn list_pipelines_follows_page_tokens() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/pipelines"))
        .and(query_param("page_token", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pipelines": [{"id": "p-2", "name": "second"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/pipelines"))
        .and(query_param("page_token", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pipelines": [{"id": "p-1", "name": "first"}],
            "next_page_token": "page-2"
        })))
        .mount(&server)
        .await;

    let names: Vec<String> = client
        .list_pipelines()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn list_runs_filters_by_pipeline_and_keeps_order() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs"))
        .and(query_param("sort_by", "created_at desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "runs": [
                {"id": "r-3", "status": "Running", "pipeline_spec": {"pipeline_id": "p-1"}},
                {"id": "r-2", "status": "Succeeded", "pipeline_spec": {"pipeline_id": "p-2"}},
                {"id": "r-1", "status": "Failed", "pipeline_spec": {"pipeline_id": "p-1"}}
            ]
        })))
        .mount(&server)
        .await;

    let runs = client
        .list_runs(Some(&PipelineId::from("p-1")))
        .await
        .unwrap();
    let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r-3", "r-1"]);
    assert_eq!(runs[0].status, RunStatus::Running);
}

#[tokio::test]
async fn list_runs_reads_every_page_to_collect_pipeline_runs() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs"))
        .and(query_param("page_token", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "runs": [
                {"id": "r-9", "status": "Running", "pipeline_spec": {"pipeline_id": "p-other"}}
            ],
            "next_page_token": "older"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs"))
        .and(query_param("page_token", "older"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "runs": [
                {"id": "r-2", "status": "Succeeded", "pipeline_spec": {"pipeline_id": "p-1"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runs = client
        .list_runs(Some(&PipelineId::from("p-1")))
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, RunId::from("r-2"));
}

#[tokio::test]
async fn get_run_parses_status() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs/run-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run": {"id": "run-1", "name": "job", "status": "Terminated"}
        })))
        .mount(&server)
        .await;

    let run = client.get_run(&RunId::from("run-1")).await.unwrap();
    assert_eq!(run.status, RunStatus::Terminated);
}

#[tokio::test]
async fn get_missing_run_is_not_found() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let err = client.get_run(&RunId::from("ghost")).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { kind: "run", .. }));
}

// ---------------------------------------------------------------------------
// Multi-user deployments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multi_user_experiment_lookup_and_create_carry_namespace() {
    let server = MockServer::start().await;
    let client = connected_with(&server, team_config(&server)).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/experiments"))
        .and(query_param("resource_reference_key.type", "NAMESPACE"))
        .and(query_param("resource_reference_key.id", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apis/v1beta1/experiments"))
        .and(body_partial_json(json!({
            "name": "nightly",
            "resource_references": [{
                "key": {"type": "NAMESPACE", "id": "team-a"},
                "relationship": "OWNER"
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "exp-7", "name": "nightly"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let experiment = client.resolve_experiment("nightly").await.unwrap();
    assert_eq!(experiment.id.as_str(), "exp-7");
}

#[tokio::test]
async fn multi_user_run_listing_is_scoped_to_namespace() {
    let server = MockServer::start().await;
    let client = connected_with(&server, team_config(&server)).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs"))
        .and(query_param("resource_reference_key.type", "NAMESPACE"))
        .and(query_param("resource_reference_key.id", "team-a"))
        .and(query_param("sort_by", "created_at desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "runs": [{
                "id": "run-1",
                "status": "Succeeded",
                "pipeline_spec": {"pipeline_id": "p-1"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runs = client
        .list_runs(Some(&PipelineId::from("p-1")))
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Succeeded);
}

#[tokio::test]
async fn single_user_requests_omit_namespace() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/apis/v1beta1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    client.list_runs(None).await.unwrap();

    let requests = server.received_requests().await.expect("recorded requests");
    let runs_request = requests
        .iter()
        .find(|r| r.url.path() == "/apis/v1beta1/runs")
        .expect("runs request");
    assert!(!runs_request
        .url
        .query_pairs()
        .any(|(k, _)| k.starts_with("resource_reference_key")));
}
