//! Insecure mode: native gRPC on one port, REST on another, the REST side
//! dialing the gRPC port.

use flowgate_types::admin::{
    ExecutionCreateRequest, ExecutionSpec, Identifier, MatchableResource,
    WorkflowAttributesGetRequest, WorkflowExecutionGetRequest, WorkflowExecutionIdentifier,
};
use serde_json::{json, Value};
use tonic::Code;

use super::support::{ephemeral_config, TestServer, DOMAIN, PROJECT};

#[tokio::test]
async fn test_healthcheck_and_openapi() {
    let server = TestServer::start(ephemeral_config()).await;
    let client = reqwest::Client::new();

    let health = client.get(server.url("/healthcheck")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert!(health.headers().contains_key("x-request-id"));
    assert!(health.bytes().await.unwrap().is_empty());

    let openapi = client.get(server.url("/api/v1/openapi")).send().await.unwrap();
    assert_eq!(openapi.status(), 200);
    let doc: Value = openapi.json().await.unwrap();
    assert!(doc["paths"]["/api/v1/executions"].is_object());

    server.shutdown().await;
}

#[tokio::test]
async fn test_workflow_attribute_scenario_over_rest() {
    let server = TestServer::start(ephemeral_config()).await;
    let client = reqwest::Client::new();
    let workflow_path = format!("/api/v1/workflow_attributes/{PROJECT}/{DOMAIN}/wf");

    let put = client
        .put(server.url(&workflow_path))
        .json(&json!({
            "attributes": {
                "matching_attributes": {
                    "execution_queue_attributes": {"tags": ["q1"]}
                }
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 200);

    let get = client
        .get(server.url(&format!("{workflow_path}?resource_type=EXECUTION_QUEUE")))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), 200);
    let body: Value = get.json().await.unwrap();
    assert_eq!(body["attributes"]["workflow"], "wf");
    assert_eq!(
        body["attributes"]["matching_attributes"]["execution_queue_attributes"]["tags"],
        json!(["q1"])
    );

    // Exact match only: the project/domain level has nothing.
    let parent = client
        .get(server.url(&format!(
            "/api/v1/project_domain_attributes/{PROJECT}/{DOMAIN}?resource_type=EXECUTION_QUEUE"
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(parent.status(), 404);
    let error: Value = parent.json().await.unwrap();
    assert_eq!(error["code"], Code::NotFound as i32);
    assert!(error["message"].as_str().is_some());

    let delete = client
        .delete(server.url(&format!("{workflow_path}?resource_type=2")))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), 200);

    let again = client
        .delete(server.url(&format!("{workflow_path}?resource_type=2")))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn test_rest_writes_are_visible_to_native_clients() {
    let server = TestServer::start(ephemeral_config()).await;

    let put = reqwest::Client::new()
        .put(server.url(&format!("/api/v1/workflow_attributes/{PROJECT}/{DOMAIN}/wf")))
        .json(&json!({
            "attributes": {
                "matching_attributes": {"execution_cluster_label": {"value": "gpu"}}
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 200);

    let mut grpc = server.grpc_client().await;
    let reply = grpc
        .get_workflow_attributes(WorkflowAttributesGetRequest {
            project: PROJECT.into(),
            domain: DOMAIN.into(),
            workflow: "wf".into(),
            resource_type: MatchableResource::ExecutionClusterLabel as i32,
        })
        .await
        .unwrap()
        .into_inner();
    let label = reply
        .attributes
        .and_then(|a| a.matching_attributes)
        .and_then(|m| m.execution_cluster_label)
        .unwrap();
    assert_eq!(label.value, "gpu");

    // Same identity, different resource type.
    let status = grpc
        .get_workflow_attributes(WorkflowAttributesGetRequest {
            project: PROJECT.into(),
            domain: DOMAIN.into(),
            workflow: "wf".into(),
            resource_type: MatchableResource::ExecutionQueue as i32,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    server.shutdown().await;
}

#[tokio::test]
async fn test_execution_lifecycle_across_protocols() {
    let server = TestServer::start(ephemeral_config()).await;
    let mut grpc = server.grpc_client().await;

    let created = grpc
        .create_execution(ExecutionCreateRequest {
            project: PROJECT.into(),
            domain: DOMAIN.into(),
            name: "run-1".into(),
            spec: Some(ExecutionSpec {
                launch_plan: Some(Identifier {
                    project: PROJECT.into(),
                    domain: DOMAIN.into(),
                    name: "lp".into(),
                    version: "v1".into(),
                }),
                ..Default::default()
            }),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(created.id.unwrap().name, "run-1");

    let client = reqwest::Client::new();
    let execution_path = format!("/api/v1/executions/{PROJECT}/{DOMAIN}/run-1");

    let fetched: Value = client
        .get(server.url(&execution_path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["id"]["name"], "run-1");

    let listed: Value = client
        .get(server.url(&format!("/api/v1/executions/{PROJECT}/{DOMAIN}?limit=10")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["executions"].as_array().unwrap().len(), 1);
    assert_eq!(listed["executions"][0]["closure"]["phase"], "QUEUED");

    let duplicate = client
        .post(server.url("/api/v1/executions"))
        .json(&json!({
            "project": PROJECT,
            "domain": DOMAIN,
            "name": "run-1",
            "spec": {"launch_plan": {"project": PROJECT, "domain": DOMAIN, "name": "lp"}}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    let terminated = client
        .delete(server.url(&execution_path))
        .json(&json!({"cause": "operator"}))
        .send()
        .await
        .unwrap();
    assert_eq!(terminated.status(), 200);

    let execution = grpc
        .get_execution(WorkflowExecutionGetRequest {
            id: Some(WorkflowExecutionIdentifier {
                project: PROJECT.into(),
                domain: DOMAIN.into(),
                name: "run-1".into(),
            }),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(execution.closure.unwrap().abort_cause, "operator");

    server.shutdown().await;
}

#[tokio::test]
async fn test_missing_required_fields_are_rejected() {
    let server = TestServer::start(ephemeral_config()).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/v1/executions"))
        .json(&json!({"project": PROJECT, "domain": DOMAIN}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], Code::InvalidArgument as i32);

    let mut grpc = server.grpc_client().await;
    let status = grpc
        .get_execution(WorkflowExecutionGetRequest { id: None })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.shutdown().await;
}

#[tokio::test]
async fn test_every_rpc_is_timed() {
    let server = TestServer::start(ephemeral_config()).await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let response = client
            .get(server.url(&format!("/api/v1/executions/{PROJECT}/{DOMAIN}/missing")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    assert_eq!(
        server.metrics.request_count("GetExecution", Code::NotFound),
        3
    );
    assert!(server
        .metrics
        .encode_text()
        .contains("flowgate_rpc_request_duration_seconds"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_binary_protobuf_bodies() {
    use prost::Message;
    use flowgate_types::admin::{
        ExecutionQueueAttributes, MatchingAttributes, WorkflowAttributes,
        WorkflowAttributesGetResponse, WorkflowAttributesUpdateRequest,
    };

    let server = TestServer::start(ephemeral_config()).await;
    let client = reqwest::Client::new();
    let path = format!("/api/v1/workflow_attributes/{PROJECT}/{DOMAIN}/wf");

    let request = WorkflowAttributesUpdateRequest {
        attributes: Some(WorkflowAttributes {
            matching_attributes: Some(MatchingAttributes {
                execution_queue_attributes: Some(ExecutionQueueAttributes {
                    tags: vec!["bin".into()],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
    };
    let put = client
        .put(server.url(&path))
        .header("content-type", "application/octet-stream")
        .body(request.encode_to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 200);

    let get = client
        .get(server.url(&format!("{path}?resource_type=EXECUTION_QUEUE")))
        .header("accept", "application/octet-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(get.headers()["content-type"], "application/octet-stream");
    let reply = WorkflowAttributesGetResponse::decode(get.bytes().await.unwrap()).unwrap();
    let tags = reply
        .attributes
        .and_then(|a| a.matching_attributes)
        .and_then(|m| m.execution_queue_attributes)
        .map(|q| q.tags)
        .unwrap();
    assert_eq!(tags, vec!["bin"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_cors_when_enabled() {
    let mut config = ephemeral_config();
    config.security.allow_cors = true;
    config.security.allowed_origins = vec!["https://console.example".into()];
    let server = TestServer::start(config).await;

    let preflight = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, server.url("/api/v1/executions"))
        .header("origin", "https://console.example")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(
        preflight.headers()["access-control-allow-origin"],
        "https://console.example"
    );
    assert_eq!(preflight.headers()["access-control-allow-credentials"], "true");

    server.shutdown().await;
}

#[tokio::test]
async fn test_server_reflection_lists_admin_service() {
    use tonic_reflection::pb::v1::server_reflection_client::ServerReflectionClient;
    use tonic_reflection::pb::v1::server_reflection_request::MessageRequest;
    use tonic_reflection::pb::v1::server_reflection_response::MessageResponse;
    use tonic_reflection::pb::v1::ServerReflectionRequest;

    let mut config = ephemeral_config();
    config.grpc_server_reflection = true;
    let server = TestServer::start(config).await;

    let channel = tonic::transport::Endpoint::new(format!("http://{}", server.grpc))
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut client = ServerReflectionClient::new(channel);
    let request = ServerReflectionRequest {
        host: String::new(),
        message_request: Some(MessageRequest::ListServices(String::new())),
    };
    let mut responses = client
        .server_reflection_info(tokio_stream::iter(vec![request]))
        .await
        .unwrap()
        .into_inner();

    let response = responses.message().await.unwrap().unwrap();
    let Some(MessageResponse::ListServicesResponse(list)) = response.message_response else {
        panic!("unexpected reflection response: {response:?}");
    };
    let names: Vec<_> = list.service.into_iter().map(|s| s.name).collect();
    assert!(names.contains(&flowgate_types::ADMIN_SERVICE.to_string()));

    drop(responses);
    server.shutdown().await;
}
