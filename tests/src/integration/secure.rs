//! Secure mode: one TLS listener carrying both protocols.

use flowgate_types::admin::admin_service_client::AdminServiceClient;
use flowgate_types::admin::{
    ExecutionQueueAttributes, MatchableResource, MatchingAttributes,
    ProjectDomainAttributes, ProjectDomainAttributesGetRequest,
    ProjectDomainAttributesUpdateRequest,
};
use serde_json::{json, Value};
use tonic::transport::{Certificate, ClientTlsConfig, Endpoint};
use tonic::Code;

use super::support::{ephemeral_config, TestCertificate, TestServer, DOMAIN, PROJECT};

async fn start_secure(cert: &TestCertificate) -> TestServer {
    let mut config = ephemeral_config();
    config.security.secure = true;
    config.security.certificate_file = Some(cert.cert_path.clone());
    config.security.key_file = Some(cert.key_path.clone());
    TestServer::start(config).await
}

fn https_client(cert: &TestCertificate, server: &TestServer) -> reqwest::Client {
    reqwest::Client::builder()
        .add_root_certificate(reqwest::Certificate::from_pem(cert.cert_pem.as_bytes()).unwrap())
        .resolve("localhost", server.http)
        .build()
        .unwrap()
}

async fn grpc_client(
    cert: &TestCertificate,
    server: &TestServer,
) -> AdminServiceClient<tonic::transport::Channel> {
    let tls = ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(&cert.cert_pem))
        .domain_name("localhost");
    let channel = Endpoint::from_shared(format!("https://{}", server.grpc))
        .unwrap()
        .tls_config(tls)
        .unwrap()
        .connect()
        .await
        .unwrap();
    AdminServiceClient::new(channel)
}

#[tokio::test]
async fn test_one_port_serves_both_protocols() {
    let cert = TestCertificate::localhost();
    let server = start_secure(&cert).await;
    assert_eq!(server.http, server.grpc);

    let https = https_client(&cert, &server);
    let base = format!("https://localhost:{}", server.http.port());

    let health = https.get(format!("{base}/healthcheck")).send().await.unwrap();
    assert_eq!(health.status(), 200);

    // REST write travels back through the same TLS port as gRPC.
    let put = https
        .put(format!(
            "{base}/api/v1/project_domain_attributes/{PROJECT}/{DOMAIN}"
        ))
        .json(&json!({
            "attributes": {
                "matching_attributes": {"execution_queue_attributes": {"tags": ["secure"]}}
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 200);

    let mut grpc = grpc_client(&cert, &server).await;
    let reply = grpc
        .get_project_domain_attributes(ProjectDomainAttributesGetRequest {
            project: PROJECT.into(),
            domain: DOMAIN.into(),
            resource_type: MatchableResource::ExecutionQueue as i32,
        })
        .await
        .unwrap()
        .into_inner();
    let tags = reply
        .attributes
        .and_then(|a| a.matching_attributes)
        .and_then(|m| m.execution_queue_attributes)
        .map(|q| q.tags)
        .unwrap();
    assert_eq!(tags, vec!["secure"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_native_write_visible_over_https() {
    let cert = TestCertificate::localhost();
    let server = start_secure(&cert).await;

    let mut grpc = grpc_client(&cert, &server).await;
    grpc.update_project_domain_attributes(ProjectDomainAttributesUpdateRequest {
        attributes: Some(ProjectDomainAttributes {
            project: PROJECT.into(),
            domain: DOMAIN.into(),
            matching_attributes: Some(MatchingAttributes {
                execution_queue_attributes: Some(ExecutionQueueAttributes {
                    tags: vec!["native".into()],
                }),
                ..Default::default()
            }),
        }),
    })
    .await
    .unwrap();

    let https = https_client(&cert, &server);
    let body: Value = https
        .get(format!(
            "https://localhost:{}/api/v1/project_domain_attributes/{PROJECT}/{DOMAIN}?resource_type=EXECUTION_QUEUE",
            server.http.port()
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["attributes"]["matching_attributes"]["execution_queue_attributes"]["tags"],
        json!(["native"])
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_identity_over_tls() {
    let cert = TestCertificate::localhost();
    let server = start_secure(&cert).await;

    let mut grpc = grpc_client(&cert, &server).await;
    let status = grpc
        .get_project_domain_attributes(ProjectDomainAttributesGetRequest {
            project: String::new(),
            domain: DOMAIN.into(),
            resource_type: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.shutdown().await;
}

#[tokio::test]
async fn test_plaintext_client_is_refused() {
    let cert = TestCertificate::localhost();
    let server = start_secure(&cert).await;

    let plain = reqwest::get(format!("http://{}/healthcheck", server.http)).await;
    assert!(plain.map(|r| !r.status().is_success()).unwrap_or(true));

    server.shutdown().await;
}
