//! Authentication enabled: the auth stage guards both transports.

use std::sync::Arc;
use std::time::Duration;

use flowgate_gateway::{AuthConfig, AuthHandle};
use flowgate_server::TokenAuthContext;
use flowgate_types::admin::{NamedEntityIdentifier, ResourceListRequest};
use serde_json::Value;
use tonic::metadata::MetadataValue;
use tonic::Code;

use super::support::{ephemeral_config, RecordingSink, TestServer, DOMAIN, PROJECT};

const SECRET: &[u8] = b"integration-secret";

fn auth_context(config: AuthConfig) -> Arc<TokenAuthContext> {
    Arc::new(TokenAuthContext::new(SECRET.to_vec(), config))
}

async fn start(auth_config: AuthConfig, sink: Option<Arc<RecordingSink>>) -> TestServer {
    let mut config = ephemeral_config();
    config.security.use_auth = true;
    config.auth = auth_config.clone();
    let auth: AuthHandle = auth_context(auth_config);
    TestServer::start_with(
        config,
        Some(auth),
        sink.map(|s| s as Arc<dyn flowgate_gateway::AuditSink>),
    )
    .await
}

fn token(subject: &str) -> String {
    auth_context(AuthConfig::default()).issue(subject, Duration::from_secs(300))
}

fn list_request() -> ResourceListRequest {
    ResourceListRequest {
        id: Some(NamedEntityIdentifier {
            project: PROJECT.into(),
            domain: DOMAIN.into(),
            name: String::new(),
        }),
        limit: 10,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_rest_requires_credentials() {
    let sink = Arc::new(RecordingSink::default());
    let server = start(AuthConfig::default(), Some(Arc::clone(&sink))).await;
    let client = reqwest::Client::new();
    let list_url = server.url(&format!("/api/v1/executions/{PROJECT}/{DOMAIN}"));

    let anonymous = client.get(&list_url).send().await.unwrap();
    assert_eq!(anonymous.status(), 401);
    let body: Value = anonymous.json().await.unwrap();
    assert_eq!(body["code"], Code::Unauthenticated as i32);
    assert!(sink.entries().is_empty());

    let with_header = client
        .get(&list_url)
        .bearer_auth(token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(with_header.status(), 200);

    let with_cookie = client
        .get(&list_url)
        .header("cookie", format!("flowgate_idt={}", token("bob")))
        .send()
        .await
        .unwrap();
    assert_eq!(with_cookie.status(), 200);

    let with_custom_header = client
        .get(&list_url)
        .header("flowgate-authorization", format!("Bearer {}", token("carol")))
        .send()
        .await
        .unwrap();
    assert_eq!(with_custom_header.status(), 200);

    let entries = sink.entries();
    let subjects: Vec<_> = entries.iter().filter_map(|e| e.subject.as_deref()).collect();
    assert_eq!(subjects, ["alice", "bob", "carol"]);
    assert!(entries.iter().all(|e| e.from_http && e.method == "ListExecutions"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_native_grpc_requires_credentials() {
    let sink = Arc::new(RecordingSink::default());
    let server = start(AuthConfig::default(), Some(Arc::clone(&sink))).await;
    let mut grpc = server.grpc_client().await;

    let status = grpc.list_executions(list_request()).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(
        server
            .metrics
            .request_count("ListExecutions", Code::Unauthenticated),
        1
    );

    let mut request = tonic::Request::new(list_request());
    let value: MetadataValue<_> = format!("Bearer {}", token("dave")).parse().unwrap();
    request.metadata_mut().insert("authorization", value);
    grpc.list_executions(request).await.unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].subject.as_deref(), Some("dave"));
    assert!(!entries[0].from_http);
    assert_eq!(entries[0].code, Code::Ok);

    server.shutdown().await;
}

#[tokio::test]
async fn test_http_exemption_does_not_open_grpc() {
    let server = start(
        AuthConfig {
            disable_for_http: true,
            ..AuthConfig::default()
        },
        None,
    )
    .await;

    let rest = reqwest::get(server.url(&format!("/api/v1/executions/{PROJECT}/{DOMAIN}")))
        .await
        .unwrap();
    assert_eq!(rest.status(), 200);

    let mut grpc = server.grpc_client().await;
    let status = grpc.list_executions(list_request()).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    // A caller cannot claim the HTTP exemption by setting the tag itself.
    let mut forged = tonic::Request::new(list_request());
    forged
        .metadata_mut()
        .insert("from_http", MetadataValue::from_static("true"));
    let status = grpc.list_executions(forged).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    server.shutdown().await;
}

#[tokio::test]
async fn test_browser_endpoints() {
    let server = start(
        AuthConfig {
            user_info_url: Some("https://idp.example/userinfo".into()),
            ..AuthConfig::default()
        },
        None,
    )
    .await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let login = client.get(server.url("/login")).send().await.unwrap();
    assert_eq!(login.status(), 302);

    let session = token("erin");
    let callback = client
        .get(server.url(&format!("/callback?token={session}")))
        .send()
        .await
        .unwrap();
    assert_eq!(callback.status(), 302);
    let cookie = callback.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("flowgate_idt="));

    let me: Value = client
        .get(server.url("/me"))
        .header("cookie", format!("flowgate_idt={session}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["subject"], "erin");

    let metadata: Value = client
        .get(server.url("/.well-known/oauth-authorization-server"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(metadata["issuer"].is_string());

    // Health stays open.
    let health = client.get(server.url("/healthcheck")).send().await.unwrap();
    assert_eq!(health.status(), 200);

    server.shutdown().await;
}
