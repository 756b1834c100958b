//! Route table of the transcoder.

use std::future::Future;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use bytes::Bytes;
use flowgate_types::admin::admin_service_client::AdminServiceClient;
use flowgate_types::admin::*;
use prost::Message;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tonic::transport::Channel;
use tonic::Status;

use super::codec::Codec;
use super::error::RestError;
use super::TranscodingGateway;

type RestResult = Result<Response, RestError>;

pub(super) fn router(gateway: TranscodingGateway) -> Router {
    Router::new()
        .route("/api/v1/executions", post(create_execution))
        .route("/api/v1/executions/relaunch", post(relaunch_execution))
        .route("/api/v1/executions/:project/:domain", get(list_executions))
        .route(
            "/api/v1/executions/:project/:domain/:name",
            get(get_execution).delete(terminate_execution),
        )
        .route(
            "/api/v1/data/executions/:project/:domain/:name",
            get(get_execution_data),
        )
        .route("/api/v1/events/workflows", post(create_workflow_event))
        .route(
            "/api/v1/project_domain_attributes/:project/:domain",
            put(update_project_domain_attributes)
                .get(get_project_domain_attributes)
                .delete(delete_project_domain_attributes),
        )
        .route(
            "/api/v1/workflow_attributes/:project/:domain/:workflow",
            put(update_workflow_attributes)
                .get(get_workflow_attributes)
                .delete(delete_workflow_attributes),
        )
        .route(
            "/api/v1/launch_plan_attributes/:project/:domain/:workflow/:launch_plan",
            put(update_launch_plan_attributes)
                .get(get_launch_plan_attributes)
                .delete(delete_launch_plan_attributes),
        )
        .fallback(no_route)
        .with_state(gateway)
}

async fn no_route(uri: Uri) -> RestError {
    RestError(Status::not_found(format!("no route for {}", uri.path())))
}

/// Run one unary call and encode the reply for the caller.
async fn unary<T, R, F, Fut>(
    gateway: &TranscodingGateway,
    headers: &HeaderMap,
    message: T,
    call: F,
) -> RestResult
where
    R: Message + Serialize,
    F: FnOnce(AdminServiceClient<Channel>, tonic::Request<T>) -> Fut,
    Fut: Future<Output = Result<tonic::Response<R>, Status>>,
{
    let codec = Codec::for_response(headers);
    let response = call(gateway.client(), gateway.outbound(headers, message)).await?;
    Ok(codec.encode(response.get_ref()))
}

/// Query-string extractor whose failures use the transcoder error body.
pub(super) struct RestQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for RestQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AttributeQuery {
    resource_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ListQuery {
    limit: Option<u32>,
    token: Option<String>,
    filters: Option<String>,
    #[serde(rename = "sort_by.key")]
    sort_key: Option<String>,
    #[serde(rename = "sort_by.direction")]
    sort_direction: Option<String>,
}

/// Accepts the enum name (`EXECUTION_QUEUE`) or its number. Absent means the
/// zero value, `TASK_RESOURCE`.
fn parse_resource_type(raw: Option<&str>) -> Result<i32, RestError> {
    let Some(raw) = raw else {
        return Ok(MatchableResource::TaskResource as i32);
    };
    let parsed = match raw.parse::<i32>() {
        Ok(n) => MatchableResource::try_from(n).ok(),
        Err(_) => MatchableResource::from_str_name(raw),
    };
    parsed
        .map(|r| r as i32)
        .ok_or_else(|| RestError::invalid_argument(format!("unknown resource_type {raw:?}")))
}

fn parse_direction(raw: &str) -> Result<i32, RestError> {
    let parsed = match raw.parse::<i32>() {
        Ok(n) => sort::Direction::try_from(n).ok(),
        Err(_) => sort::Direction::from_str_name(raw),
    };
    parsed
        .map(|d| d as i32)
        .ok_or_else(|| RestError::invalid_argument(format!("unknown sort direction {raw:?}")))
}

fn list_request(
    project: String,
    domain: String,
    query: ListQuery,
) -> Result<ResourceListRequest, RestError> {
    let sort_by = match (query.sort_key, query.sort_direction) {
        (None, None) => None,
        (key, direction) => Some(Sort {
            key: key.unwrap_or_default(),
            direction: direction
                .as_deref()
                .map(parse_direction)
                .transpose()?
                .unwrap_or_default(),
        }),
    };
    Ok(ResourceListRequest {
        id: Some(NamedEntityIdentifier {
            project,
            domain,
            name: String::new(),
        }),
        limit: query.limit.unwrap_or_default(),
        token: query.token.unwrap_or_default(),
        filters: query.filters.unwrap_or_default(),
        sort_by,
    })
}

fn execution_id(
    project: String,
    domain: String,
    name: String,
) -> Option<WorkflowExecutionIdentifier> {
    Some(WorkflowExecutionIdentifier {
        project,
        domain,
        name,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Executions
// ═══════════════════════════════════════════════════════════════════════════

async fn create_execution(
    State(gateway): State<TranscodingGateway>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let request: ExecutionCreateRequest = Codec::for_request(&headers).decode(&body)?;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.create_execution(request).await
    })
    .await
}

async fn relaunch_execution(
    State(gateway): State<TranscodingGateway>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let request: ExecutionRelaunchRequest = Codec::for_request(&headers).decode(&body)?;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.relaunch_execution(request).await
    })
    .await
}

async fn create_workflow_event(
    State(gateway): State<TranscodingGateway>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let request: WorkflowExecutionEventRequest = Codec::for_request(&headers).decode(&body)?;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.create_workflow_event(request).await
    })
    .await
}

async fn get_execution(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, name)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> RestResult {
    let request = WorkflowExecutionGetRequest {
        id: execution_id(project, domain, name),
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.get_execution(request).await
    })
    .await
}

async fn get_execution_data(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, name)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> RestResult {
    let request = WorkflowExecutionGetDataRequest {
        id: execution_id(project, domain, name),
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.get_execution_data(request).await
    })
    .await
}

async fn list_executions(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain)): Path<(String, String)>,
    RestQuery(query): RestQuery<ListQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = list_request(project, domain, query)?;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.list_executions(request).await
    })
    .await
}

async fn terminate_execution(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, name)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let mut request: ExecutionTerminateRequest = Codec::for_request(&headers).decode(&body)?;
    request.id = execution_id(project, domain, name);
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.terminate_execution(request).await
    })
    .await
}

// ═══════════════════════════════════════════════════════════════════════════
// Project / domain attributes
// ═══════════════════════════════════════════════════════════════════════════

async fn update_project_domain_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let mut request: ProjectDomainAttributesUpdateRequest =
        Codec::for_request(&headers).decode(&body)?;
    let attributes = request.attributes.get_or_insert_with(Default::default);
    attributes.project = project;
    attributes.domain = domain;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.update_project_domain_attributes(request).await
    })
    .await
}

async fn get_project_domain_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain)): Path<(String, String)>,
    RestQuery(query): RestQuery<AttributeQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = ProjectDomainAttributesGetRequest {
        project,
        domain,
        resource_type: parse_resource_type(query.resource_type.as_deref())?,
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.get_project_domain_attributes(request).await
    })
    .await
}

async fn delete_project_domain_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain)): Path<(String, String)>,
    RestQuery(query): RestQuery<AttributeQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = ProjectDomainAttributesDeleteRequest {
        project,
        domain,
        resource_type: parse_resource_type(query.resource_type.as_deref())?,
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.delete_project_domain_attributes(request).await
    })
    .await
}

// ═══════════════════════════════════════════════════════════════════════════
// Workflow attributes
// ═══════════════════════════════════════════════════════════════════════════

async fn update_workflow_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, workflow)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let mut request: WorkflowAttributesUpdateRequest = Codec::for_request(&headers).decode(&body)?;
    let attributes = request.attributes.get_or_insert_with(Default::default);
    attributes.project = project;
    attributes.domain = domain;
    attributes.workflow = workflow;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.update_workflow_attributes(request).await
    })
    .await
}

async fn get_workflow_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, workflow)): Path<(String, String, String)>,
    RestQuery(query): RestQuery<AttributeQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = WorkflowAttributesGetRequest {
        project,
        domain,
        workflow,
        resource_type: parse_resource_type(query.resource_type.as_deref())?,
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.get_workflow_attributes(request).await
    })
    .await
}

async fn delete_workflow_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, workflow)): Path<(String, String, String)>,
    RestQuery(query): RestQuery<AttributeQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = WorkflowAttributesDeleteRequest {
        project,
        domain,
        workflow,
        resource_type: parse_resource_type(query.resource_type.as_deref())?,
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.delete_workflow_attributes(request).await
    })
    .await
}

// ═══════════════════════════════════════════════════════════════════════════
// Launch plan attributes
// ═══════════════════════════════════════════════════════════════════════════

async fn update_launch_plan_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, workflow, launch_plan)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult {
    let mut request: LaunchPlanAttributesUpdateRequest =
        Codec::for_request(&headers).decode(&body)?;
    let attributes = request.attributes.get_or_insert_with(Default::default);
    attributes.project = project;
    attributes.domain = domain;
    attributes.workflow = workflow;
    attributes.launch_plan = launch_plan;
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.update_launch_plan_attributes(request).await
    })
    .await
}

async fn get_launch_plan_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, workflow, launch_plan)): Path<(String, String, String, String)>,
    RestQuery(query): RestQuery<AttributeQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = LaunchPlanAttributesGetRequest {
        project,
        domain,
        workflow,
        launch_plan,
        resource_type: parse_resource_type(query.resource_type.as_deref())?,
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.get_launch_plan_attributes(request).await
    })
    .await
}

async fn delete_launch_plan_attributes(
    State(gateway): State<TranscodingGateway>,
    Path((project, domain, workflow, launch_plan)): Path<(String, String, String, String)>,
    RestQuery(query): RestQuery<AttributeQuery>,
    headers: HeaderMap,
) -> RestResult {
    let request = LaunchPlanAttributesDeleteRequest {
        project,
        domain,
        workflow,
        launch_plan,
        resource_type: parse_resource_type(query.resource_type.as_deref())?,
    };
    unary(&gateway, &headers, request, |mut client, request| async move {
        client.delete_launch_plan_attributes(request).await
    })
    .await
}
