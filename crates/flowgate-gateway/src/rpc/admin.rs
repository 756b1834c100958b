//! `AdminService` implementation.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::Router;
use flowgate_resources::ResourceManager;
use flowgate_types::admin::admin_service_server::{AdminService, AdminServiceServer};
use flowgate_types::admin::*;
use flowgate_types::{AdminError, ADMIN_SERVICE};
use tonic::{Code, Request, Status};
use tower::ServiceBuilder;
use tracing::instrument;

use crate::auth::Claims;
use crate::middleware::grpc::grpc_error_response;
use crate::middleware::InterceptorPipeline;
use crate::ports::outbound::ExecutionManager;

type RpcResult<T> = Result<tonic::Response<T>, Status>;

/// Admin RPC handler
#[derive(Clone)]
pub struct AdminRpc {
    executions: Arc<dyn ExecutionManager>,
    resources: ResourceManager,
}

impl AdminRpc {
    pub fn new(executions: Arc<dyn ExecutionManager>, resources: ResourceManager) -> Self {
        Self {
            executions,
            resources,
        }
    }

    /// Router serving `/flowgate.admin.v1.AdminService/*` through `pipeline`.
    /// Unknown services answer `UNIMPLEMENTED`.
    pub fn into_router(self, pipeline: &InterceptorPipeline) -> Router {
        let server = ServiceBuilder::new()
            .map_response(|response: http::Response<tonic::body::BoxBody>| {
                response.into_response()
            })
            .service(AdminServiceServer::new(self));

        Router::new()
            .route_service(&format!("/{}/*method", ADMIN_SERVICE), pipeline.layer(server))
            .fallback(unknown_service)
    }
}

async fn unknown_service(uri: http::Uri) -> Response {
    grpc_error_response(
        Code::Unimplemented,
        &format!("unknown service path {}", uri.path()),
    )
}

fn required<T>(field: Option<T>, name: &str) -> Result<T, Status> {
    field.ok_or_else(|| AdminError::missing(name).into())
}

fn reply<T>(result: Result<T, impl Into<AdminError>>) -> RpcResult<T> {
    result.map(tonic::Response::new).map_err(|e| {
        let err: AdminError = e.into();
        Status::from(err)
    })
}

#[tonic::async_trait]
impl AdminService for AdminRpc {
    #[instrument(skip_all)]
    async fn create_execution(
        &self,
        request: Request<ExecutionCreateRequest>,
    ) -> RpcResult<ExecutionCreateResponse> {
        let subject = request.extensions().get::<Claims>().map(|c| c.subject.clone());
        let mut request = request.into_inner();
        let spec = request.spec.get_or_insert_with(ExecutionSpec::default);
        if spec.principal.is_empty() {
            if let Some(subject) = subject {
                spec.principal = subject;
            }
        }
        if request.spec.as_ref().map_or(true, |s| s.launch_plan.is_none()) {
            return Err(AdminError::missing("spec.launch_plan").into());
        }
        reply(self.executions.create_execution(request).await)
    }

    #[instrument(skip_all)]
    async fn relaunch_execution(
        &self,
        request: Request<ExecutionRelaunchRequest>,
    ) -> RpcResult<ExecutionCreateResponse> {
        let request = request.into_inner();
        required(request.id.as_ref(), "id")?;
        reply(self.executions.relaunch_execution(request).await)
    }

    #[instrument(skip_all)]
    async fn create_workflow_event(
        &self,
        request: Request<WorkflowExecutionEventRequest>,
    ) -> RpcResult<WorkflowExecutionEventResponse> {
        let request = request.into_inner();
        let event = required(request.event.as_ref(), "event")?;
        required(event.execution_id.as_ref(), "event.execution_id")?;
        reply(self.executions.create_workflow_event(request).await)
    }

    #[instrument(skip_all)]
    async fn get_execution(
        &self,
        request: Request<WorkflowExecutionGetRequest>,
    ) -> RpcResult<Execution> {
        let request = request.into_inner();
        required(request.id.as_ref(), "id")?;
        reply(self.executions.get_execution(request).await)
    }

    #[instrument(skip_all)]
    async fn get_execution_data(
        &self,
        request: Request<WorkflowExecutionGetDataRequest>,
    ) -> RpcResult<WorkflowExecutionGetDataResponse> {
        let request = request.into_inner();
        required(request.id.as_ref(), "id")?;
        reply(self.executions.get_execution_data(request).await)
    }

    #[instrument(skip_all)]
    async fn list_executions(
        &self,
        request: Request<ResourceListRequest>,
    ) -> RpcResult<ExecutionList> {
        let request = request.into_inner();
        required(request.id.as_ref(), "id")?;
        reply(self.executions.list_executions(request).await)
    }

    #[instrument(skip_all)]
    async fn terminate_execution(
        &self,
        request: Request<ExecutionTerminateRequest>,
    ) -> RpcResult<ExecutionTerminateResponse> {
        let request = request.into_inner();
        required(request.id.as_ref(), "id")?;
        reply(self.executions.terminate_execution(request).await)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Matchable attributes
    // ═══════════════════════════════════════════════════════════════════════

    #[instrument(skip_all)]
    async fn update_project_domain_attributes(
        &self,
        request: Request<ProjectDomainAttributesUpdateRequest>,
    ) -> RpcResult<ProjectDomainAttributesUpdateResponse> {
        reply(
            self.resources
                .update_project_domain_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn get_project_domain_attributes(
        &self,
        request: Request<ProjectDomainAttributesGetRequest>,
    ) -> RpcResult<ProjectDomainAttributesGetResponse> {
        reply(
            self.resources
                .get_project_domain_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn delete_project_domain_attributes(
        &self,
        request: Request<ProjectDomainAttributesDeleteRequest>,
    ) -> RpcResult<ProjectDomainAttributesDeleteResponse> {
        reply(
            self.resources
                .delete_project_domain_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn update_workflow_attributes(
        &self,
        request: Request<WorkflowAttributesUpdateRequest>,
    ) -> RpcResult<WorkflowAttributesUpdateResponse> {
        reply(
            self.resources
                .update_workflow_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn get_workflow_attributes(
        &self,
        request: Request<WorkflowAttributesGetRequest>,
    ) -> RpcResult<WorkflowAttributesGetResponse> {
        reply(
            self.resources
                .get_workflow_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn delete_workflow_attributes(
        &self,
        request: Request<WorkflowAttributesDeleteRequest>,
    ) -> RpcResult<WorkflowAttributesDeleteResponse> {
        reply(
            self.resources
                .delete_workflow_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn update_launch_plan_attributes(
        &self,
        request: Request<LaunchPlanAttributesUpdateRequest>,
    ) -> RpcResult<LaunchPlanAttributesUpdateResponse> {
        reply(
            self.resources
                .update_launch_plan_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn get_launch_plan_attributes(
        &self,
        request: Request<LaunchPlanAttributesGetRequest>,
    ) -> RpcResult<LaunchPlanAttributesGetResponse> {
        reply(
            self.resources
                .get_launch_plan_attributes(request.into_inner())
                .await,
        )
    }

    #[instrument(skip_all)]
    async fn delete_launch_plan_attributes(
        &self,
        request: Request<LaunchPlanAttributesDeleteRequest>,
    ) -> RpcResult<LaunchPlanAttributesDeleteResponse> {
        reply(
            self.resources
                .delete_launch_plan_attributes(request.into_inner())
                .await,
        )
    }
}
