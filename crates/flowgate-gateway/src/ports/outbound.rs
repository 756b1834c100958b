//! Outbound ports for the gateway.

use async_trait::async_trait;
use flowgate_types::admin;
use flowgate_types::AdminResult;

/// Execution lifecycle business layer.
///
/// The gateway only validates presence of required fields and maps errors;
/// every other decision belongs to the implementation.
#[async_trait]
pub trait ExecutionManager: Send + Sync + 'static {
    async fn create_execution(
        &self,
        request: admin::ExecutionCreateRequest,
    ) -> AdminResult<admin::ExecutionCreateResponse>;

    async fn relaunch_execution(
        &self,
        request: admin::ExecutionRelaunchRequest,
    ) -> AdminResult<admin::ExecutionCreateResponse>;

    async fn create_workflow_event(
        &self,
        request: admin::WorkflowExecutionEventRequest,
    ) -> AdminResult<admin::WorkflowExecutionEventResponse>;

    async fn get_execution(
        &self,
        request: admin::WorkflowExecutionGetRequest,
    ) -> AdminResult<admin::Execution>;

    async fn get_execution_data(
        &self,
        request: admin::WorkflowExecutionGetDataRequest,
    ) -> AdminResult<admin::WorkflowExecutionGetDataResponse>;

    async fn list_executions(
        &self,
        request: admin::ResourceListRequest,
    ) -> AdminResult<admin::ExecutionList>;

    async fn terminate_execution(
        &self,
        request: admin::ExecutionTerminateRequest,
    ) -> AdminResult<admin::ExecutionTerminateResponse>;
}
