//! In-memory execution registry.
//!
//! Keeps executions in process memory, keyed by project/domain/name. It
//! tracks phases from workflow events and supports offset-token pagination.
//! Nothing is scheduled.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use flowgate_gateway::ExecutionManager;
use flowgate_types::admin::{
    sort, Execution, ExecutionClosure, ExecutionCreateRequest, ExecutionCreateResponse,
    ExecutionList, ExecutionRelaunchRequest, ExecutionSpec, ExecutionTerminateRequest,
    ExecutionTerminateResponse, ResourceListRequest, WorkflowExecutionEventRequest,
    WorkflowExecutionEventResponse, WorkflowExecutionGetDataRequest,
    WorkflowExecutionGetDataResponse, WorkflowExecutionGetRequest, WorkflowExecutionIdentifier,
    WorkflowExecutionPhase,
};
use flowgate_types::{AdminError, AdminResult};
use parking_lot::RwLock;
use tracing::{debug, info};

const DEFAULT_PAGE_SIZE: usize = 100;
const GENERATED_NAME_LEN: usize = 20;

type ExecutionKey = (String, String, String);

#[derive(Default)]
pub struct InMemoryExecutionRegistry {
    executions: RwLock<BTreeMap<ExecutionKey, Execution>>,
}

impl InMemoryExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.executions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.read().is_empty()
    }

    fn insert(
        &self,
        project: String,
        domain: String,
        name: String,
        spec: ExecutionSpec,
    ) -> AdminResult<WorkflowExecutionIdentifier> {
        let name = if name.is_empty() { generate_name() } else { name };
        let id = WorkflowExecutionIdentifier {
            project,
            domain,
            name,
        };
        let now = Utc::now().timestamp_millis();

        let mut executions = self.executions.write();
        let key = key_of(&id);
        if executions.contains_key(&key) {
            return Err(AdminError::AlreadyExists(format!(
                "execution {}/{}/{} already exists",
                id.project, id.domain, id.name
            )));
        }

        executions.insert(
            key,
            Execution {
                id: Some(id.clone()),
                spec: Some(spec),
                closure: Some(ExecutionClosure {
                    phase: WorkflowExecutionPhase::Queued as i32,
                    created_at_ms: now,
                    updated_at_ms: now,
                    ..Default::default()
                }),
            },
        );

        info!(project = %id.project, domain = %id.domain, name = %id.name, "execution created");
        Ok(id)
    }

    fn with_execution<T>(
        &self,
        id: Option<&WorkflowExecutionIdentifier>,
        f: impl FnOnce(&mut Execution) -> AdminResult<T>,
    ) -> AdminResult<T> {
        let id = required_id(id)?;
        let mut executions = self.executions.write();
        let execution = executions
            .get_mut(&key_of(id))
            .ok_or_else(|| not_found(id))?;
        f(execution)
    }
}

#[async_trait]
impl ExecutionManager for InMemoryExecutionRegistry {
    async fn create_execution(
        &self,
        request: ExecutionCreateRequest,
    ) -> AdminResult<ExecutionCreateResponse> {
        require_scope(&request.project, &request.domain)?;
        let spec = request
            .spec
            .ok_or_else(|| AdminError::InvalidArgument("missing spec".into()))?;

        let id = self.insert(request.project, request.domain, request.name, spec)?;
        Ok(ExecutionCreateResponse { id: Some(id) })
    }

    async fn relaunch_execution(
        &self,
        request: ExecutionRelaunchRequest,
    ) -> AdminResult<ExecutionCreateResponse> {
        let original = required_id(request.id.as_ref())?;
        let spec = {
            let executions = self.executions.read();
            executions
                .get(&key_of(original))
                .ok_or_else(|| not_found(original))?
                .spec
                .clone()
                .unwrap_or_default()
        };

        let id = self.insert(
            original.project.clone(),
            original.domain.clone(),
            request.name,
            spec,
        )?;
        Ok(ExecutionCreateResponse { id: Some(id) })
    }

    async fn create_workflow_event(
        &self,
        request: WorkflowExecutionEventRequest,
    ) -> AdminResult<WorkflowExecutionEventResponse> {
        let event = request
            .event
            .ok_or_else(|| AdminError::InvalidArgument("missing event".into()))?;

        self.with_execution(event.execution_id.as_ref(), |execution| {
            let closure = execution.closure.get_or_insert_with(Default::default);
            if is_terminal(closure.phase()) {
                return Err(AdminError::InvalidArgument(format!(
                    "execution is already {}",
                    closure.phase().as_str_name()
                )));
            }

            closure.phase = event.phase;
            closure.updated_at_ms = if event.occurred_at_ms > 0 {
                event.occurred_at_ms
            } else {
                Utc::now().timestamp_millis()
            };
            if !event.output_uri.is_empty() {
                closure.output_uri = event.output_uri.clone();
            }
            if !event.error_message.is_empty() {
                closure.error_message = event.error_message.clone();
            }

            debug!(
                request_id = %request.request_id,
                producer = %event.producer_id,
                phase = closure.phase().as_str_name(),
                "workflow event applied"
            );
            Ok(WorkflowExecutionEventResponse {})
        })
    }

    async fn get_execution(&self, request: WorkflowExecutionGetRequest) -> AdminResult<Execution> {
        self.with_execution(request.id.as_ref(), |execution| Ok(execution.clone()))
    }

    async fn get_execution_data(
        &self,
        request: WorkflowExecutionGetDataRequest,
    ) -> AdminResult<WorkflowExecutionGetDataResponse> {
        self.with_execution(request.id.as_ref(), |execution| {
            Ok(WorkflowExecutionGetDataResponse {
                inputs: execution
                    .spec
                    .as_ref()
                    .map(|spec| spec.inputs.clone())
                    .unwrap_or_default(),
                output_uri: execution
                    .closure
                    .as_ref()
                    .map(|closure| closure.output_uri.clone())
                    .unwrap_or_default(),
            })
        })
    }

    async fn list_executions(&self, request: ResourceListRequest) -> AdminResult<ExecutionList> {
        let scope = request
            .id
            .as_ref()
            .ok_or_else(|| AdminError::InvalidArgument("missing id".into()))?;
        require_scope(&scope.project, &scope.domain)?;

        let phase_filter = parse_filters(&request.filters)?;
        let offset = parse_token(&request.token)?;
        let limit = match request.limit {
            0 => DEFAULT_PAGE_SIZE,
            n => n as usize,
        };

        let mut matching: Vec<Execution> = self
            .executions
            .read()
            .values()
            .filter(|e| {
                e.id.as_ref()
                    .map_or(false, |id| id.project == scope.project && id.domain == scope.domain)
            })
            .filter(|e| phase_filter.map_or(true, |phase| closure_phase(e) == phase))
            .cloned()
            .collect();

        sort_executions(&mut matching, request.sort_by.as_ref());

        let total = matching.len();
        let executions: Vec<Execution> = matching.into_iter().skip(offset).take(limit).collect();
        let next = offset + executions.len();
        let token = if next < total { next.to_string() } else { String::new() };

        Ok(ExecutionList { executions, token })
    }

    async fn terminate_execution(
        &self,
        request: ExecutionTerminateRequest,
    ) -> AdminResult<ExecutionTerminateResponse> {
        self.with_execution(request.id.as_ref(), |execution| {
            let closure = execution.closure.get_or_insert_with(Default::default);
            if is_terminal(closure.phase()) {
                return Err(AdminError::InvalidArgument(format!(
                    "execution is already {}",
                    closure.phase().as_str_name()
                )));
            }
            closure.phase = WorkflowExecutionPhase::Aborted as i32;
            closure.abort_cause = request.cause.clone();
            closure.updated_at_ms = Utc::now().timestamp_millis();
            Ok(ExecutionTerminateResponse {})
        })
    }
}

fn key_of(id: &WorkflowExecutionIdentifier) -> ExecutionKey {
    (id.project.clone(), id.domain.clone(), id.name.clone())
}

fn required_id(id: Option<&WorkflowExecutionIdentifier>) -> AdminResult<&WorkflowExecutionIdentifier> {
    let id = id.ok_or_else(|| AdminError::InvalidArgument("missing id".into()))?;
    require_scope(&id.project, &id.domain)?;
    if id.name.is_empty() {
        return Err(AdminError::InvalidArgument("missing name".into()));
    }
    Ok(id)
}

fn require_scope(project: &str, domain: &str) -> AdminResult<()> {
    if project.is_empty() {
        return Err(AdminError::InvalidArgument("missing project".into()));
    }
    if domain.is_empty() {
        return Err(AdminError::InvalidArgument("missing domain".into()));
    }
    Ok(())
}

fn not_found(id: &WorkflowExecutionIdentifier) -> AdminError {
    AdminError::NotFound(format!(
        "execution {}/{}/{} not found",
        id.project, id.domain, id.name
    ))
}

fn generate_name() -> String {
    // Must start with a letter to be a valid resource name.
    let mut name = String::with_capacity(GENERATED_NAME_LEN);
    name.push('f');
    name.extend(
        uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(GENERATED_NAME_LEN - 1),
    );
    name
}

fn is_terminal(phase: WorkflowExecutionPhase) -> bool {
    matches!(
        phase,
        WorkflowExecutionPhase::Succeeded
            | WorkflowExecutionPhase::Failed
            | WorkflowExecutionPhase::Aborted
            | WorkflowExecutionPhase::TimedOut
    )
}

fn closure_phase(execution: &Execution) -> WorkflowExecutionPhase {
    execution
        .closure
        .as_ref()
        .map(|c| c.phase())
        .unwrap_or(WorkflowExecutionPhase::Undefined)
}

/// Supports `eq(phase,<PHASE>)`; an empty string means no filter.
fn parse_filters(filters: &str) -> AdminResult<Option<WorkflowExecutionPhase>> {
    let filters = filters.trim();
    if filters.is_empty() {
        return Ok(None);
    }
    let unsupported = || AdminError::InvalidArgument(format!("unsupported filter {filters:?}"));

    let inner = filters
        .strip_prefix("eq(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(unsupported)?;
    let (field, value) = inner.split_once(',').ok_or_else(unsupported)?;
    if field.trim() != "phase" {
        return Err(unsupported());
    }
    WorkflowExecutionPhase::from_str_name(&value.trim().to_ascii_uppercase())
        .map(Some)
        .ok_or_else(unsupported)
}

fn parse_token(token: &str) -> AdminResult<usize> {
    if token.is_empty() {
        return Ok(0);
    }
    token
        .parse()
        .map_err(|_| AdminError::InvalidArgument(format!("invalid pagination token {token:?}")))
}

fn sort_executions(executions: &mut [Execution], sort_by: Option<&flowgate_types::admin::Sort>) {
    let created = |e: &Execution| e.closure.as_ref().map_or(0, |c| c.created_at_ms);
    let name = |e: &Execution| e.id.as_ref().map(|id| id.name.clone()).unwrap_or_default();

    let (key, direction) = match sort_by {
        Some(sort) => (sort.key.as_str(), sort.direction()),
        None => ("created_at", sort::Direction::Descending),
    };

    match key {
        "name" => executions.sort_by_key(|e| name(e)),
        _ => executions.sort_by_key(|e| (created(e), name(e))),
    }
    if direction == sort::Direction::Descending {
        executions.reverse();
    }
}
