//! Resource identities and the store key derived from them.

use std::fmt;

use flowgate_types::admin::MatchableResource;
use serde::{Deserialize, Serialize};

use super::errors::ResourceError;

/// Kind of override stored under an identity. Selects the payload schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    TaskResource,
    ClusterResource,
    ExecutionQueue,
    ExecutionClusterLabel,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::TaskResource,
        ResourceType::ClusterResource,
        ResourceType::ExecutionQueue,
        ResourceType::ExecutionClusterLabel,
    ];

    /// Stable name written into the store key.
    pub fn as_str(&self) -> &'static str {
        self.to_proto().as_str_name()
    }

    pub fn to_proto(self) -> MatchableResource {
        match self {
            Self::TaskResource => MatchableResource::TaskResource,
            Self::ClusterResource => MatchableResource::ClusterResource,
            Self::ExecutionQueue => MatchableResource::ExecutionQueue,
            Self::ExecutionClusterLabel => MatchableResource::ExecutionClusterLabel,
        }
    }

    /// Parse the `resource_type` field of a wire request.
    pub fn from_proto(value: i32) -> Result<Self, ResourceError> {
        match MatchableResource::try_from(value) {
            Ok(MatchableResource::TaskResource) => Ok(Self::TaskResource),
            Ok(MatchableResource::ClusterResource) => Ok(Self::ClusterResource),
            Ok(MatchableResource::ExecutionQueue) => Ok(Self::ExecutionQueue),
            Ok(MatchableResource::ExecutionClusterLabel) => Ok(Self::ExecutionClusterLabel),
            Err(_) => Err(ResourceError::InvalidArgument(format!(
                "unknown resource_type {}",
                value
            ))),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rt| rt.as_str() == name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity addressing one override record.
///
/// `project` and `domain` are always present. `workflow` and `launch_plan`
/// refine the scope; a launch-plan identity without a workflow is valid and
/// distinct from every other key. Equality is exact over all five fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    project: String,
    domain: String,
    workflow: Option<String>,
    launch_plan: Option<String>,
    resource_type: ResourceType,
}

impl ResourceIdentity {
    /// Build an identity from raw request fields. Empty optional fields are
    /// treated as absent.
    pub fn new(
        project: impl Into<String>,
        domain: impl Into<String>,
        workflow: impl Into<String>,
        launch_plan: impl Into<String>,
        resource_type: ResourceType,
    ) -> Result<Self, ResourceError> {
        let project = project.into();
        let domain = domain.into();
        if project.is_empty() {
            return Err(ResourceError::InvalidArgument("project is required".into()));
        }
        if domain.is_empty() {
            return Err(ResourceError::InvalidArgument("domain is required".into()));
        }
        Ok(Self {
            project,
            domain,
            workflow: non_empty(workflow.into()),
            launch_plan: non_empty(launch_plan.into()),
            resource_type,
        })
    }

    pub fn project_domain(
        project: impl Into<String>,
        domain: impl Into<String>,
        resource_type: ResourceType,
    ) -> Result<Self, ResourceError> {
        Self::new(project, domain, "", "", resource_type)
    }

    /// Workflow-level identity. An empty workflow is rejected rather than
    /// silently widened to project/domain scope.
    pub fn workflow(
        project: impl Into<String>,
        domain: impl Into<String>,
        workflow: impl Into<String>,
        resource_type: ResourceType,
    ) -> Result<Self, ResourceError> {
        let workflow = workflow.into();
        if workflow.is_empty() {
            return Err(ResourceError::InvalidArgument("workflow is required".into()));
        }
        Self::new(project, domain, workflow, "", resource_type)
    }

    /// Launch-plan identity. The workflow slot may be empty.
    pub fn launch_plan(
        project: impl Into<String>,
        domain: impl Into<String>,
        workflow: impl Into<String>,
        launch_plan: impl Into<String>,
        resource_type: ResourceType,
    ) -> Result<Self, ResourceError> {
        let launch_plan = launch_plan.into();
        if launch_plan.is_empty() {
            return Err(ResourceError::InvalidArgument(
                "launch_plan is required".into(),
            ));
        }
        Self::new(project, domain, workflow, launch_plan, resource_type)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn workflow_name(&self) -> Option<&str> {
        self.workflow.as_deref()
    }

    pub fn launch_plan_name(&self) -> Option<&str> {
        self.launch_plan.as_deref()
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Store key for this identity. Absent slots become empty strings, which
    /// keeps every position and so never merges two identities.
    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            project: self.project.clone(),
            domain: self.domain.clone(),
            workflow: self.workflow.clone().unwrap_or_default(),
            launch_plan: self.launch_plan.clone().unwrap_or_default(),
            resource_type: self.resource_type.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.domain)?;
        match (&self.workflow, &self.launch_plan) {
            (Some(w), Some(lp)) => write!(f, "/{}/{}", w, lp)?,
            (Some(w), None) => write!(f, "/{}", w)?,
            (None, Some(lp)) => write!(f, "/-/{}", lp)?,
            (None, None) => {}
        }
        write!(f, " ({})", self.resource_type)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Five-position key as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub project: String,
    pub domain: String,
    pub workflow: String,
    pub launch_plan: String,
    pub resource_type: String,
}

impl ResourceKey {
    /// Recover the identity this key was built from.
    pub fn identity(&self) -> Option<ResourceIdentity> {
        let resource_type = ResourceType::from_name(&self.resource_type)?;
        ResourceIdentity::new(
            self.project.clone(),
            self.domain.clone(),
            self.workflow.clone(),
            self.launch_plan.clone(),
            resource_type,
        )
        .ok()
    }

    fn fields(&self) -> [&str; 5] {
        [
            &self.project,
            &self.domain,
            &self.workflow,
            &self.launch_plan,
            &self.resource_type,
        ]
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join("|"))
    }
}

/// A stored override: the key plus the encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub key: ResourceKey,
    pub payload: Vec<u8>,
}
