//! # Resource Manager
//!
//! Application service over the attribute store.
//!
//! The core contract is `upsert` / `get` / `delete` keyed by
//! [`ResourceIdentity`]. The request-shaped wrappers below mirror the admin
//! RPC surface one-to-one so transport handlers stay thin: they validate
//! presence, build the identity for their granularity, and delegate.

use std::sync::Arc;

use flowgate_types::admin;
use tracing::debug;

use crate::adapters::storage::InMemoryAttributeStore;
use crate::domain::attributes::MatchingAttributes;
use crate::domain::errors::{ResourceError, StoreError};
use crate::domain::identity::{ResourceIdentity, ResourceRecord, ResourceType};
use crate::ports::outbound::AttributeStore;

/// Lookup of a single override at any granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub project: String,
    pub domain: String,
    pub workflow: String,
    pub launch_plan: String,
    pub resource_type: ResourceType,
}

/// Flattened view of a stored override.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub project: String,
    pub domain: String,
    pub workflow: String,
    pub launch_plan: String,
    pub resource_type: ResourceType,
    pub attributes: MatchingAttributes,
}

/// Resolves and persists matchable attributes.
#[derive(Clone)]
pub struct ResourceManager {
    store: Arc<dyn AttributeStore>,
}

impl ResourceManager {
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self { store }
    }

    /// Manager over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryAttributeStore::new()))
    }

    /// Serialize and write the override, replacing any previous record.
    pub async fn upsert(
        &self,
        identity: &ResourceIdentity,
        attributes: &MatchingAttributes,
    ) -> Result<(), ResourceError> {
        if attributes.resource_type() != identity.resource_type() {
            return Err(ResourceError::InvalidArgument(format!(
                "attributes of type {} cannot be stored under {}",
                attributes.resource_type(),
                identity
            )));
        }

        self.store
            .put(ResourceRecord {
                key: identity.key(),
                payload: attributes.encode(),
            })
            .await?;

        debug!(identity = %identity, "upserted resource attributes");
        Ok(())
    }

    /// Exact-match fetch. Never consults a coarser granularity.
    pub async fn get(&self, identity: &ResourceIdentity) -> Result<MatchingAttributes, ResourceError> {
        let key = identity.key();
        let payload = self.store.get(&key).await.map_err(|e| match e {
            StoreError::NotFound(_) => {
                ResourceError::NotFound(identity.to_string())
            }
            other => other.into(),
        })?;

        MatchingAttributes::decode(identity.resource_type(), &payload).map_err(|e| {
            ResourceError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
    }

    pub async fn delete(&self, identity: &ResourceIdentity) -> Result<(), ResourceError> {
        self.store.delete(&identity.key()).await.map_err(|e| match e {
            StoreError::NotFound(_) => {
                ResourceError::NotFound(identity.to_string())
            }
            other => other.into(),
        })?;

        debug!(identity = %identity, "deleted resource attributes");
        Ok(())
    }

    pub async fn get_resource(&self, request: ResourceRequest) -> Result<Resource, ResourceError> {
        let identity = ResourceIdentity::new(
            request.project,
            request.domain,
            request.workflow,
            request.launch_plan,
            request.resource_type,
        )?;
        let attributes = self.get(&identity).await?;

        Ok(Resource {
            project: identity.project().to_string(),
            domain: identity.domain().to_string(),
            workflow: identity.workflow_name().unwrap_or_default().to_string(),
            launch_plan: identity.launch_plan_name().unwrap_or_default().to_string(),
            resource_type: identity.resource_type(),
            attributes,
        })
    }

    // -------------------------------------------------------------------------
    // Project / domain
    // -------------------------------------------------------------------------

    pub async fn update_project_domain_attributes(
        &self,
        request: admin::ProjectDomainAttributesUpdateRequest,
    ) -> Result<admin::ProjectDomainAttributesUpdateResponse, ResourceError> {
        let attrs = request.attributes.ok_or_else(|| missing("attributes"))?;
        let matching = matching_attributes(attrs.matching_attributes)?;
        let identity =
            ResourceIdentity::project_domain(attrs.project, attrs.domain, matching.resource_type())?;

        self.upsert(&identity, &matching).await?;
        Ok(admin::ProjectDomainAttributesUpdateResponse {})
    }

    pub async fn get_project_domain_attributes(
        &self,
        request: admin::ProjectDomainAttributesGetRequest,
    ) -> Result<admin::ProjectDomainAttributesGetResponse, ResourceError> {
        let identity = ResourceIdentity::project_domain(
            request.project,
            request.domain,
            ResourceType::from_proto(request.resource_type)?,
        )?;
        let matching = self.get(&identity).await?;

        Ok(admin::ProjectDomainAttributesGetResponse {
            attributes: Some(admin::ProjectDomainAttributes {
                project: identity.project().to_string(),
                domain: identity.domain().to_string(),
                matching_attributes: Some(matching.into()),
            }),
        })
    }

    pub async fn delete_project_domain_attributes(
        &self,
        request: admin::ProjectDomainAttributesDeleteRequest,
    ) -> Result<admin::ProjectDomainAttributesDeleteResponse, ResourceError> {
        let identity = ResourceIdentity::project_domain(
            request.project,
            request.domain,
            ResourceType::from_proto(request.resource_type)?,
        )?;
        self.delete(&identity).await?;
        Ok(admin::ProjectDomainAttributesDeleteResponse {})
    }

    // -------------------------------------------------------------------------
    // Workflow
    // -------------------------------------------------------------------------

    pub async fn update_workflow_attributes(
        &self,
        request: admin::WorkflowAttributesUpdateRequest,
    ) -> Result<admin::WorkflowAttributesUpdateResponse, ResourceError> {
        let attrs = request.attributes.ok_or_else(|| missing("attributes"))?;
        let matching = matching_attributes(attrs.matching_attributes)?;
        let identity = ResourceIdentity::workflow(
            attrs.project,
            attrs.domain,
            attrs.workflow,
            matching.resource_type(),
        )?;

        self.upsert(&identity, &matching).await?;
        Ok(admin::WorkflowAttributesUpdateResponse {})
    }

    pub async fn get_workflow_attributes(
        &self,
        request: admin::WorkflowAttributesGetRequest,
    ) -> Result<admin::WorkflowAttributesGetResponse, ResourceError> {
        let identity = ResourceIdentity::workflow(
            request.project,
            request.domain,
            request.workflow,
            ResourceType::from_proto(request.resource_type)?,
        )?;
        let matching = self.get(&identity).await?;

        Ok(admin::WorkflowAttributesGetResponse {
            attributes: Some(admin::WorkflowAttributes {
                project: identity.project().to_string(),
                domain: identity.domain().to_string(),
                workflow: identity.workflow_name().unwrap_or_default().to_string(),
                matching_attributes: Some(matching.into()),
            }),
        })
    }

    pub async fn delete_workflow_attributes(
        &self,
        request: admin::WorkflowAttributesDeleteRequest,
    ) -> Result<admin::WorkflowAttributesDeleteResponse, ResourceError> {
        let identity = ResourceIdentity::workflow(
            request.project,
            request.domain,
            request.workflow,
            ResourceType::from_proto(request.resource_type)?,
        )?;
        self.delete(&identity).await?;
        Ok(admin::WorkflowAttributesDeleteResponse {})
    }

    // -------------------------------------------------------------------------
    // Launch plan
    // -------------------------------------------------------------------------

    pub async fn update_launch_plan_attributes(
        &self,
        request: admin::LaunchPlanAttributesUpdateRequest,
    ) -> Result<admin::LaunchPlanAttributesUpdateResponse, ResourceError> {
        let attrs = request.attributes.ok_or_else(|| missing("attributes"))?;
        let matching = matching_attributes(attrs.matching_attributes)?;
        let identity = ResourceIdentity::launch_plan(
            attrs.project,
            attrs.domain,
            attrs.workflow,
            attrs.launch_plan,
            matching.resource_type(),
        )?;

        self.upsert(&identity, &matching).await?;
        Ok(admin::LaunchPlanAttributesUpdateResponse {})
    }

    pub async fn get_launch_plan_attributes(
        &self,
        request: admin::LaunchPlanAttributesGetRequest,
    ) -> Result<admin::LaunchPlanAttributesGetResponse, ResourceError> {
        let identity = ResourceIdentity::launch_plan(
            request.project,
            request.domain,
            request.workflow,
            request.launch_plan,
            ResourceType::from_proto(request.resource_type)?,
        )?;
        let matching = self.get(&identity).await?;

        Ok(admin::LaunchPlanAttributesGetResponse {
            attributes: Some(admin::LaunchPlanAttributes {
                project: identity.project().to_string(),
                domain: identity.domain().to_string(),
                workflow: identity.workflow_name().unwrap_or_default().to_string(),
                launch_plan: identity.launch_plan_name().unwrap_or_default().to_string(),
                matching_attributes: Some(matching.into()),
            }),
        })
    }

    pub async fn delete_launch_plan_attributes(
        &self,
        request: admin::LaunchPlanAttributesDeleteRequest,
    ) -> Result<admin::LaunchPlanAttributesDeleteResponse, ResourceError> {
        let identity = ResourceIdentity::launch_plan(
            request.project,
            request.domain,
            request.workflow,
            request.launch_plan,
            ResourceType::from_proto(request.resource_type)?,
        )?;
        self.delete(&identity).await?;
        Ok(admin::LaunchPlanAttributesDeleteResponse {})
    }
}

fn missing(field: &str) -> ResourceError {
    ResourceError::InvalidArgument(format!("{} is required", field))
}

fn matching_attributes(
    value: Option<admin::MatchingAttributes>,
) -> Result<MatchingAttributes, ResourceError> {
    MatchingAttributes::try_from(value.ok_or_else(|| missing("matching_attributes"))?)
}
