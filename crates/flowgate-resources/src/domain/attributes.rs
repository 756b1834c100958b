//! Typed override payloads.
//!
//! The wire message `MatchingAttributes` carries four optional fields; the
//! domain type is an enum so that "exactly one is set" holds by construction.
//! The stored payload is the protobuf encoding of the inner message only. The
//! resource type in the identity picks the schema on the way back.

use flowgate_types::admin;
use prost::Message;

use super::errors::ResourceError;
use super::identity::ResourceType;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchingAttributes {
    TaskResource(admin::TaskResourceAttributes),
    ClusterResource(admin::ClusterResourceAttributes),
    ExecutionQueue(admin::ExecutionQueueAttributes),
    ExecutionClusterLabel(admin::ExecutionClusterLabel),
}

impl MatchingAttributes {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::TaskResource(_) => ResourceType::TaskResource,
            Self::ClusterResource(_) => ResourceType::ClusterResource,
            Self::ExecutionQueue(_) => ResourceType::ExecutionQueue,
            Self::ExecutionClusterLabel(_) => ResourceType::ExecutionClusterLabel,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::TaskResource(m) => m.encode_to_vec(),
            Self::ClusterResource(m) => m.encode_to_vec(),
            Self::ExecutionQueue(m) => m.encode_to_vec(),
            Self::ExecutionClusterLabel(m) => m.encode_to_vec(),
        }
    }

    /// Decode a stored payload under the given resource type.
    pub fn decode(resource_type: ResourceType, payload: &[u8]) -> Result<Self, prost::DecodeError> {
        Ok(match resource_type {
            ResourceType::TaskResource => {
                Self::TaskResource(admin::TaskResourceAttributes::decode(payload)?)
            }
            ResourceType::ClusterResource => {
                Self::ClusterResource(admin::ClusterResourceAttributes::decode(payload)?)
            }
            ResourceType::ExecutionQueue => {
                Self::ExecutionQueue(admin::ExecutionQueueAttributes::decode(payload)?)
            }
            ResourceType::ExecutionClusterLabel => {
                Self::ExecutionClusterLabel(admin::ExecutionClusterLabel::decode(payload)?)
            }
        })
    }
}

impl TryFrom<admin::MatchingAttributes> for MatchingAttributes {
    type Error = ResourceError;

    fn try_from(value: admin::MatchingAttributes) -> Result<Self, Self::Error> {
        let admin::MatchingAttributes {
            task_resource_attributes,
            cluster_resource_attributes,
            execution_queue_attributes,
            execution_cluster_label,
        } = value;

        let mut set = Vec::with_capacity(1);
        if let Some(m) = task_resource_attributes {
            set.push(Self::TaskResource(m));
        }
        if let Some(m) = cluster_resource_attributes {
            set.push(Self::ClusterResource(m));
        }
        if let Some(m) = execution_queue_attributes {
            set.push(Self::ExecutionQueue(m));
        }
        if let Some(m) = execution_cluster_label {
            set.push(Self::ExecutionClusterLabel(m));
        }

        match set.len() {
            1 => Ok(set.remove(0)),
            0 => Err(ResourceError::InvalidArgument(
                "matching_attributes must set one attribute type".into(),
            )),
            n => Err(ResourceError::InvalidArgument(format!(
                "matching_attributes sets {} attribute types, expected one",
                n
            ))),
        }
    }
}

impl From<MatchingAttributes> for admin::MatchingAttributes {
    fn from(value: MatchingAttributes) -> Self {
        let mut out = admin::MatchingAttributes::default();
        match value {
            MatchingAttributes::TaskResource(m) => out.task_resource_attributes = Some(m),
            MatchingAttributes::ClusterResource(m) => out.cluster_resource_attributes = Some(m),
            MatchingAttributes::ExecutionQueue(m) => out.execution_queue_attributes = Some(m),
            MatchingAttributes::ExecutionClusterLabel(m) => out.execution_cluster_label = Some(m),
        }
        out
    }
}
