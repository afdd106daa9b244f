//! Stack request/response types and outcome aggregation

use crate::error::{ResourceError, StackError};
use crate::provider::ProviderHandle;
use crate::registry::ResourceKind;
use crate::resource::ResourceRequest;
use serde::Serialize;

/// Create stack request
#[derive(Debug, Clone)]
pub struct CreateStackRequest {
    pub template_body: Vec<u8>,
    pub stack_name: String,
}

impl CreateStackRequest {
    pub fn new(template_body: impl Into<Vec<u8>>, stack_name: impl Into<String>) -> Self {
        Self {
            template_body: template_body.into(),
            stack_name: stack_name.into(),
        }
    }
}

/// Delete stack request (not implemented)
#[derive(Debug, Clone, Default)]
pub struct DeleteStackRequest {}

/// Delete stack response (not implemented)
#[derive(Debug, Clone, Default)]
pub struct DeleteStackResponse {}

/// Describe stack request (not implemented)
#[derive(Debug, Clone, Default)]
pub struct DescribeStackRequest {}

/// Describe stack response (not implemented)
#[derive(Debug, Clone, Default)]
pub struct DescribeStackResponse {}

/// Terminal state of a stack build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StackStatus {
    /// Every declared resource was created
    Created,
    /// Some resources were created, some failed
    PartiallyFailed,
    /// Nothing could be created
    Failed,
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackStatus::Created => write!(f, "created"),
            StackStatus::PartiallyFailed => write!(f, "partially failed"),
            StackStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A resource the provider created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedResource {
    /// Template key
    pub name: String,
    pub kind: ResourceKind,
    /// Request that was sent, after reference resolution
    pub request: ResourceRequest,
    pub handle: ProviderHandle,
}

/// A resource that could not be created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceFailure {
    /// Template key
    pub name: String,
    #[serde(skip)]
    pub error: ResourceError,
    pub message: String,
}

impl ResourceFailure {
    pub fn new(name: impl Into<String>, error: ResourceError) -> Self {
        let name = name.into();
        let message = format!("{}: {}", name, error);
        Self {
            name,
            error,
            message,
        }
    }
}

/// Result of building one declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResourceOutcome {
    Created(CreatedResource),
    Failed(ResourceFailure),
}

impl ResourceOutcome {
    /// Template key of the resource
    pub fn name(&self) -> &str {
        match self {
            ResourceOutcome::Created(created) => &created.name,
            ResourceOutcome::Failed(failure) => &failure.name,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ResourceOutcome::Created(_))
    }
}

/// Create stack response
#[derive(Debug, Clone, Serialize)]
pub struct CreateStackResponse {
    pub name: String,
    pub status: StackStatus,
    /// Outcomes in build order
    pub outcomes: Vec<ResourceOutcome>,
}

impl CreateStackResponse {
    pub fn created(&self) -> impl Iterator<Item = &CreatedResource> {
        self.outcomes.iter().filter_map(|o| match o {
            ResourceOutcome::Created(created) => Some(created),
            ResourceOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            ResourceOutcome::Failed(failure) => Some(failure),
            ResourceOutcome::Created(_) => None,
        })
    }

    pub fn outcome(&self, name: &str) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|o| o.name() == name)
    }

    pub fn succeeded_count(&self) -> usize {
        self.created().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Convert a [`StackStatus::Failed`] response into a stack-level error
    ///
    /// Partially failed stacks are returned as-is; callers inspect
    /// [`Self::failures`] for details.
    pub fn into_result(self) -> Result<Self, StackError> {
        if self.status == StackStatus::Failed {
            return Err(StackError::Failed {
                failures: self.failures().cloned().collect(),
                stack: self.name,
            });
        }
        Ok(self)
    }
}

/// Accumulates per-resource outcomes during a build pass
#[derive(Debug)]
pub struct StackResponseBuilder {
    name: String,
    outcomes: Vec<ResourceOutcome>,
}

impl StackResponseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn add_success(
        &mut self,
        name: impl Into<String>,
        request: ResourceRequest,
        handle: ProviderHandle,
    ) {
        self.outcomes.push(ResourceOutcome::Created(CreatedResource {
            name: name.into(),
            kind: handle.kind,
            request,
            handle,
        }));
    }

    pub fn add_failure(&mut self, name: impl Into<String>, error: ResourceError) {
        self.outcomes
            .push(ResourceOutcome::Failed(ResourceFailure::new(name, error)));
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_created()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    pub fn finish(self) -> CreateStackResponse {
        let succeeded = self.succeeded_count();
        let failed = self.failed_count();
        let status = match (succeeded, failed) {
            (_, 0) => StackStatus::Created,
            (0, _) => StackStatus::Failed,
            _ => StackStatus::PartiallyFailed,
        };

        CreateStackResponse {
            name: self.name,
            status,
            outcomes: self.outcomes,
        }
    }
}
