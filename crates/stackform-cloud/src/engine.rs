//! Stack orchestration engine
//!
//! Turns a template into an ordered sequence of provider calls:
//!
//! 1. parse the template (fatal on failure, nothing is attempted)
//! 2. order declarations by priority, or by reference graph
//! 3. build each declaration in turn: resolve references, construct the
//!    variant, build its request, call the provider
//! 4. aggregate per-resource outcomes into a [`CreateStackResponse`]
//!
//! A failing resource never stops the pass. Resources that reference a
//! failed resource fail too, with [`ResourceError::UnresolvedReference`].

use crate::error::{ResourceError, Result};
use crate::planner::{OrderingStrategy, PlannedStep, StackPlan, StackPlanner, ValidationReport};
use crate::provider::{ProviderClient, ProviderHandle};
use crate::registry::ResourceRegistry;
use crate::resolver::{BuiltHandles, ReferenceIndex};
use crate::resource::ResourceRequest;
use crate::response::{CreateStackRequest, CreateStackResponse, StackResponseBuilder};
use crate::template::{ResourceDeclaration, parse_template};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Orchestrates stack creation against a provider
pub struct StackEngine {
    client: Arc<dyn ProviderClient>,
    planner: StackPlanner,
}

impl StackEngine {
    pub fn new(client: Arc<dyn ProviderClient>) -> Self {
        Self {
            client,
            planner: StackPlanner::new(),
        }
    }

    pub fn with_registry(mut self, registry: ResourceRegistry) -> Self {
        self.planner = self.planner.with_registry(registry);
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingStrategy) -> Self {
        self.planner = self.planner.with_ordering(ordering);
        self
    }

    pub fn ordering(&self) -> OrderingStrategy {
        self.planner.ordering()
    }

    /// Create every resource declared in the template
    ///
    /// Only template errors are returned as `Err`. Resource failures are
    /// reported in the response, whose status tells whether the stack was
    /// fully created, partially created, or not at all.
    #[instrument(skip(self, request), fields(stack = %request.stack_name))]
    pub async fn create_stack(&self, request: CreateStackRequest) -> Result<CreateStackResponse> {
        let template = parse_template(&request.template_body)?;
        let plan = self.planner.plan_template(&template);
        let index = ReferenceIndex::new(&template.resources);

        info!(
            resources = template.resources.len(),
            ordering = %self.ordering(),
            provider = self.client.name(),
            "Creating stack"
        );

        let mut built = BuiltHandles::new();
        let mut response = StackResponseBuilder::new(&request.stack_name);

        for step in &plan.steps {
            let declaration = &template.resources[step.index];
            match self
                .build_resource(&request.stack_name, declaration, step, &built, &index)
                .await
            {
                Ok((resource_request, handle)) => {
                    info!(resource = %step.name, id = %handle.id, "Resource created");
                    built.insert(step.name.clone(), handle.clone());
                    response.add_success(step.name.clone(), resource_request, handle);
                }
                Err(error) => {
                    warn!(resource = %step.name, error = %error, "Resource failed");
                    response.add_failure(step.name.clone(), error);
                }
            }
        }

        let response = response.finish();
        info!(
            status = %response.status,
            succeeded = response.succeeded_count(),
            failed = response.failed_count(),
            "Stack build finished"
        );
        Ok(response)
    }

    /// See [`StackPlanner::plan`]
    pub fn plan(&self, template_body: &[u8]) -> Result<StackPlan> {
        self.planner.plan(template_body)
    }

    /// See [`StackPlanner::validate`]
    pub fn validate(&self, template_body: &[u8], stack_name: &str) -> Result<ValidationReport> {
        self.planner.validate(template_body, stack_name)
    }

    async fn build_resource(
        &self,
        stack_name: &str,
        declaration: &ResourceDeclaration,
        step: &PlannedStep,
        built: &BuiltHandles,
        index: &ReferenceIndex,
    ) -> std::result::Result<(ResourceRequest, ProviderHandle), ResourceError> {
        let (resource, request) = self
            .planner
            .prepare(stack_name, declaration, step, built, index)?;
        debug!(resource = %step.name, kind = %resource.kind(), "Request built");

        let handle = resource.build(self.client.as_ref()).await?;
        Ok((request, handle))
    }
}
