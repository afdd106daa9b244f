//! Build order and dry runs
//!
//! Everything here works on the template alone. No provider client is
//! needed, so `plan` and `validate` run without credentials.

use crate::error::{ResourceError, Result};
use crate::provider::{ProviderHandle, ResourceId};
use crate::registry::{ResourceKind, ResourceRegistry};
use crate::resolver::{self, BuiltHandles, ReferenceIndex, Substitution};
use crate::resource::{Resource, ResourceRequest};
use crate::template::{ResourceDeclaration, StackTemplate, parse_template};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Priority given to declarations whose type cannot be constructed
const UNBUILDABLE_PRIORITY: i32 = i32::MAX;

/// How the build sequence is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Stable sort by ascending priority
    #[default]
    Priority,
    /// Topological order over references, priority breaks ties
    #[serde(alias = "graph", alias = "dependency-graph")]
    DependencyGraph,
}

impl FromStr for OrderingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "priority" => Ok(OrderingStrategy::Priority),
            "dependency_graph" | "dependency-graph" | "graph" => {
                Ok(OrderingStrategy::DependencyGraph)
            }
            other => Err(format!("unknown ordering strategy: {}", other)),
        }
    }
}

impl std::fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingStrategy::Priority => write!(f, "priority"),
            OrderingStrategy::DependencyGraph => write!(f, "dependency_graph"),
        }
    }
}

/// One declaration in build order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStep {
    /// Template key
    pub name: String,
    /// Position in the template
    pub index: usize,
    pub kind: Option<ResourceKind>,
    pub priority: i32,
    /// Template keys this declaration references
    pub references: BTreeSet<String>,
    /// Known to fail before any provider call (bad type or priority)
    #[serde(skip)]
    pub problem: Option<ResourceError>,
}

/// Build sequence for a template
#[derive(Debug, Clone, Serialize)]
pub struct StackPlan {
    pub ordering: OrderingStrategy,
    pub steps: Vec<PlannedStep>,
}

impl StackPlan {
    /// Steps that reference a resource scheduled later (or never)
    ///
    /// With priority ordering these fail at build time; the usual cause is a
    /// producer declared with a higher priority than its dependent.
    pub fn ordering_violations(&self) -> Vec<(&str, &str)> {
        let position: HashMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();

        let mut violations = Vec::new();
        for (i, step) in self.steps.iter().enumerate() {
            for reference in &step.references {
                if position.get(reference.as_str()).is_none_or(|&p| p >= i) {
                    violations.push((step.name.as_str(), reference.as_str()));
                }
            }
        }
        violations
    }
}

/// Dry-run result for one declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedResource {
    pub name: String,
    pub priority: i32,
    pub result: std::result::Result<ResourceRequest, ResourceError>,
}

/// Dry-run result for a whole template
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub stack_name: String,
    pub resources: Vec<ValidatedResource>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.resources.iter().all(|r| r.result.is_ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &ResourceError)> {
        self.resources
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.name.as_str(), e)))
    }
}

/// Orders declarations and builds their requests, without a provider
#[derive(Debug, Default)]
pub struct StackPlanner {
    registry: ResourceRegistry,
    ordering: OrderingStrategy,
}

impl StackPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: ResourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingStrategy) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn ordering(&self) -> OrderingStrategy {
        self.ordering
    }

    /// Build order for a template
    pub fn plan(&self, template_body: &[u8]) -> Result<StackPlan> {
        let template = parse_template(template_body)?;
        Ok(self.plan_template(&template))
    }

    /// Build every request in order without calling a provider
    ///
    /// References to earlier, valid resources resolve to placeholder IDs, so
    /// ordering mistakes are reported like they would be by a real build.
    #[instrument(skip(self, template_body))]
    pub fn validate(&self, template_body: &[u8], stack_name: &str) -> Result<ValidationReport> {
        let template = parse_template(template_body)?;
        let plan = self.plan_template(&template);
        let index = ReferenceIndex::new(&template.resources);

        let mut built = BuiltHandles::new();
        let mut resources = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            let declaration = &template.resources[step.index];
            let result = self
                .prepare(stack_name, declaration, step, &built, &index)
                .map(|(_, request)| request);
            if let (Ok(_), Some(kind)) = (&result, step.kind) {
                built.insert(step.name.clone(), placeholder_handle(kind, &step.name));
            }
            resources.push(ValidatedResource {
                name: step.name.clone(),
                priority: step.priority,
                result,
            });
        }

        let report = ValidationReport {
            stack_name: stack_name.to_string(),
            resources,
        };
        debug!(valid = report.is_valid(), "Template validated");
        Ok(report)
    }

    pub(crate) fn plan_template(&self, template: &StackTemplate) -> StackPlan {
        let index = ReferenceIndex::new(&template.resources);

        let steps: Vec<PlannedStep> = template
            .resources
            .iter()
            .enumerate()
            .map(|(i, declaration)| self.plan_step(i, declaration, &index))
            .collect();

        let steps = match self.ordering {
            OrderingStrategy::Priority => order_by_priority(steps),
            OrderingStrategy::DependencyGraph => order_by_dependencies(steps),
        };

        StackPlan {
            ordering: self.ordering,
            steps,
        }
    }

    fn plan_step(
        &self,
        index: usize,
        declaration: &ResourceDeclaration,
        references: &ReferenceIndex,
    ) -> PlannedStep {
        let constructed = declaration
            .resource_type()
            .ok_or(ResourceError::MissingType)
            .and_then(|tag| self.registry.construct(tag));

        let (kind, variant_priority, mut problem) = match constructed {
            Ok(resource) => (Some(resource.kind()), resource.priority(), None),
            Err(error) => (None, UNBUILDABLE_PRIORITY, Some(error)),
        };

        let priority = match declaration.priority_override() {
            Ok(Some(priority)) => priority,
            Ok(None) => variant_priority,
            Err(error) => {
                problem.get_or_insert(error);
                variant_priority
            }
        };

        PlannedStep {
            name: declaration.name.clone(),
            index,
            kind,
            priority,
            references: resolver::references(declaration, references),
            problem,
        }
    }

    /// Resolve references, construct the variant and build its request
    pub(crate) fn prepare(
        &self,
        stack_name: &str,
        declaration: &ResourceDeclaration,
        step: &PlannedStep,
        built: &BuiltHandles,
        index: &ReferenceIndex,
    ) -> std::result::Result<(Box<dyn Resource>, ResourceRequest), ResourceError> {
        if let Some(problem) = &step.problem {
            return Err(problem.clone());
        }

        let resolved = resolver::resolve(declaration, built, index)?;
        let tag = resolved
            .declaration
            .resource_type()
            .ok_or(ResourceError::MissingType)?;
        let mut resource = self.registry.construct(tag)?;
        match resource.build_request(stack_name, &resolved.declaration) {
            Ok(request) => Ok((resource, request)),
            Err(error) => Err(self.blame_substitution(
                error,
                stack_name,
                declaration,
                &resolved.substitutions,
                built,
                index,
            )),
        }
    }

    // A request that fails to decode but builds once a single reference is
    // left as authored failed because of the ID put in its place.
    fn blame_substitution(
        &self,
        error: ResourceError,
        stack_name: &str,
        declaration: &ResourceDeclaration,
        substitutions: &[Substitution],
        built: &BuiltHandles,
        index: &ReferenceIndex,
    ) -> ResourceError {
        if !matches!(
            error,
            ResourceError::InvalidDeclaration(_) | ResourceError::InvalidField { .. }
        ) {
            return error;
        }
        let Some(tag) = declaration.resource_type() else {
            return error;
        };

        for (i, substitution) in substitutions.iter().enumerate() {
            let Ok(authored) = resolver::resolve_keeping(declaration, built, index, i) else {
                continue;
            };
            let Ok(mut resource) = self.registry.construct(tag) else {
                break;
            };
            if resource.build_request(stack_name, &authored).is_ok() {
                return ResourceError::SubstitutedReference {
                    field: substitution.field.clone(),
                    reference: substitution.reference.clone(),
                    id: substitution.id.to_string(),
                    source: Box::new(error),
                };
            }
        }
        error
    }
}

fn order_by_priority(mut steps: Vec<PlannedStep>) -> Vec<PlannedStep> {
    // sort_by_key is stable: equal priorities keep declaration order
    steps.sort_by_key(|s| s.priority);
    steps
}

// Kahn's algorithm. Among ready steps the lowest (priority, declaration
// index) goes first. Steps left over are in a reference cycle; they are
// appended in priority order and fail at resolution.
fn order_by_dependencies(steps: Vec<PlannedStep>) -> Vec<PlannedStep> {
    let position: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
        for reference in &step.references {
            if let Some(&producer) = position.get(reference.as_str()) {
                dependents[producer].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: BTreeSet<(i32, usize)> = steps
        .iter()
        .enumerate()
        .filter(|(i, _)| in_degree[*i] == 0)
        .map(|(i, s)| (s.priority, i))
        .collect();

    let mut order = Vec::with_capacity(steps.len());
    while let Some(next) = ready.pop_first() {
        let (_, i) = next;
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert((steps[dependent].priority, dependent));
            }
        }
    }

    if order.len() < steps.len() {
        let mut cyclic: Vec<usize> = (0..steps.len()).filter(|i| !order.contains(i)).collect();
        cyclic.sort_by_key(|&i| (steps[i].priority, i));
        warn!(
            resources = ?cyclic.iter().map(|&i| steps[i].name.as_str()).collect::<Vec<_>>(),
            "Reference cycle detected"
        );
        order.extend(cyclic);
    }

    let mut slots: Vec<Option<PlannedStep>> = steps.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

fn placeholder_handle(kind: ResourceKind, name: &str) -> ProviderHandle {
    let id = match kind {
        ResourceKind::Droplet | ResourceKind::Image => ResourceId::Numeric(0),
        ResourceKind::FloatingIp => ResourceId::Text("0.0.0.0".to_string()),
        ResourceKind::Firewall | ResourceKind::LoadBalancer | ResourceKind::Domain => {
            ResourceId::Text(name.to_string())
        }
    };
    ProviderHandle::new(kind, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Resources:\n";

    fn droplet(key: &str, name: &str) -> String {
        format!(
            r#"
  {key}:
    Name: {name}
    Region: region
    Size: size
    Type: Droplet
    Image:
      Slug: "ubuntu-14-04-x64"
"#
        )
    }

    fn template(resources: &[String]) -> Vec<u8> {
        format!("{}{}", HEADER, resources.concat()).into_bytes()
    }

    #[test]
    fn test_plan_priority_order_is_stable() {
        let body = template(&[
            r#"
  Site:
    Type: Domain
    Name: example.com
    IPAddress: Ip
"#
            .to_string(),
            r#"
  Ip:
    Type: FloatingIP
    DropletID: B
"#
            .to_string(),
            droplet("B", "b"),
            droplet("A", "a"),
        ]);
        let plan = StackPlanner::new().plan(&body).unwrap();
        let names: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "Ip", "Site"]);
        assert!(plan.ordering_violations().is_empty());
        assert_eq!(plan.steps[2].references, BTreeSet::from(["B".to_string()]));
    }

    #[test]
    fn test_plan_reports_ordering_violations() {
        let body = template(&[
            r#"
  Ip:
    Type: FloatingIP
    DropletID: Web
    Priority: -1
"#
            .to_string(),
            droplet("Web", "web"),
        ]);
        let plan = StackPlanner::new().plan(&body).unwrap();
        assert_eq!(plan.ordering_violations(), vec![("Ip", "Web")]);

        let plan = StackPlanner::new()
            .with_ordering(OrderingStrategy::DependencyGraph)
            .plan(&body)
            .unwrap();
        assert!(plan.ordering_violations().is_empty());
    }

    #[test]
    fn test_dependency_graph_cycle_is_appended() {
        let body = template(&[
            r#"
  A:
    Type: FloatingIP
    DropletID: B
  B:
    Type: FloatingIP
    DropletID: A
"#
            .to_string(),
            droplet("Web", "web"),
        ]);
        let plan = StackPlanner::new()
            .with_ordering(OrderingStrategy::DependencyGraph)
            .plan(&body)
            .unwrap();
        let names: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Web", "A", "B"]);
    }

    #[test]
    fn test_validate_reports_each_resource() {
        let body = template(&[
            droplet("Droplet1", "MyDroplet"),
            r#"
  FloatingIP:
    Type: FloatingIP
    DropletID: MyDroplet
  Broken:
    Type: Droplet
    Name: broken
    Image: ubuntu
    Asdf: Bla
"#
            .to_string(),
        ]);
        let report = StackPlanner::new().validate(&body, "TestStack").unwrap();

        assert!(!report.is_valid());
        let errors: Vec<(&str, &ResourceError)> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "Broken");

        let ip = report.resources.iter().find(|r| r.name == "FloatingIP").unwrap();
        assert_eq!(
            ip.result.as_ref().unwrap().as_floating_ip().unwrap().droplet_id,
            Some(0)
        );
    }

    #[test]
    fn test_ordering_strategy_from_str() {
        assert_eq!("priority".parse(), Ok(OrderingStrategy::Priority));
        assert_eq!("graph".parse(), Ok(OrderingStrategy::DependencyGraph));
        assert!("random".parse::<OrderingStrategy>().is_err());
    }

    #[test]
    fn test_validate_names_substituted_reference() {
        let body = template(&[
            droplet("Web", "web"),
            r#"
  Worker:
    Type: Droplet
    Name: worker
    Priority: 5
    Image: ubuntu-22-04-x64
    Tags: [web]
"#
            .to_string(),
        ]);
        let report = StackPlanner::new().validate(&body, "TestStack").unwrap();

        let errors: Vec<(&str, &ResourceError)> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ("Worker", ResourceError::SubstitutedReference { field, reference, id, .. })
                if field == "Tags[0]" && reference == "web" && id == "0"
        ));
    }

    #[test]
    fn test_plan_of_empty_template() {
        let planner = StackPlanner::new().with_ordering(OrderingStrategy::DependencyGraph);
        assert_eq!(planner.ordering(), OrderingStrategy::DependencyGraph);
        let plan = planner.plan(b"").unwrap();
        assert_eq!(plan.ordering, OrderingStrategy::DependencyGraph);
        assert!(plan.steps.is_empty());
    }
}
