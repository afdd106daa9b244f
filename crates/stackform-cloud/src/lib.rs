//! Stackform Stack Engine
//!
//! This crate turns a declarative YAML template into cloud resources.
//! Resources are created one at a time in priority order; a resource may
//! refer to another by template key or `Name`, and the reference is
//! replaced by the provider-assigned ID before its request is built.
//!
//! # Supported Resources
//!
//! - **Droplet**: virtual machine (priority 0)
//! - **FloatingIP**: reserved public address (priority 1)
//! - **Domain**: DNS zone pointed at an address (priority 2)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 Stackform CLI                    │
//! │          (stackform create/plan/validate)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stackform-cloud                    │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │   Template   │  │       StackEngine        │ │
//! │  │    Parser    │──▶  order → resolve → build │ │
//! │  └──────────────┘  └────────────┬─────────────┘ │
//! │  ┌──────────────┐  ┌────────────▼─────────────┐ │
//! │  │ StackPlanner │  │  trait ProviderClient    │ │
//! │  │  + Registry  │  └──────────────────────────┘ │
//! │  └──────────────┘                               │
//! └───────────────────────────────┬─────────────────┘
//!                                 │
//!                    ┌────────────▼────────────┐
//!                    │ stackform-cloud-        │
//!                    │ digitalocean            │
//!                    └─────────────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod planner;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod response;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use engine::StackEngine;
pub use error::{ProviderError, ResourceError, Result, StackError};
pub use planner::{
    OrderingStrategy, PlannedStep, StackPlan, StackPlanner, ValidatedResource, ValidationReport,
};
pub use provider::{
    DomainCreated, DropletCreated, FloatingIpCreated, ProviderClient, ProviderHandle, ResourceId,
};
pub use registry::{ResourceKind, ResourceRegistry};
pub use resource::{
    DomainCreateRequest, DropletCreateRequest, DropletImage, DropletSshKey,
    FloatingIpCreateRequest, Resource, ResourceRequest,
};
pub use response::{
    CreateStackRequest, CreateStackResponse, CreatedResource, ResourceFailure, ResourceOutcome,
    StackStatus,
};
pub use template::{Parameter, ResourceDeclaration, StackTemplate, parse_template};
