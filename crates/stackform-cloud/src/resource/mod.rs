//! Resource variants
//!
//! A resource turns its raw declaration into a typed create request
//! ([`Resource::build_request`]) and then realizes that request through a
//! [`ProviderClient`] ([`Resource::build`]).

mod domain;
mod droplet;
mod floating_ip;
pub mod schema;

pub use domain::{Domain, DomainCreateRequest};
pub use droplet::{Droplet, DropletCreateRequest, DropletImage, DropletSshKey};
pub use floating_ip::{FloatingIp, FloatingIpCreateRequest};

use crate::error::ResourceError;
use crate::provider::{ProviderClient, ProviderHandle};
use crate::registry::ResourceKind;
use crate::template::ResourceDeclaration;
use async_trait::async_trait;
use serde::Serialize;

/// A buildable infrastructure resource
#[async_trait]
pub trait Resource: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Ordering hint, lower values are created first
    fn priority(&self) -> i32;

    /// Validate the declaration and store the typed create request
    fn build_request(
        &mut self,
        stack_name: &str,
        declaration: &ResourceDeclaration,
    ) -> Result<ResourceRequest, ResourceError>;

    /// Send the stored request to the provider
    async fn build(&self, client: &dyn ProviderClient) -> Result<ProviderHandle, ResourceError>;
}

/// Typed create request emitted by a resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceRequest {
    Droplet(DropletCreateRequest),
    FloatingIp(FloatingIpCreateRequest),
    Domain(DomainCreateRequest),
}

impl ResourceRequest {
    pub fn as_droplet(&self) -> Option<&DropletCreateRequest> {
        match self {
            ResourceRequest::Droplet(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_floating_ip(&self) -> Option<&FloatingIpCreateRequest> {
        match self {
            ResourceRequest::FloatingIp(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_domain(&self) -> Option<&DomainCreateRequest> {
        match self {
            ResourceRequest::Domain(request) => Some(request),
            _ => None,
        }
    }
}
