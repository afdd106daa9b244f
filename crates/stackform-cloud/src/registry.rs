//! Resource type registry
//!
//! Maps the `Type` tag of a declaration to a constructor for the matching
//! [`Resource`] variant. Adding a new resource kind means registering one more
//! constructor.

use crate::error::ResourceError;
use crate::resource::{Domain, Droplet, FloatingIp, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Every resource kind a template may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Droplet,
    #[serde(rename = "FloatingIP")]
    FloatingIp,
    Firewall,
    Image,
    LoadBalancer,
    Domain,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Droplet,
        ResourceKind::FloatingIp,
        ResourceKind::Firewall,
        ResourceKind::Image,
        ResourceKind::LoadBalancer,
        ResourceKind::Domain,
    ];

    /// Tag used in templates
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceKind::Droplet => "Droplet",
            ResourceKind::FloatingIp => "FloatingIP",
            ResourceKind::Firewall => "Firewall",
            ResourceKind::Image => "Image",
            ResourceKind::LoadBalancer => "LoadBalancer",
            ResourceKind::Domain => "Domain",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Droplet => write!(f, "Droplet"),
            ResourceKind::FloatingIp => write!(f, "Floating IP"),
            ResourceKind::Firewall => write!(f, "Firewall"),
            ResourceKind::Image => write!(f, "Image"),
            ResourceKind::LoadBalancer => write!(f, "Load Balancer"),
            ResourceKind::Domain => write!(f, "Domain"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = ResourceError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| ResourceError::UnknownResourceType {
                tag: tag.to_string(),
            })
    }
}

/// Constructor producing a fresh, default-initialized resource
pub type ResourceConstructor = fn() -> Box<dyn Resource>;

/// Lookup table from resource kind to constructor
///
/// Read-only once built; safe to share between stack builds.
#[derive(Clone)]
pub struct ResourceRegistry {
    constructors: HashMap<ResourceKind, ResourceConstructor>,
}

impl ResourceRegistry {
    /// An empty registry, every tag is reported as unsupported
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry with all built-in variants
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ResourceKind::Droplet, || Box::new(Droplet::default()));
        registry.register(ResourceKind::FloatingIp, || Box::new(FloatingIp::default()));
        registry.register(ResourceKind::Domain, || Box::new(Domain::default()));
        registry
    }

    pub fn register(&mut self, kind: ResourceKind, constructor: ResourceConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn is_supported(&self, kind: ResourceKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Construct the resource variant for a `Type` tag
    pub fn construct(&self, tag: &str) -> Result<Box<dyn Resource>, ResourceError> {
        let kind: ResourceKind = tag.parse()?;
        self.constructors
            .get(&kind)
            .map(|constructor| constructor())
            .ok_or_else(|| ResourceError::UnsupportedResourceType {
                tag: tag.to_string(),
            })
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&'static str> = self.constructors.keys().map(|k| k.tag()).collect();
        kinds.sort_unstable();
        f.debug_struct("ResourceRegistry").field("kinds", &kinds).finish()
    }
}
