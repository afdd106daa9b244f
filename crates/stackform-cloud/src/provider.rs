//! Provider client abstraction

use crate::error::ProviderError;
use crate::registry::ResourceKind;
use crate::resource::{DomainCreateRequest, DropletCreateRequest, FloatingIpCreateRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remote API used to realize resources
///
/// Each call is one round-trip to the provider. Retries, rate limiting and
/// timeouts are the implementation's business.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Returns the provider name (e.g., "digitalocean")
    fn name(&self) -> &str;

    async fn create_droplet(
        &self,
        request: &DropletCreateRequest,
    ) -> Result<DropletCreated, ProviderError>;

    async fn create_floating_ip(
        &self,
        request: &FloatingIpCreateRequest,
    ) -> Result<FloatingIpCreated, ProviderError>;

    async fn create_domain(
        &self,
        request: &DomainCreateRequest,
    ) -> Result<DomainCreated, ProviderError>;
}

/// A droplet accepted by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropletCreated {
    pub id: u64,
    pub name: String,
}

/// A floating IP reserved by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingIpCreated {
    pub ip: String,
    pub region: Option<String>,
    pub droplet_id: Option<u64>,
}

/// A domain registered with the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCreated {
    pub name: String,
}

/// Identifier assigned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Numeric(u64),
    Text(String),
}

impl ResourceId {
    /// YAML form substituted into declarations that reference this resource
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            ResourceId::Numeric(id) => serde_yaml::Value::Number((*id).into()),
            ResourceId::Text(id) => serde_yaml::Value::String(id.clone()),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Numeric(id) => write!(f, "{}", id),
            ResourceId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// What the provider returned for a created resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHandle {
    pub kind: ResourceKind,

    /// Identifier other resources resolve to
    pub id: ResourceId,

    /// Resource attributes (IP, region, ...)
    pub attributes: BTreeMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl ProviderHandle {
    pub fn new(kind: ResourceKind, id: ResourceId) -> Self {
        Self {
            kind,
            id,
            attributes: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl From<DropletCreated> for ProviderHandle {
    fn from(created: DropletCreated) -> Self {
        ProviderHandle::new(ResourceKind::Droplet, ResourceId::Numeric(created.id))
            .with_attribute("name", serde_json::json!(created.name))
    }
}

impl From<FloatingIpCreated> for ProviderHandle {
    fn from(created: FloatingIpCreated) -> Self {
        ProviderHandle::new(ResourceKind::FloatingIp, ResourceId::Text(created.ip))
            .with_attribute("region", serde_json::json!(created.region))
            .with_attribute("droplet_id", serde_json::json!(created.droplet_id))
    }
}

impl From<DomainCreated> for ProviderHandle {
    fn from(created: DomainCreated) -> Self {
        ProviderHandle::new(ResourceKind::Domain, ResourceId::Text(created.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_to_yaml() {
        assert_eq!(
            ResourceId::Numeric(987).to_yaml(),
            serde_yaml::Value::Number(987.into())
        );
        assert_eq!(
            ResourceId::Text("192.168.0.1".to_string()).to_yaml(),
            serde_yaml::Value::String("192.168.0.1".to_string())
        );
    }

    #[test]
    fn test_floating_ip_handle_attributes() {
        let handle: ProviderHandle = FloatingIpCreated {
            ip: "192.168.0.1".to_string(),
            region: Some("nyc3".to_string()),
            droplet_id: Some(987),
        }
        .into();

        assert_eq!(handle.kind, ResourceKind::FloatingIp);
        assert_eq!(handle.id.to_string(), "192.168.0.1");
        assert_eq!(handle.get_attribute::<u64>("droplet_id"), Some(987));
        assert_eq!(handle.get_attribute::<String>("region").as_deref(), Some("nyc3"));
    }
}
