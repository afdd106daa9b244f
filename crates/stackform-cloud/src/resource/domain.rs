//! Domain

use super::{Resource, ResourceRequest, schema};
use crate::error::ResourceError;
use crate::provider::{ProviderClient, ProviderHandle};
use crate::registry::ResourceKind;
use crate::template::ResourceDeclaration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const FIELDS: &[&str] = &["Name", "IPAddress"];

const DOMAIN_PRIORITY: i32 = 2;

/// Body of `POST /v2/domains`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DomainSchema {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "IPAddress", default)]
    ip_address: Option<String>,
}

/// Domain name pointed at an address of the stack
#[derive(Debug, Clone)]
pub struct Domain {
    pub priority: i32,
    pub request: Option<DomainCreateRequest>,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            priority: DOMAIN_PRIORITY,
            request: None,
        }
    }
}

#[async_trait]
impl Resource for Domain {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Domain
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn build_request(
        &mut self,
        _stack_name: &str,
        declaration: &ResourceDeclaration,
    ) -> Result<ResourceRequest, ResourceError> {
        let schema: DomainSchema = schema::decode(declaration, FIELDS)?;

        if schema.name.trim().is_empty() {
            return Err(ResourceError::InvalidField {
                field: "Name".to_string(),
                message: "domain name must not be empty".to_string(),
            });
        }

        let request = DomainCreateRequest {
            name: schema.name,
            ip_address: schema.ip_address,
        };

        self.request = Some(request.clone());
        Ok(ResourceRequest::Domain(request))
    }

    async fn build(&self, client: &dyn ProviderClient) -> Result<ProviderHandle, ResourceError> {
        let request = self.request.as_ref().ok_or(ResourceError::RequestNotBuilt)?;

        debug!(domain = %request.name, "Creating domain");
        let created = client.create_domain(request).await?;

        Ok(created.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let fields = serde_yaml::from_str("Type: Domain\nName: example.com\nIPAddress: 192.168.0.1\n")
            .unwrap();
        let mut domain = Domain::default();
        let request = domain
            .build_request("TestStack", &ResourceDeclaration::new("Site", fields))
            .unwrap();

        assert_eq!(
            request.as_domain(),
            Some(&DomainCreateRequest {
                name: "example.com".to_string(),
                ip_address: Some("192.168.0.1".to_string()),
            })
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let fields = serde_yaml::from_str("Type: Domain\nName: ''\n").unwrap();
        let mut domain = Domain::default();
        let result = domain.build_request("TestStack", &ResourceDeclaration::new("Site", fields));
        assert!(matches!(result, Err(ResourceError::InvalidField { .. })));
    }
}
