//! Floating IP

use super::{Resource, ResourceRequest, schema};
use crate::error::ResourceError;
use crate::provider::{ProviderClient, ProviderHandle};
use crate::registry::ResourceKind;
use crate::template::ResourceDeclaration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const FIELDS: &[&str] = &["Region", "DropletID"];

const FLOATING_IP_PRIORITY: i32 = 1;

/// Body of `POST /v2/floating_ips`
///
/// Either `region` (reserve only) or `droplet_id` (reserve and assign).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingIpCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub droplet_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FloatingIpSchema {
    #[serde(rename = "Region", default)]
    region: Option<String>,
    #[serde(rename = "DropletID", default)]
    droplet_id: Option<u64>,
}

/// Static IP that can be assigned to a droplet
#[derive(Debug, Clone)]
pub struct FloatingIp {
    pub priority: i32,
    pub request: Option<FloatingIpCreateRequest>,
}

impl Default for FloatingIp {
    fn default() -> Self {
        Self {
            priority: FLOATING_IP_PRIORITY,
            request: None,
        }
    }
}

#[async_trait]
impl Resource for FloatingIp {
    fn kind(&self) -> ResourceKind {
        ResourceKind::FloatingIp
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn build_request(
        &mut self,
        _stack_name: &str,
        declaration: &ResourceDeclaration,
    ) -> Result<ResourceRequest, ResourceError> {
        let schema: FloatingIpSchema = schema::decode(declaration, FIELDS)?;

        if schema.region.is_none() && schema.droplet_id.is_none() {
            return Err(ResourceError::InvalidField {
                field: "Region".to_string(),
                message: "a floating IP needs a Region or a DropletID".to_string(),
            });
        }

        let request = FloatingIpCreateRequest {
            region: schema.region,
            droplet_id: schema.droplet_id,
        };

        self.request = Some(request.clone());
        Ok(ResourceRequest::FloatingIp(request))
    }

    async fn build(&self, client: &dyn ProviderClient) -> Result<ProviderHandle, ResourceError> {
        let request = self.request.as_ref().ok_or(ResourceError::RequestNotBuilt)?;

        debug!(region = ?request.region, droplet_id = ?request.droplet_id, "Creating floating IP");
        let created = client.create_floating_ip(request).await?;
        debug!(ip = %created.ip, "Floating IP created");

        Ok(created.into())
    }
}
