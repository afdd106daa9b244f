//! DigitalOcean v2 API client
//!
//! Direct REST implementation with Bearer token authentication. Only the
//! create endpoints the stack engine needs are covered.

use crate::error::{DigitalOceanError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stackform_cloud::{
    DomainCreateRequest, DomainCreated, DropletCreateRequest, DropletCreated,
    FloatingIpCreateRequest, FloatingIpCreated, ProviderClient, ProviderError,
};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

const TOKEN_ENV: &str = "DIGITALOCEAN_TOKEN";

/// Connection settings for [`DigitalOceanClient`]
#[derive(Debug, Clone)]
pub struct DigitalOceanConfig {
    pub api_token: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl DigitalOceanConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DIGITALOCEAN_API_BASE.to_string(),
            timeout: None,
        }
    }

    /// Create DigitalOceanConfig from the `DIGITALOCEAN_TOKEN` environment variable
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var(TOKEN_ENV).map_err(|_| DigitalOceanError::MissingToken)?;
        Ok(Self::new(api_token))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// DigitalOcean provider client
pub struct DigitalOceanClient {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl DigitalOceanClient {
    pub fn new(config: DigitalOceanConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(DigitalOceanError::MissingToken);
        }
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(DigitalOceanError::InvalidBaseUrl(config.base_url));
        }

        let mut builder =
            reqwest::Client::builder().user_agent(concat!("stackform/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_token: config.api_token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DigitalOceanError::AuthenticationFailed(message));
            }
            return Err(DigitalOceanError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// POST /droplets
    #[instrument(skip(self, request), fields(droplet = %request.name))]
    pub async fn create_droplet(&self, request: &DropletCreateRequest) -> Result<DropletCreated> {
        let envelope: DropletEnvelope = self.post("droplets", request).await?;
        debug!(id = envelope.droplet.id, "Droplet accepted");

        Ok(DropletCreated {
            id: envelope.droplet.id,
            name: envelope.droplet.name,
        })
    }

    /// POST /floating_ips
    #[instrument(skip(self, request))]
    pub async fn create_floating_ip(
        &self,
        request: &FloatingIpCreateRequest,
    ) -> Result<FloatingIpCreated> {
        let envelope: FloatingIpEnvelope = self.post("floating_ips", request).await?;
        let ip = envelope.floating_ip;
        if ip.ip.is_empty() {
            return Err(DigitalOceanError::InvalidResponse(
                "floating IP response carried no address".to_string(),
            ));
        }
        debug!(ip = %ip.ip, "Floating IP reserved");

        Ok(FloatingIpCreated {
            ip: ip.ip,
            region: ip.region.map(|r| r.slug),
            droplet_id: ip.droplet.map(|d| d.id),
        })
    }

    /// POST /domains
    #[instrument(skip(self, request), fields(domain = %request.name))]
    pub async fn create_domain(&self, request: &DomainCreateRequest) -> Result<DomainCreated> {
        let envelope: DomainEnvelope = self.post("domains", request).await?;

        Ok(DomainCreated {
            name: envelope.domain.name,
        })
    }
}

#[async_trait]
impl ProviderClient for DigitalOceanClient {
    fn name(&self) -> &str {
        "digitalocean"
    }

    async fn create_droplet(
        &self,
        request: &DropletCreateRequest,
    ) -> std::result::Result<DropletCreated, ProviderError> {
        Ok(DigitalOceanClient::create_droplet(self, request).await?)
    }

    async fn create_floating_ip(
        &self,
        request: &FloatingIpCreateRequest,
    ) -> std::result::Result<FloatingIpCreated, ProviderError> {
        Ok(DigitalOceanClient::create_floating_ip(self, request).await?)
    }

    async fn create_domain(
        &self,
        request: &DomainCreateRequest,
    ) -> std::result::Result<DomainCreated, ProviderError> {
        Ok(DigitalOceanClient::create_domain(self, request).await?)
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiError {
    #[allow(dead_code)]
    id: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct DropletEnvelope {
    droplet: ApiDroplet,
}

#[derive(Debug, Deserialize)]
struct ApiDroplet {
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FloatingIpEnvelope {
    floating_ip: ApiFloatingIp,
}

#[derive(Debug, Deserialize)]
struct ApiFloatingIp {
    ip: String,
    #[serde(default)]
    region: Option<ApiRegion>,
    #[serde(default)]
    droplet: Option<ApiDroplet>,
}

#[derive(Debug, Deserialize)]
struct ApiRegion {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct DomainEnvelope {
    domain: ApiDomain,
}

#[derive(Debug, Deserialize)]
struct ApiDomain {
    name: String,
}
