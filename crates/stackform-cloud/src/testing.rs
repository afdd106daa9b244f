//! In-memory provider for tests

use crate::error::ProviderError;
use crate::provider::{DomainCreated, DropletCreated, FloatingIpCreated, ProviderClient};
use crate::resource::{DomainCreateRequest, DropletCreateRequest, FloatingIpCreateRequest};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A call received by [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordedRequest {
    Droplet(DropletCreateRequest),
    FloatingIp(FloatingIpCreateRequest),
    Domain(DomainCreateRequest),
}

/// Records every create call and answers with canned IDs
///
/// Droplets get sequential IDs starting at 1 unless a fixed ID was
/// configured for their name. Floating IPs are handed out from 10.0.0.0/24.
pub(crate) struct RecordingProvider {
    requests: Mutex<Vec<RecordedRequest>>,
    droplet_ids: HashMap<String, u64>,
    failing_droplets: HashSet<String>,
    next_id: AtomicU64,
}

impl RecordingProvider {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            droplet_ids: HashMap::new(),
            failing_droplets: HashSet::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn with_droplet_id(mut self, name: &str, id: u64) -> Self {
        self.droplet_ids.insert(name.to_string(), id);
        self
    }

    /// Reject droplets with this name
    pub(crate) fn fail_droplet(mut self, name: &str) -> Self {
        self.failing_droplets.insert(name.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn droplet_requests(&self) -> Vec<DropletCreateRequest> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                RecordedRequest::Droplet(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn floating_ip_requests(&self) -> Vec<FloatingIpCreateRequest> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                RecordedRequest::FloatingIp(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl ProviderClient for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_droplet(
        &self,
        request: &DropletCreateRequest,
    ) -> Result<DropletCreated, ProviderError> {
        self.record(RecordedRequest::Droplet(request.clone()));

        if self.failing_droplets.contains(&request.name) {
            return Err(ProviderError::Api {
                status: 422,
                message: format!("droplet {} rejected", request.name),
            });
        }

        let id = match self.droplet_ids.get(&request.name) {
            Some(id) => *id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        Ok(DropletCreated {
            id,
            name: request.name.clone(),
        })
    }

    async fn create_floating_ip(
        &self,
        request: &FloatingIpCreateRequest,
    ) -> Result<FloatingIpCreated, ProviderError> {
        self.record(RecordedRequest::FloatingIp(request.clone()));

        let host = self.next_id.fetch_add(1, Ordering::SeqCst) % 256;
        Ok(FloatingIpCreated {
            ip: format!("10.0.0.{}", host),
            region: request.region.clone(),
            droplet_id: request.droplet_id,
        })
    }

    async fn create_domain(
        &self,
        request: &DomainCreateRequest,
    ) -> Result<DomainCreated, ProviderError> {
        self.record(RecordedRequest::Domain(request.clone()));
        Ok(DomainCreated {
            name: request.name.clone(),
        })
    }
}
