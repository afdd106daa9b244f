//! DigitalOcean provider for Stackform
//!
//! This crate implements the `ProviderClient` trait against the
//! DigitalOcean v2 REST API, enabling Stackform to create droplets,
//! floating IPs and domains.
//!
//! # Requirements
//!
//! - `DIGITALOCEAN_TOKEN`: personal access token with write scope
//!
//! # Example
//!
//! ```ignore
//! use stackform_cloud::{CreateStackRequest, StackEngine};
//! use stackform_cloud_digitalocean::{DigitalOceanClient, DigitalOceanConfig};
//! use std::sync::Arc;
//!
//! let client = DigitalOceanClient::new(DigitalOceanConfig::from_env()?)?;
//! let engine = StackEngine::new(Arc::new(client));
//!
//! let template = std::fs::read("stack.yaml")?;
//! let response = engine
//!     .create_stack(CreateStackRequest::new(template, "web"))
//!     .await?;
//! ```

pub mod client;
pub mod error;

pub use client::{DIGITALOCEAN_API_BASE, DigitalOceanClient, DigitalOceanConfig};
pub use error::{DigitalOceanError, Result};
