//! Resource probing
//!
//! A [`Prober`] answers one question for one resource kind: does the
//! resource with this identifier exist, and if so what are its ARN, tags and
//! properties.
//!
//! # Architecture
//!
//! - [`normalize`] - Maps the three type-name conventions onto one canonical key
//! - [`classify`] - Decides whether a vendor error means "does not exist"
//! - [`registry`] - Lazily builds and caches one prober per canonical key
//! - [`s3`] / [`dynamodb`] - The dedicated probers
//! - [`cloudcontrol`] - Generic fallback for any CloudFormation type
//!
//! # Example
//!
//! ```ignore
//! use cloudprobe::{AwsClient, ClientConfig, ProbeContext, ProberRegistry};
//!
//! async fn example() -> cloudprobe::Result<()> {
//!     let registry = ProberRegistry::new(AwsClient::new(ClientConfig::localstack())?);
//!     let result = registry
//!         .probe(&ProbeContext::new(), "AWS::S3::Bucket", "my-bucket")
//!         .await?;
//!     println!("exists: {}", result.exists());
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod cloudcontrol;
pub mod dynamodb;
pub mod normalize;
pub mod registry;
pub mod s3;

use crate::context::ProbeContext;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use classify::{is_not_found, is_not_found_message};
pub use normalize::normalize_type_name;
pub use registry::ProberRegistry;

/// Outcome of a probe.
///
/// A not-found result carries no ARN, tags or properties; the only way to
/// build one is [`ProbeResult::not_found`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeResult {
    exists: bool,
    arn: String,
    tags: BTreeMap<String, String>,
    properties: Map<String, Value>,
}

impl ProbeResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(
        arn: impl Into<String>,
        tags: BTreeMap<String, String>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            exists: true,
            arn: arn.into(),
            tags,
            properties,
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Empty when the resource does not exist
    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Tag map as a JSON object, for the `Tags` property
pub(crate) fn tags_value(tags: &BTreeMap<String, String>) -> Value {
    Value::Object(
        tags.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Existence check for one resource kind.
#[async_trait]
pub trait Prober: Send + Sync + std::fmt::Debug {
    /// Canonical type key this prober serves
    fn resource_type(&self) -> &'static str;

    /// Probe the resource identified by `id` (bucket name, table name, ...).
    ///
    /// A confirmed absence is `Ok(ProbeResult::not_found())`. Every other
    /// failure is an error and no result should be read.
    async fn probe(&self, ctx: &ProbeContext, id: &str) -> Result<ProbeResult>;
}
