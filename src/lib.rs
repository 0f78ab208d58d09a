//! cloudprobe - check whether AWS resources exist
//!
//! Give it a resource type in Terraform (`aws_s3_bucket`), Cloud Control
//! (`AWS::S3::Bucket`) or short (`s3_bucket`) form plus an identifier, and
//! it reports whether the resource exists along with its ARN, tags and
//! properties.
//!
//! # Module Structure
//!
//! - [`aws`] - Credentials, SigV4 signing and the HTTP client
//! - [`probe`] - Type normalization, the prober registry and the probers
//! - [`config`] - Client configuration and persisted CLI defaults
//! - [`context`] - Cancellation and deadlines for vendor calls
//! - [`error`] - The [`ProbeError`] taxonomy

pub mod aws;
pub mod config;
pub mod context;
pub mod error;
pub mod probe;

pub use aws::client::AwsClient;
pub use config::ClientConfig;
pub use context::ProbeContext;
pub use error::{ProbeError, Result};
pub use probe::{normalize_type_name, ProbeResult, Prober, ProberRegistry};
