//! AWS API interaction module
//!
//! This module provides the plumbing the probers sit on: credentials,
//! SigV4 request signing, the HTTP client and vendor error decoding.
//!
//! # Module Structure
//!
//! - [`auth`] - Credentials from the AWS default provider chain, with caching
//! - [`client`] - Main AWS client for making signed API requests
//! - [`error`] - Decoding of S3 (XML) and JSON-protocol (DynamoDB, Cloud Control) error responses
//! - [`http`] - HTTP utilities with cancellation and deadline support
//! - [`sigv4`] - AWS Signature Version 4 via `aws-sigv4`
//!
//! # Example
//!
//! ```ignore
//! use cloudprobe::aws::client::AwsClient;
//! use cloudprobe::config::ClientConfig;
//!
//! async fn example() -> cloudprobe::Result<()> {
//!     let client = AwsClient::new(ClientConfig::localstack())?;
//!     let ctx = cloudprobe::ProbeContext::new();
//!     client.s3_request(&ctx, "HeadBucket", reqwest::Method::HEAD, "my-bucket", None).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod sigv4;
