//! AWS Client
//!
//! Main client for interacting with AWS APIs, combining credentials,
//! request signing and the HTTP layer. Cheap to clone; every prober holds
//! its own clone.

use super::error::{self as api_error};
use super::http::{AwsHttpClient, AwsRequest, AwsResponse};
use super::sigv4::{self, SigningParams};
use crate::config::ClientConfig;
use crate::context::ProbeContext;
use crate::error::{ProbeError, Result};
use reqwest::Method;
use serde_json::Value;
use std::time::SystemTime;
use url::Url;

pub const S3_SERVICE: &str = "s3";
pub const DYNAMODB_SERVICE: &str = "dynamodb";
pub const CLOUDCONTROL_SERVICE: &str = "cloudcontrolapi";

const JSON_1_0_CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// A service speaking the `awsJson1_0` protocol: POST to `/` with the
/// operation named in `x-amz-target`
#[derive(Debug, Clone, Copy)]
struct JsonService {
    /// Signing name and endpoint prefix
    name: &'static str,
    target_prefix: &'static str,
}

const DYNAMODB: JsonService = JsonService {
    name: DYNAMODB_SERVICE,
    target_prefix: "DynamoDB_20120810",
};

const CLOUDCONTROL: JsonService = JsonService {
    name: CLOUDCONTROL_SERVICE,
    target_prefix: "CloudApiService",
};

/// ARN partition for a region
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else {
        "aws"
    }
}

fn dns_suffix(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    }
}

/// Main AWS client
#[derive(Clone)]
pub struct AwsClient {
    config: ClientConfig,
    endpoint: Option<Url>,
    http: AwsHttpClient,
}

impl std::fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AwsClient {
    /// Create a new AWS client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| {
                Url::parse(e).map_err(|err| ProbeError::InvalidEndpoint(format!("{}: {}", e, err)))
            })
            .transpose()?;

        let http = AwsHttpClient::new()?;

        Ok(Self {
            config,
            endpoint,
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    pub fn partition(&self) -> &'static str {
        partition_for_region(&self.config.region)
    }

    // =========================================================================
    // Endpoint helpers
    // =========================================================================

    fn service_base(&self, service: &str) -> Result<Url> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        let url = format!(
            "https://{}.{}.{}/",
            service,
            self.config.region,
            dns_suffix(&self.config.region)
        );
        Url::parse(&url).map_err(|e| ProbeError::InvalidEndpoint(format!("{}: {}", url, e)))
    }

    /// Build the URL addressing a bucket, path-style or virtual-hosted
    pub fn s3_bucket_url(&self, bucket: &str, query: Option<&str>) -> Result<Url> {
        let mut url = self.service_base(S3_SERVICE)?;

        // Dotted names break TLS wildcard matching on virtual-hosted URLs
        let path_style = self.config.force_path_style || bucket.contains('.');
        if path_style {
            let base = url.to_string();
            url.path_segments_mut()
                .map_err(|_| ProbeError::InvalidEndpoint(base))?
                .pop_if_empty()
                .push(bucket);
        } else {
            let host = url.host_str().unwrap_or_default().to_string();
            url.set_host(Some(&format!("{}.{}", bucket, host)))
                .map_err(|e| ProbeError::InvalidEndpoint(format!("{}: {}", bucket, e)))?;
        }

        url.set_query(query);
        Ok(url)
    }

    pub fn dynamodb_url(&self) -> Result<Url> {
        self.service_base(DYNAMODB_SERVICE)
    }

    pub fn cloudcontrol_url(&self) -> Result<Url> {
        self.service_base(CLOUDCONTROL_SERVICE)
    }

    // =========================================================================
    // Signed requests
    // =========================================================================

    /// Sign and send a request; the response status is not checked
    pub async fn send_signed(
        &self,
        ctx: &ProbeContext,
        service: &'static str,
        method: Method,
        url: Url,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<AwsResponse> {
        let provider = self
            .config
            .credentials
            .as_ref()
            .ok_or(ProbeError::MissingCredentials)?;
        let credentials = ctx.run(provider.get()).await??;

        let params = SigningParams {
            credentials: &credentials,
            region: &self.config.region,
            service,
            time: SystemTime::now(),
        };
        let signature = sigv4::sign_request(method.as_str(), &url, &headers, &body, &params)?;

        let mut headers = headers;
        headers.extend(signature);
        headers.push((
            "amz-sdk-invocation-id".to_string(),
            uuid::Uuid::new_v4().to_string(),
        ));

        self.http
            .execute(
                ctx,
                AwsRequest {
                    method,
                    url,
                    headers,
                    body,
                },
            )
            .await
    }

    /// Call an S3 bucket operation; non-2xx responses become [`ApiError`](super::error::ApiError)s
    pub async fn s3_request(
        &self,
        ctx: &ProbeContext,
        operation: &'static str,
        method: Method,
        bucket: &str,
        query: Option<&str>,
    ) -> Result<AwsResponse> {
        let url = self.s3_bucket_url(bucket, query)?;
        let response = self
            .send_signed(ctx, S3_SERVICE, method, url, Vec::new(), Vec::new())
            .await?;

        if !response.status.is_success() {
            return Err(api_error::from_xml_response(
                S3_SERVICE,
                operation,
                response.status.as_u16(),
                &response.headers,
                &response.body,
            )
            .into());
        }

        Ok(response)
    }

    /// Call a DynamoDB operation and parse the response body
    pub async fn dynamodb_call(
        &self,
        ctx: &ProbeContext,
        operation: &'static str,
        input: &Value,
    ) -> Result<Value> {
        self.json_call(ctx, DYNAMODB, operation, input).await
    }

    /// Call a Cloud Control API operation and parse the response body
    pub async fn cloudcontrol_call(
        &self,
        ctx: &ProbeContext,
        operation: &'static str,
        input: &Value,
    ) -> Result<Value> {
        self.json_call(ctx, CLOUDCONTROL, operation, input).await
    }

    async fn json_call(
        &self,
        ctx: &ProbeContext,
        service: JsonService,
        operation: &'static str,
        input: &Value,
    ) -> Result<Value> {
        let url = self.service_base(service.name)?;
        let body = serde_json::to_vec(input)
            .map_err(|e| ProbeError::malformed(service.name, e.to_string()))?;
        let headers = vec![
            ("content-type".to_string(), JSON_1_0_CONTENT_TYPE.to_string()),
            (
                "x-amz-target".to_string(),
                format!("{}.{}", service.target_prefix, operation),
            ),
        ];

        let response = self
            .send_signed(ctx, service.name, Method::POST, url, headers, body)
            .await?;

        if !response.status.is_success() {
            return Err(api_error::from_json_response(
                service.name,
                operation,
                response.status.as_u16(),
                &response.headers,
                &response.body,
            )
            .into());
        }

        serde_json::from_str(&response.body).map_err(|e| {
            ProbeError::malformed(service.name, format!("{} response: {}", operation, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(config: ClientConfig) -> AwsClient {
        AwsClient::new(config).unwrap()
    }

    #[test]
    fn test_partition_for_region() {
        assert_eq!(partition_for_region("us-east-1"), "aws");
        assert_eq!(partition_for_region("cn-north-1"), "aws-cn");
        assert_eq!(partition_for_region("us-gov-west-1"), "aws-us-gov");
    }

    #[test]
    fn test_virtual_hosted_bucket_url() {
        let c = client(ClientConfig::new("eu-west-1"));
        let url = c.s3_bucket_url("my-bucket", None).unwrap();
        assert_eq!(url.as_str(), "https://my-bucket.s3.eu-west-1.amazonaws.com/");

        let url = c.s3_bucket_url("my-bucket", Some("tagging")).unwrap();
        assert_eq!(url.as_str(), "https://my-bucket.s3.eu-west-1.amazonaws.com/?tagging");
    }

    #[test]
    fn test_dotted_bucket_falls_back_to_path_style() {
        let c = client(ClientConfig::new("us-east-1"));
        let url = c.s3_bucket_url("logs.example.com", None).unwrap();
        assert_eq!(url.as_str(), "https://s3.us-east-1.amazonaws.com/logs.example.com");
    }

    #[test]
    fn test_custom_endpoint_uses_path_style() {
        let c = client(ClientConfig::localstack());
        let url = c.s3_bucket_url("probe-test", Some("tagging")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4566/probe-test?tagging");

        let url = c.dynamodb_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:4566/");
        assert_eq!(c.cloudcontrol_url().unwrap(), url);
    }

    #[test]
    fn test_cloudcontrol_endpoint() {
        let c = client(ClientConfig::new("eu-central-1"));
        assert_eq!(
            c.cloudcontrol_url().unwrap().as_str(),
            "https://cloudcontrolapi.eu-central-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_china_region_endpoints() {
        let c = client(ClientConfig::new("cn-north-1"));
        assert_eq!(
            c.dynamodb_url().unwrap().as_str(),
            "https://dynamodb.cn-north-1.amazonaws.com.cn/"
        );
        assert_eq!(c.partition(), "aws-cn");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let err = AwsClient::new(ClientConfig::new("us-east-1").with_endpoint("not a url"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let c = client(ClientConfig::new("us-east-1"));
        let err = c
            .s3_request(&ProbeContext::new(), "HeadBucket", Method::HEAD, "b", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::MissingCredentials));
    }
}
