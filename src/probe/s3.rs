//! S3 bucket prober
//!
//! `HeadBucket` decides existence; `GetBucketTagging` supplies the tags.

use super::{classify, normalize, tags_value, ProbeResult, Prober};
use crate::aws::client::{AwsClient, S3_SERVICE};
use crate::context::ProbeContext;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Returned by `GetBucketTagging` when the bucket has no tags at all
const NO_TAG_SET: &str = "NoSuchTagSet";

#[derive(Debug, Deserialize)]
struct Tagging {
    #[serde(rename = "TagSet")]
    tag_set: TagSet,
}

#[derive(Debug, Default, Deserialize)]
struct TagSet {
    #[serde(rename = "Tag", default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value", default)]
    value: String,
}

/// Parse a `GetBucketTagging` response body
fn parse_tagging(body: &str) -> Result<BTreeMap<String, String>> {
    let tagging: Tagging = quick_xml::de::from_str(body)
        .map_err(|e| ProbeError::malformed(S3_SERVICE, format!("GetBucketTagging: {}", e)))?;

    Ok(tagging
        .tag_set
        .tags
        .into_iter()
        .map(|t| (t.key, t.value))
        .collect())
}

pub fn bucket_arn(partition: &str, bucket: &str) -> String {
    format!("arn:{}:s3:::{}", partition, bucket)
}

#[derive(Debug, Clone)]
pub struct S3Prober {
    client: AwsClient,
}

impl S3Prober {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    async fn fetch_tags(
        &self,
        ctx: &ProbeContext,
        bucket: &str,
    ) -> Result<BTreeMap<String, String>> {
        let response = match self
            .client
            .s3_request(ctx, "GetBucketTagging", Method::GET, bucket, Some("tagging"))
            .await
        {
            Ok(response) => response,
            Err(ProbeError::Api(e)) if e.code == NO_TAG_SET => {
                tracing::debug!("Bucket {} has no tag set", bucket);
                return Ok(BTreeMap::new());
            },
            Err(e) => return Err(e),
        };

        parse_tagging(&response.body)
    }
}

#[async_trait]
impl Prober for S3Prober {
    fn resource_type(&self) -> &'static str {
        normalize::S3_BUCKET
    }

    async fn probe(&self, ctx: &ProbeContext, id: &str) -> Result<ProbeResult> {
        let head = match self
            .client
            .s3_request(ctx, "HeadBucket", Method::HEAD, id, None)
            .await
        {
            Ok(head) => head,
            Err(e) if classify::is_not_found(&e) => {
                tracing::info!("Bucket {} does not exist", id);
                return Ok(ProbeResult::not_found());
            },
            Err(e) => {
                tracing::warn!("HeadBucket {} failed: {}", id, e);
                return Err(e);
            },
        };

        let region = head.header("x-amz-bucket-region").map(|r| r.to_string());
        let tags = self.fetch_tags(ctx, id).await?;

        let mut properties = Map::new();
        properties.insert("BucketName".to_string(), Value::String(id.to_string()));
        if let Some(region) = region {
            properties.insert("Region".to_string(), Value::String(region));
        }
        properties.insert("Tags".to_string(), tags_value(&tags));

        tracing::info!("Bucket {} exists ({} tags)", id, tags.len());
        Ok(ProbeResult::found(
            bucket_arn(self.client.partition(), id),
            tags,
            properties,
        ))
    }
}
