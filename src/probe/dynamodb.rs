//! DynamoDB table prober
//!
//! `DescribeTable` decides existence and supplies the properties; tags come
//! from `ListTagsOfResource`, which is paginated.

use super::{classify, normalize, tags_value, ProbeResult, Prober};
use crate::aws::client::{AwsClient, DYNAMODB_SERVICE};
use crate::context::ProbeContext;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// DynamoDB caps a table at 50 tags, so this is far beyond any real listing
const MAX_TAG_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTableOutput {
    table: Option<TableDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TableDescription {
    table_name: String,
    table_arn: String,
    table_id: Option<String>,
    table_status: Option<String>,
    item_count: Option<i64>,
    table_size_bytes: Option<i64>,
    key_schema: Option<Value>,
    attribute_definitions: Option<Value>,
    billing_mode_summary: Option<BillingModeSummary>,
    provisioned_throughput: Option<Value>,
    /// Epoch seconds
    creation_date_time: Option<f64>,
    deletion_protection_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BillingModeSummary {
    billing_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListTagsOutput {
    #[serde(default)]
    tags: Vec<TagEntry>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagEntry {
    key: String,
    #[serde(default)]
    value: String,
}

fn parse_describe(body: Value) -> Result<TableDescription> {
    let output: DescribeTableOutput = serde_json::from_value(body)
        .map_err(|e| ProbeError::malformed(DYNAMODB_SERVICE, format!("DescribeTable: {}", e)))?;

    output
        .table
        .ok_or_else(|| ProbeError::malformed(DYNAMODB_SERVICE, "DescribeTable: missing Table"))
}

fn epoch_to_rfc3339(epoch: f64) -> Option<String> {
    let secs = epoch.trunc() as i64;
    let nanos = ((epoch.fract()) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn table_properties(table: &TableDescription) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("TableName".to_string(), json!(table.table_name));
    props.insert("TableArn".to_string(), json!(table.table_arn));

    if let Some(id) = &table.table_id {
        props.insert("TableId".to_string(), json!(id));
    }
    if let Some(status) = &table.table_status {
        props.insert("TableStatus".to_string(), json!(status));
    }
    if let Some(count) = table.item_count {
        props.insert("ItemCount".to_string(), json!(count));
    }
    if let Some(size) = table.table_size_bytes {
        props.insert("TableSizeBytes".to_string(), json!(size));
    }
    if let Some(schema) = &table.key_schema {
        props.insert("KeySchema".to_string(), schema.clone());
    }
    if let Some(defs) = &table.attribute_definitions {
        props.insert("AttributeDefinitions".to_string(), defs.clone());
    }
    if let Some(mode) = table
        .billing_mode_summary
        .as_ref()
        .and_then(|s| s.billing_mode.as_ref())
    {
        props.insert("BillingMode".to_string(), json!(mode));
    }
    if let Some(throughput) = &table.provisioned_throughput {
        props.insert("ProvisionedThroughput".to_string(), throughput.clone());
    }
    if let Some(created) = table.creation_date_time.and_then(epoch_to_rfc3339) {
        props.insert("CreationDateTime".to_string(), json!(created));
    }
    if let Some(protected) = table.deletion_protection_enabled {
        props.insert("DeletionProtectionEnabled".to_string(), json!(protected));
    }

    props
}

#[derive(Debug, Clone)]
pub struct DynamoDbProber {
    client: AwsClient,
}

impl DynamoDbProber {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    async fn fetch_tags(&self, ctx: &ProbeContext, arn: &str) -> Result<BTreeMap<String, String>> {
        let mut tags = BTreeMap::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_TAG_PAGES {
            let mut input = json!({ "ResourceArn": arn });
            if let Some(token) = &next_token {
                input["NextToken"] = json!(token);
            }

            let body = self
                .client
                .dynamodb_call(ctx, "ListTagsOfResource", &input)
                .await?;
            let page: ListTagsOutput = serde_json::from_value(body).map_err(|e| {
                ProbeError::malformed(DYNAMODB_SERVICE, format!("ListTagsOfResource: {}", e))
            })?;

            tags.extend(page.tags.into_iter().map(|t| (t.key, t.value)));

            match page.next_token {
                Some(token) if !token.is_empty() => {
                    if next_token.as_deref() == Some(token.as_str()) {
                        return Err(ProbeError::malformed(
                            DYNAMODB_SERVICE,
                            "ListTagsOfResource: repeated NextToken",
                        ));
                    }
                    next_token = Some(token);
                },
                _ => return Ok(tags),
            }
        }

        Err(ProbeError::malformed(
            DYNAMODB_SERVICE,
            format!("ListTagsOfResource: more than {} pages", MAX_TAG_PAGES),
        ))
    }
}

#[async_trait]
impl Prober for DynamoDbProber {
    fn resource_type(&self) -> &'static str {
        normalize::DYNAMODB_TABLE
    }

    async fn probe(&self, ctx: &ProbeContext, id: &str) -> Result<ProbeResult> {
        let body = match self
            .client
            .dynamodb_call(ctx, "DescribeTable", &json!({ "TableName": id }))
            .await
        {
            Ok(body) => body,
            Err(e) if classify::is_not_found(&e) => {
                tracing::info!("Table {} does not exist", id);
                return Ok(ProbeResult::not_found());
            },
            Err(e) => {
                tracing::warn!("DescribeTable {} failed: {}", id, e);
                return Err(e);
            },
        };

        let table = parse_describe(body)?;
        let tags = self.fetch_tags(ctx, &table.table_arn).await?;

        let mut properties = table_properties(&table);
        properties.insert("Tags".to_string(), tags_value(&tags));

        tracing::info!(
            "Table {} exists (status {})",
            id,
            table.table_status.as_deref().unwrap_or("unknown")
        );
        Ok(ProbeResult::found(table.table_arn, tags, properties))
    }
}
