//! Generic prober backed by the Cloud Control API
//!
//! Kinds without a dedicated prober are probed with `GetResource`, which
//! takes a CloudFormation type name (`AWS::Lambda::Function`) and the
//! resource's primary identifier. Properties come back as a JSON document
//! in whatever shape the resource schema defines.

use super::{classify, normalize, ProbeResult};
use crate::aws::client::{AwsClient, CLOUDCONTROL_SERVICE};
use crate::context::ProbeContext;
use crate::error::{ProbeError, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Terraform-style keys whose CloudFormation name cannot be recovered by
/// re-casing (`aws_iam_role` is `AWS::IAM::Role`, not `AWS::Iam::Role`)
const CLOUD_CONTROL_TYPES: &[(&str, &str)] = &[
    (normalize::DYNAMODB_TABLE, "AWS::DynamoDB::Table"),
    (normalize::S3_BUCKET, "AWS::S3::Bucket"),
    ("aws_cloudwatch_log_group", "AWS::Logs::LogGroup"),
    ("aws_ecr_repository", "AWS::ECR::Repository"),
    ("aws_ecs_cluster", "AWS::ECS::Cluster"),
    ("aws_iam_role", "AWS::IAM::Role"),
    ("aws_kinesis_stream", "AWS::Kinesis::Stream"),
    ("aws_kms_key", "AWS::KMS::Key"),
    ("aws_lambda_function", "AWS::Lambda::Function"),
    ("aws_secretsmanager_secret", "AWS::SecretsManager::Secret"),
    ("aws_sns_topic", "AWS::SNS::Topic"),
    ("aws_sqs_queue", "AWS::SQS::Queue"),
    ("aws_ssm_parameter", "AWS::SSM::Parameter"),
];

/// CloudFormation type name to send to Cloud Control for `type_name`.
///
/// A `Namespace::Service::Resource` name is used exactly as given; any other
/// spelling must normalize to a key in the mapping table.
pub fn cloud_control_type_name(type_name: &str) -> Option<String> {
    let segments: Vec<&str> = type_name.split("::").collect();
    if segments.len() == 3 && segments.iter().all(|s| !s.is_empty()) {
        return Some(type_name.to_string());
    }

    let key = normalize::normalize_type_name(type_name);
    CLOUD_CONTROL_TYPES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| name.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetResourceOutput {
    resource_description: Option<ResourceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceDescription {
    /// JSON document, serialized as a string
    properties: Option<String>,
}

fn parse_properties(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProbeError::malformed(
            CLOUDCONTROL_SERVICE,
            "GetResource: Properties is not a JSON object",
        )),
        Err(e) => Err(ProbeError::malformed(
            CLOUDCONTROL_SERVICE,
            format!("GetResource Properties: {}", e),
        )),
    }
}

/// Tags as most schemas define them: a `[{Key, Value}]` list, or a plain
/// string map for the few that don't
fn extract_tags(properties: &Map<String, Value>) -> BTreeMap<String, String> {
    match properties.get("Tags") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let key = entry.get("Key")?.as_str()?;
                let value = entry.get("Value").and_then(Value::as_str).unwrap_or_default();
                Some((key.to_string(), value.to_string()))
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Some schemas (and LocalStack) omit the ARN; it is then left empty
fn extract_arn(properties: &Map<String, Value>) -> String {
    properties
        .get("Arn")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct CloudControlProber {
    client: AwsClient,
}

impl CloudControlProber {
    pub fn new(client: AwsClient) -> Self {
        Self { client }
    }

    /// Probe `identifier` as a resource of CloudFormation type `type_name`
    pub async fn probe(
        &self,
        ctx: &ProbeContext,
        type_name: &str,
        identifier: &str,
    ) -> Result<ProbeResult> {
        let input = json!({ "TypeName": type_name, "Identifier": identifier });
        let body = match self.client.cloudcontrol_call(ctx, "GetResource", &input).await {
            Ok(body) => body,
            Err(e) if classify::is_not_found(&e) => {
                tracing::info!("{} {} does not exist", type_name, identifier);
                return Ok(ProbeResult::not_found());
            },
            Err(e) => {
                tracing::warn!("GetResource {} {} failed: {}", type_name, identifier, e);
                return Err(e);
            },
        };

        let output: GetResourceOutput = serde_json::from_value(body).map_err(|e| {
            ProbeError::malformed(CLOUDCONTROL_SERVICE, format!("GetResource: {}", e))
        })?;
        let description = output.resource_description.ok_or_else(|| {
            ProbeError::malformed(CLOUDCONTROL_SERVICE, "GetResource: missing ResourceDescription")
        })?;

        let properties = match description.properties.as_deref() {
            Some(raw) => parse_properties(raw)?,
            None => Map::new(),
        };
        let tags = extract_tags(&properties);
        let arn = extract_arn(&properties);

        tracing::info!("{} {} exists", type_name, identifier);
        Ok(ProbeResult::found(arn, tags, properties))
    }
}
