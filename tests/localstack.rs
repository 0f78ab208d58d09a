//! Tests against a running LocalStack instance
//!
//! Each test returns early when nothing answers at localhost:4566, so the
//! suite stays green on machines without the emulator.

use cloudprobe::{AwsClient, ClientConfig, ProbeContext, ProberRegistry};
use reqwest::Method;
use std::time::Duration;

/// Check if LocalStack is available at localhost:4566
async fn localstack_running() -> bool {
    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
    else {
        return false;
    };

    match client
        .get("http://localhost:4566/_localstack/health")
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

fn localstack_client() -> AwsClient {
    AwsClient::new(ClientConfig::localstack()).expect("client should build")
}

#[tokio::test]
async fn test_localstack_bucket_not_found() {
    if !localstack_running().await {
        eprintln!("Skipping: LocalStack not running");
        return;
    }

    let registry = ProberRegistry::new(localstack_client());
    let result = registry
        .probe(
            &ProbeContext::new(),
            "aws_s3_bucket",
            "nonexistent-bucket-terraform-syntax-12345",
        )
        .await
        .expect("not found is not an error");

    assert!(!result.exists());
}

#[tokio::test]
async fn test_localstack_bucket_exists() {
    if !localstack_running().await {
        eprintln!("Skipping: LocalStack not running");
        return;
    }

    let client = localstack_client();
    let ctx = ProbeContext::new();
    let bucket = "probe-acceptance-test-bucket";

    let url = client.s3_bucket_url(bucket, None).unwrap();
    let created = client
        .send_signed(&ctx, "s3", Method::PUT, url.clone(), Vec::new(), Vec::new())
        .await
        .expect("create bucket request");
    assert!(created.status.is_success(), "CreateBucket: {}", created.status);

    let registry = ProberRegistry::new(client.clone());
    let result = registry.probe(&ctx, "AWS::S3::Bucket", bucket).await;

    // Clean up before asserting
    let _ = client
        .send_signed(&ctx, "s3", Method::DELETE, url, Vec::new(), Vec::new())
        .await;

    let result = result.expect("probe should succeed");
    assert!(result.exists());
    assert_eq!(result.arn(), format!("arn:aws:s3:::{}", bucket));
    assert_eq!(
        result.property("BucketName").and_then(|v| v.as_str()),
        Some(bucket)
    );
}

#[tokio::test]
async fn test_localstack_table_not_found() {
    if !localstack_running().await {
        eprintln!("Skipping: LocalStack not running");
        return;
    }

    let registry = ProberRegistry::new(localstack_client());
    let result = registry
        .probe(
            &ProbeContext::new(),
            "AWS::DynamoDB::Table",
            "nonexistent-table-that-does-not-exist-12345",
        )
        .await
        .expect("not found is not an error");

    assert!(!result.exists());
}
