//! Vendor error responses
//!
//! S3 reports errors as an XML `<Error>` document (or nothing at all for
//! `HEAD`), DynamoDB as a JSON object with a `__type` field. Both are folded
//! into [`ApiError`] so callers see one shape.

use reqwest::header::HeaderMap;
use serde::Deserialize;
use thiserror::Error;

/// Error codes that mean the addressed resource does not exist.
pub const NOT_FOUND_CODES: &[&str] = &["NotFound", "NoSuchBucket", "ResourceNotFoundException"];

/// A non-success response from an AWS API, with the vendor detail preserved.
#[derive(Debug, Clone, Error)]
#[error("{service} {operation} failed (HTTP {status}): {code}: {message}")]
pub struct ApiError {
    pub service: &'static str,
    pub operation: &'static str,
    pub status: u16,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    /// Structured not-found check: HTTP 404 or a known absence code.
    pub fn is_not_found(&self) -> bool {
        self.status == 404 || NOT_FOUND_CODES.contains(&self.code.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct XmlErrorBody {
    #[serde(rename = "Code", default)]
    code: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "RequestId", default)]
    request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Fallback code for responses that carry no body (S3 `HEAD`).
fn code_for_status(status: u16) -> String {
    match status {
        301 => "PermanentRedirect".to_string(),
        400 => "BadRequest".to_string(),
        403 => "Forbidden".to_string(),
        404 => "NotFound".to_string(),
        409 => "Conflict".to_string(),
        500 => "InternalError".to_string(),
        503 => "ServiceUnavailable".to_string(),
        other => format!("Http{}", other),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Build an [`ApiError`] from an S3 (REST-XML) error response.
pub fn from_xml_response(
    service: &'static str,
    operation: &'static str,
    status: u16,
    headers: &HeaderMap,
    body: &str,
) -> ApiError {
    let parsed = if body.trim().is_empty() {
        XmlErrorBody::default()
    } else {
        quick_xml::de::from_str::<XmlErrorBody>(body).unwrap_or_default()
    };

    ApiError {
        service,
        operation,
        status,
        code: parsed.code.unwrap_or_else(|| code_for_status(status)),
        message: parsed.message.unwrap_or_default(),
        request_id: parsed
            .request_id
            .or_else(|| header_str(headers, "x-amz-request-id")),
    }
}

/// Build an [`ApiError`] from a JSON-protocol (DynamoDB) error response.
pub fn from_json_response(
    service: &'static str,
    operation: &'static str,
    status: u16,
    headers: &HeaderMap,
    body: &str,
) -> ApiError {
    let parsed: JsonErrorBody = serde_json::from_str(body).unwrap_or_default();

    // "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException" -> "ResourceNotFoundException"
    let code = parsed
        .error_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| code_for_status(status));

    ApiError {
        service,
        operation,
        status,
        code,
        message: parsed.message.unwrap_or_default(),
        request_id: header_str(headers, "x-amzn-requestid"),
    }
}
