//! AWS Signature Version 4
//!
//! Thin adapter over `aws-sigv4`: takes our request parts, returns the
//! headers to add.

use crate::error::{ProbeError, Result};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningSettings,
    UriPathNormalizationMode,
};
use aws_sigv4::sign::v4;
use std::time::SystemTime;
use url::Url;

/// Scope of a signature
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: SystemTime,
}

/// S3 signs the payload hash into `x-amz-content-sha256` and takes object
/// paths literally; every other service uses the defaults.
fn settings_for(service: &str) -> SigningSettings {
    let mut settings = SigningSettings::default();
    if service == "s3" {
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        settings.percent_encoding_mode = PercentEncodingMode::Single;
        settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;
    }
    settings
}

fn signing_error(err: impl std::fmt::Display) -> ProbeError {
    ProbeError::Signing(err.to_string())
}

/// Sign a request and return the headers to add to it
/// (`x-amz-date`, `authorization`, and the session token or payload hash when needed).
pub fn sign_request(
    method: &str,
    url: &Url,
    headers: &[(String, String)],
    body: &[u8],
    params: &SigningParams<'_>,
) -> Result<Vec<(String, String)>> {
    let identity = params.credentials.clone().into();
    let v4_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(params.region)
        .name(params.service)
        .time(params.time)
        .settings(settings_for(params.service))
        .build()
        .map_err(signing_error)?;
    let signing_params = v4_params.into();

    let request = SignableRequest::new(
        method,
        url.as_str(),
        headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        SignableBody::Bytes(body),
    )
    .map_err(signing_error)?;

    let (instructions, _signature) = sign(request, &signing_params)
        .map_err(signing_error)?
        .into_parts();

    Ok(instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}
