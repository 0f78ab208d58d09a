//! AWS Authentication
//!
//! Credentials come from the AWS default provider chain (environment,
//! shared config and credentials files, SSO, web identity, ECS and IMDS) or
//! from a static key pair for LocalStack and tests.

use crate::error::{ProbeError, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Refresh credentials this long before they expire, so a request never
/// goes out signed with a key that dies mid-flight
const CREDENTIALS_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Provider name reported for static key pairs
const STATIC_PROVIDER_NAME: &str = "cloudprobe-static";

/// Credentials provider with caching
#[derive(Clone)]
pub struct AwsCredentials {
    provider: SharedCredentialsProvider,
    cache: Arc<RwLock<Option<Credentials>>>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

fn is_fresh(credentials: &Credentials) -> bool {
    match credentials.expiry() {
        Some(expiry) => SystemTime::now() + CREDENTIALS_EXPIRY_BUFFER < expiry,
        None => true,
    }
}

impl AwsCredentials {
    pub fn from_provider(provider: impl ProvideCredentials + 'static) -> Self {
        Self::from_shared(SharedCredentialsProvider::new(provider))
    }

    pub fn from_shared(provider: SharedCredentialsProvider) -> Self {
        Self {
            provider,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// A fixed key pair (LocalStack, mock servers)
    pub fn from_static(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::from_provider(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_PROVIDER_NAME,
        ))
    }

    /// Get credentials for signing a request
    /// Security: Checks expiry before returning cached credentials
    pub async fn get(&self) -> Result<Credentials> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if is_fresh(cached) {
                    return Ok(cached.clone());
                }
                tracing::debug!("Cached credentials expired, refreshing");
            }
        }

        let credentials = self
            .provider
            .provide_credentials()
            .await
            .map_err(credentials_error)?;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(credentials.clone());
        }

        tracing::debug!(
            "Loaded credentials for {} (expiry: {:?})",
            credentials.access_key_id(),
            credentials.expiry()
        );
        Ok(credentials)
    }

    /// Drop cached credentials so the next request reloads them
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

fn credentials_error(err: CredentialsError) -> ProbeError {
    if let CredentialsError::CredentialsNotLoaded(_) = err {
        return ProbeError::MissingCredentials;
    }

    // The provider's own reason sits in the source chain
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ProbeError::Credentials(message)
}

/// Load the shared AWS configuration, optionally for a named profile.
///
/// Honors `AWS_PROFILE`, `AWS_REGION`, `~/.aws/config` and
/// `~/.aws/credentials` the same way the AWS CLI does.
pub async fn load_sdk_config(profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        tracing::debug!("Using AWS profile '{}'", profile);
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

/// Region and credentials discovered by the default chain
pub async fn discover(profile: Option<&str>) -> (Option<String>, Option<AwsCredentials>) {
    let sdk_config = load_sdk_config(profile).await;
    let region = sdk_config.region().map(|r| r.to_string());
    let credentials = sdk_config
        .credentials_provider()
        .map(|provider| AwsCredentials::from_shared(provider.clone()));
    (region, credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::provider::future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out a fresh key pair on every call and counts the calls
    #[derive(Debug)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        expires_in: Option<Duration>,
    }

    impl ProvideCredentials for Counting {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let expiry = self.expires_in.map(|d| SystemTime::now() + d);
            future::ProvideCredentials::ready(Ok(Credentials::new(
                format!("AKID{}", n),
                "secret",
                None,
                expiry,
                "counting",
            )))
        }
    }

    #[derive(Debug)]
    struct Empty;

    impl ProvideCredentials for Empty {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err(CredentialsError::not_loaded("no providers in chain")))
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl ProvideCredentials for Broken {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err(CredentialsError::provider_error("sso token expired")))
        }
    }

    fn counting(expires_in: Option<Duration>) -> (AwsCredentials, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let creds = AwsCredentials::from_provider(Counting {
            calls: Arc::clone(&calls),
            expires_in,
        });
        (creds, calls)
    }

    #[tokio::test]
    async fn test_static_credentials() {
        let creds = AwsCredentials::from_static("AKID", "secret", Some("token".to_string()));
        let loaded = creds.get().await.unwrap();
        assert_eq!(loaded.access_key_id(), "AKID");
        assert_eq!(loaded.secret_access_key(), "secret");
        assert_eq!(loaded.session_token(), Some("token"));
    }

    #[tokio::test]
    async fn test_credentials_are_cached() {
        let (creds, calls) = counting(Some(Duration::from_secs(3600)));
        let first = creds.get().await.unwrap();
        let second = creds.get().await.unwrap();
        assert_eq!(first.access_key_id(), second.access_key_id());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        creds.invalidate().await;
        assert_eq!(creds.get().await.unwrap().access_key_id(), "AKID1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_nearly_expired_credentials_are_refreshed() {
        let (creds, calls) = counting(Some(Duration::from_secs(60)));
        creds.get().await.unwrap();
        creds.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_chain_is_missing_credentials() {
        let err = AwsCredentials::from_provider(Empty).get().await.unwrap_err();
        assert!(matches!(err, ProbeError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let err = AwsCredentials::from_provider(Broken).get().await.unwrap_err();
        match err {
            ProbeError::Credentials(msg) => assert!(msg.contains("sso token expired"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = AwsCredentials::from_static("AKID", "supersecret", None);
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("supersecret"));
    }
}
