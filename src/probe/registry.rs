//! Prober Registry - one lazily built prober per resource kind
//!
//! The set of kinds is fixed when the registry is built. Probers are created
//! on first use and reused for the registry's lifetime. Kinds without a
//! dedicated prober fall through to Cloud Control when they have a
//! CloudFormation type name.

use super::cloudcontrol::{cloud_control_type_name, CloudControlProber};
use super::dynamodb::DynamoDbProber;
use super::normalize::{self, normalize_type_name};
use super::s3::S3Prober;
use super::{ProbeResult, Prober};
use crate::aws::client::AwsClient;
use crate::context::ProbeContext;
use crate::error::{ProbeError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type ProberFactory = fn(AwsClient) -> Arc<dyn Prober>;

fn dynamodb_table(client: AwsClient) -> Arc<dyn Prober> {
    Arc::new(DynamoDbProber::new(client))
}

fn s3_bucket(client: AwsClient) -> Arc<dyn Prober> {
    Arc::new(S3Prober::new(client))
}

/// Built-in kinds, keyed by canonical type key
const PROBER_FACTORIES: &[(&str, ProberFactory)] = &[
    (normalize::DYNAMODB_TABLE, dynamodb_table),
    (normalize::S3_BUCKET, s3_bucket),
];

fn factory_for(key: &str) -> Option<(&'static str, ProberFactory)> {
    PROBER_FACTORIES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(k, factory)| (*k, *factory))
}

/// Where a probe for a given type name goes
enum Route {
    Dedicated(Arc<dyn Prober>),
    CloudControl(String),
}

#[derive(Debug)]
pub struct ProberRegistry {
    client: AwsClient,
    probers: Mutex<HashMap<&'static str, Arc<dyn Prober>>>,
    cloud_control: CloudControlProber,
}

impl ProberRegistry {
    pub fn new(client: AwsClient) -> Self {
        Self {
            cloud_control: CloudControlProber::new(client.clone()),
            client,
            probers: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &AwsClient {
        &self.client
    }

    /// Get the prober for a type name in any supported spelling.
    ///
    /// Every call for the same kind returns the same instance.
    pub fn get_prober(&self, type_name: &str) -> Result<Arc<dyn Prober>> {
        let key = normalize_type_name(type_name);

        // Held across construction so concurrent first calls agree on one instance
        let mut probers = self.probers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prober) = probers.get(key.as_str()) {
            return Ok(Arc::clone(prober));
        }

        let Some((canonical, factory)) = factory_for(&key) else {
            tracing::debug!("No prober for type {:?} (normalized {:?})", type_name, key);
            return Err(ProbeError::UnsupportedType(key));
        };

        tracing::debug!("Creating prober for {}", canonical);
        let prober = factory(self.client.clone());
        probers.insert(canonical, Arc::clone(&prober));
        Ok(prober)
    }

    fn route(&self, type_name: &str) -> Result<Route> {
        match self.get_prober(type_name) {
            Ok(prober) => Ok(Route::Dedicated(prober)),
            Err(ProbeError::UnsupportedType(key)) => match cloud_control_type_name(type_name) {
                Some(cfn_type) => {
                    tracing::debug!("Probing {} through Cloud Control as {}", key, cfn_type);
                    Ok(Route::CloudControl(cfn_type))
                },
                None => Err(ProbeError::UnsupportedType(key)),
            },
            Err(e) => Err(e),
        }
    }

    /// Every canonical key with a dedicated prober, sorted
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = PROBER_FACTORIES
            .iter()
            .map(|(k, _)| k.to_string())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Whether `type_name` has a dedicated prober
    pub fn is_supported(&self, type_name: &str) -> bool {
        factory_for(&normalize_type_name(type_name)).is_some()
    }

    /// Whether `type_name` can be probed at all, directly or via Cloud Control
    pub fn is_probeable(&self, type_name: &str) -> bool {
        self.is_supported(type_name) || cloud_control_type_name(type_name).is_some()
    }

    async fn probe_routed(&self, ctx: &ProbeContext, route: &Route, id: &str) -> Result<ProbeResult> {
        match route {
            Route::Dedicated(prober) => prober.probe(ctx, id).await,
            Route::CloudControl(cfn_type) => self.cloud_control.probe(ctx, cfn_type, id).await,
        }
    }

    /// Probe one resource
    pub async fn probe(
        &self,
        ctx: &ProbeContext,
        type_name: &str,
        id: &str,
    ) -> Result<ProbeResult> {
        let route = self.route(type_name)?;
        tracing::debug!("Probing {} {}", type_name, id);
        self.probe_routed(ctx, &route, id).await
    }

    /// Probe several resources of one kind concurrently; results keep input order
    pub async fn probe_many(
        &self,
        ctx: &ProbeContext,
        type_name: &str,
        ids: &[String],
    ) -> Result<Vec<Result<ProbeResult>>> {
        let route = self.route(type_name)?;

        let route = &route;
        let futures = ids
            .iter()
            .map(|id| async move { self.probe_routed(ctx, route, id).await });

        Ok(futures::future::join_all(futures).await)
    }
}
