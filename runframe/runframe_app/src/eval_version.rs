//! Resolves the evaluator package version, `latest` is looked up in the package registry.
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info};

pub const LATEST: &str = "latest";
pub const EVAL_PACKAGE: &str = "@tscircuit/eval";

pub type RegistryFuture = BoxFuture<'static, Result<String, RegistryError>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Registry request failed. package: {package}, cause: {reason}")]
    Request { package: String, reason: String },
    #[error("No 'latest' tag published. package: {0}")]
    MissingLatest(String),
}

pub trait PackageRegistry: Send + Sync {
    /// The version the `latest` dist-tag currently points to.
    fn latest_version(&self, package: &str) -> RegistryFuture;
}

#[derive(Default)]
struct ResolverCache {
    latest: Option<String>,
    in_flight: Option<Shared<RegistryFuture>>,
}

/// Owns the cached `latest` version, concurrent lookups share a single registry request.
pub struct EvalVersionResolver<R> {
    registry: R,
    package: String,
    cache: Mutex<ResolverCache>,
}

impl<R: PackageRegistry> EvalVersionResolver<R> {
    pub fn new(registry: R) -> Self {
        Self::with_package(registry, EVAL_PACKAGE)
    }

    pub fn with_package(registry: R, package: impl Into<String>) -> Self {
        Self {
            registry,
            package: package.into(),
            cache: Mutex::new(ResolverCache::default()),
        }
    }

    /// A concrete version is returned as-is, `latest` is looked up once and cached.
    ///
    /// `force_latest` bypasses the cache, it is the only way to invalidate it.
    pub async fn resolve(&self, version: &str, force_latest: bool) -> Result<String, RegistryError> {
        if version != LATEST && !force_latest {
            return Ok(version.to_string());
        }

        let request = {
            let mut cache = self.lock_cache();

            if !force_latest {
                if let Some(latest) = &cache.latest {
                    debug!("Using cached version. package: {}, version: {}", self.package, latest);
                    return Ok(latest.clone());
                }
            }

            match &cache.in_flight {
                Some(request) => request.clone(),
                None => {
                    info!("Looking up latest version. package: {}", self.package);
                    let request = self
                        .registry
                        .latest_version(&self.package)
                        .shared();
                    cache.in_flight = Some(request.clone());
                    request
                }
            }
        };

        let result = request.clone().await;

        let mut cache = self.lock_cache();
        if cache
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.ptr_eq(&request))
        {
            cache.in_flight = None;
        }
        if let Ok(version) = &result {
            cache.latest = Some(version.clone());
        }

        result
    }

    pub fn cached_latest(&self) -> Option<String> {
        self.lock_cache().latest.clone()
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResolverCache> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
