use std::collections::HashMap;
use std::time::Duration;

use futures::FutureExt;
use reqwest::Client;
use runframe_app::eval_version::{PackageRegistry, RegistryError, RegistryFuture};
use tracing::debug;

pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

pub struct NpmRegistry {
    http: Client,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url
                .into()
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

impl PackageRegistry for NpmRegistry {
    fn latest_version(&self, package: &str) -> RegistryFuture {
        let http = self.http.clone();
        let url = format!("{}/-/package/{}/dist-tags", self.base_url, package);
        let package = package.to_string();

        async move {
            debug!("Requesting dist-tags. url: {}", url);

            let request_error = |reason: String| RegistryError::Request {
                package: package.clone(),
                reason,
            };

            let response = http
                .get(&url)
                .timeout(Duration::from_secs(30))
                .send()
                .await
                .map_err(|e| request_error(e.to_string()))?;

            if !response.status().is_success() {
                return Err(request_error(format!("status {}", response.status())));
            }

            let dist_tags: HashMap<String, String> = response
                .json()
                .await
                .map_err(|e| request_error(format!("invalid response: {}", e)))?;

            dist_tags
                .get("latest")
                .cloned()
                .ok_or_else(|| RegistryError::MissingLatest(package.clone()))
        }
        .boxed()
    }
}
