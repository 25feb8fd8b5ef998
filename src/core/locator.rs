//! Resolves feed URLs from the settings store

use super::cache::Cache;
use super::repository::SettingsRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const ENDPOINT_TTL: Duration = Duration::from_secs(60 * 60);

pub struct EndpointLocator {
    settings: Arc<dyn SettingsRepository>,
    cache: Cache<String, String>,
}

impl EndpointLocator {
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        Self {
            settings,
            cache: Cache::new(),
        }
    }

    fn cache_key(key: &str) -> String {
        format!("endpoint:{key}")
    }

    /// Returns the URL stored under `key`, or `fallback` when it is missing,
    /// empty or the store cannot be read. Only store hits are cached.
    pub async fn resolve_url(&self, key: &str, fallback: &str) -> String {
        let cache_key = Self::cache_key(key);
        if let Some(url) = self.cache.get(&cache_key).await {
            return url;
        }

        match self.settings.get_setting(key).await {
            Ok(Some(entry)) if !entry.value.trim().is_empty() => {
                let url = entry.value.trim().to_string();
                debug!(key, url = %url, "Resolved endpoint from settings");
                self.cache
                    .put(cache_key, url.clone(), Some(ENDPOINT_TTL))
                    .await;
                url
            }
            Ok(_) => {
                debug!(key, "No endpoint configured, using fallback");
                fallback.to_string()
            }
            Err(e) => {
                warn!(key, error = %e, "Settings lookup failed, using fallback");
                fallback.to_string()
            }
        }
    }
}
