use super::rules::{ExtractionPlan, FeedSource};
use crate::core::{AssetType, EndpointLocator, InstrumentClass};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Settings key that redirects the built-in feed.
pub const DEFAULT_FEED_SETTING: &str = "PriceFeed.DefaultUrl";

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current value of one unit of `asset` in the base currency, or `None`
    /// when it cannot be priced this cycle.
    async fn resolve_price(&self, asset: &AssetType) -> Option<Decimal>;

    /// Prices a whole cycle, one result per asset in order.
    async fn resolve_prices(&self, assets: &[AssetType]) -> Vec<Option<Decimal>> {
        let mut prices = Vec::with_capacity(assets.len());
        for asset in assets {
            prices.push(self.resolve_price(asset).await);
        }
        prices
    }
}

/// Feed documents fetched during one cycle, keyed by URL. Failed fetches are
/// kept as `None` so a broken feed is only tried once.
type FeedDocs = HashMap<String, Option<Value>>;

pub struct PriceResolver {
    client: reqwest::Client,
    locator: Arc<EndpointLocator>,
    default_url: String,
}

impl PriceResolver {
    pub fn new(locator: Arc<EndpointLocator>, default_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ledger-jobs/1.0")
            .timeout(timeout)
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(PriceResolver {
            client,
            locator,
            default_url: default_url.to_string(),
        })
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        debug!("Requesting feed from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} URL: {}", response.status(), url));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text from {url}"))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse JSON from {url}"))
    }
}

impl PriceResolver {
    #[instrument(
        name = "ResolvePrice",
        skip(self, asset, docs),
        fields(asset_type_id = asset.id, class = %asset.class)
    )]
    async fn resolve_with(&self, asset: &AssetType, docs: &mut FeedDocs) -> Option<Decimal> {
        if asset.class == InstrumentClass::BaseCurrency {
            return Some(Decimal::ONE);
        }

        let (url, source) = match asset.feed_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(feed_key) => (
                self.locator.resolve_url(feed_key, "").await,
                FeedSource::Custom,
            ),
            None => (
                self.locator
                    .resolve_url(DEFAULT_FEED_SETTING, &self.default_url)
                    .await,
                FeedSource::BuiltIn,
            ),
        };

        let Some(plan) = ExtractionPlan::for_class(asset.class, source) else {
            debug!(?source, "No extraction rules for this class");
            return None;
        };

        if url.is_empty() {
            warn!(
                asset_type_id = asset.id,
                feed_key = ?asset.feed_key,
                "Feed key has no configured URL"
            );
            return None;
        }

        if !docs.contains_key(&url) {
            let doc = match self.fetch_json(&url).await {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(asset_type_id = asset.id, error = %e, "Feed request failed");
                    None
                }
            };
            docs.insert(url.clone(), doc);
        }
        let doc = docs.get(&url).and_then(Option::as_ref)?;

        let value = plan.evaluate(doc);
        match value {
            Some(v) => debug!(asset_type_id = asset.id, value = %v, "Resolved price"),
            None => warn!(asset_type_id = asset.id, url = %url, "No usable price in feed"),
        }
        value
    }
}

#[async_trait]
impl PriceSource for PriceResolver {
    async fn resolve_price(&self, asset: &AssetType) -> Option<Decimal> {
        self.resolve_with(asset, &mut FeedDocs::new()).await
    }

    async fn resolve_prices(&self, assets: &[AssetType]) -> Vec<Option<Decimal>> {
        let mut docs = FeedDocs::new();
        let mut prices = Vec::with_capacity(assets.len());
        for asset in assets {
            prices.push(self.resolve_with(asset, &mut docs).await);
        }
        debug!(feeds = docs.len(), "Feeds fetched this cycle");
        prices
    }
}
