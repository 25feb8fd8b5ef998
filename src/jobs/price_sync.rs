use super::{Job, JobReport};
use crate::core::{AssetTypeFilter, AssetTypeRepository, InstrumentClass};
use crate::pricing::PriceSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub const PRICE_SYNC_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Refreshes the stored value of every priced asset type.
pub struct PriceSyncJob {
    assets: Arc<dyn AssetTypeRepository>,
    prices: Arc<dyn PriceSource>,
}

impl PriceSyncJob {
    pub fn new(assets: Arc<dyn AssetTypeRepository>, prices: Arc<dyn PriceSource>) -> Self {
        Self { assets, prices }
    }

    #[instrument(name = "PriceSync", skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let mut report = JobReport::new(self.name());

        let filter = AssetTypeFilter {
            exclude_unset: true,
        };
        let assets = match self.assets.find_asset_types(&filter).await {
            Ok(assets) => assets,
            Err(e) => {
                error!(error = %e, "Failed to load asset types");
                return Err(e).context("Failed to load asset types");
            }
        };

        let (base, mut priced): (Vec<_>, Vec<_>) = assets
            .into_iter()
            .partition(|a| a.class == InstrumentClass::BaseCurrency);
        report.skipped += base.len();
        report.attempted += priced.len();

        let values = self.prices.resolve_prices(&priced).await;
        for (asset, resolved) in priced.iter_mut().zip(values) {
            let value = match resolved {
                Some(value) if value > Decimal::ZERO => value,
                other => {
                    debug!(asset_type_id = asset.id, value = ?other, "No usable price this cycle");
                    report.failed += 1;
                    continue;
                }
            };

            asset.value = value;
            asset.updated_at = Some(now);
            match self.assets.update_asset_type(asset).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!(asset_type_id = asset.id, error = %e, "Failed to store price");
                    report.failed += 1;
                }
            }
        }

        info!(
            attempted = report.attempted,
            updated = report.succeeded,
            failed = report.failed,
            "Price sync finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl Job for PriceSyncJob {
    fn name(&self) -> &'static str {
        "price-sync"
    }

    fn interval(&self) -> Duration {
        PRICE_SYNC_INTERVAL
    }

    async fn run(&self) -> Result<JobReport> {
        self.run_at(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetType, CurrencyCode, GoldDenomination};
    use crate::store::memory::MemoryStore;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockPriceSource {
        prices: HashMap<i64, Decimal>,
        calls: AtomicUsize,
    }

    impl MockPriceSource {
        fn new(prices: &[(i64, Decimal)]) -> Self {
            Self {
                prices: prices.iter().copied().collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceSource for MockPriceSource {
        async fn resolve_price(&self, asset: &AssetType) -> Option<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prices.get(&asset.id).copied()
        }
    }

    struct BrokenAssets;

    #[async_trait]
    impl AssetTypeRepository for BrokenAssets {
        async fn find_asset_types(&self, _filter: &AssetTypeFilter) -> Result<Vec<AssetType>> {
            Err(anyhow!("database is down"))
        }

        async fn update_asset_type(&self, _asset: &AssetType) -> Result<()> {
            Ok(())
        }

        async fn insert_asset_type(&self, asset: AssetType) -> Result<AssetType> {
            Ok(asset)
        }
    }

    /// Stores through a memory store but refuses to write one asset type.
    struct RejectingUpdates {
        inner: MemoryStore,
        reject_id: i64,
    }

    #[async_trait]
    impl AssetTypeRepository for RejectingUpdates {
        async fn find_asset_types(&self, filter: &AssetTypeFilter) -> Result<Vec<AssetType>> {
            self.inner.find_asset_types(filter).await
        }

        async fn update_asset_type(&self, asset: &AssetType) -> Result<()> {
            if asset.id == self.reject_id {
                return Err(anyhow!("row is locked"));
            }
            self.inner.update_asset_type(asset).await
        }

        async fn insert_asset_type(&self, asset: AssetType) -> Result<AssetType> {
            self.inner.insert_asset_type(asset).await
        }
    }

    fn asset(id: i64, class: InstrumentClass) -> AssetType {
        AssetType {
            id,
            user_id: None,
            name: format!("asset-{id}"),
            class,
            value: Decimal::new(5, 0),
            feed_key: None,
            updated_at: None,
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for a in [
            asset(1, InstrumentClass::BaseCurrency),
            asset(2, InstrumentClass::Currency(CurrencyCode::Usd)),
            asset(3, InstrumentClass::Gold(GoldDenomination::Gram)),
            asset(4, InstrumentClass::Unset),
            asset(5, InstrumentClass::Currency(CurrencyCode::Eur)),
            asset(6, InstrumentClass::Other),
        ] {
            store.insert_asset_type(a).await.unwrap();
        }
        store
    }

    #[test_log::test(tokio::test)]
    async fn test_updates_priced_assets_and_tolerates_misses() {
        let store = seeded_store().await;
        let prices = Arc::new(MockPriceSource::new(&[
            (2, Decimal::new(3250, 2)),
            (3, Decimal::new(245678, 2)),
            (5, Decimal::ZERO),
        ]));
        let job = PriceSyncJob::new(store.clone(), prices.clone());
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 10, 30, 0).unwrap();

        let report = job.run_at(now).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.attempted, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 2);
        // Base currency and unset types never reach the resolver
        assert_eq!(prices.calls.load(Ordering::SeqCst), 4);

        let usd = store.asset_type(2).await.unwrap();
        assert_eq!(usd.value, Decimal::new(3250, 2));
        assert_eq!(usd.updated_at, Some(now));

        let eur = store.asset_type(5).await.unwrap();
        assert_eq!(eur.value, Decimal::new(5, 0));
        assert!(eur.updated_at.is_none());

        let unset = store.asset_type(4).await.unwrap();
        assert!(unset.updated_at.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_bulk_read_failure_is_surfaced() {
        let prices = Arc::new(MockPriceSource::new(&[]));
        let job = PriceSyncJob::new(Arc::new(BrokenAssets), prices);

        let err = job.run().await.unwrap_err();
        assert!(err.to_string().contains("Failed to load asset types"));
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_write_does_not_stop_other_updates() {
        let inner = MemoryStore::new();
        for a in [
            asset(2, InstrumentClass::Currency(CurrencyCode::Usd)),
            asset(3, InstrumentClass::Gold(GoldDenomination::Gram)),
            asset(5, InstrumentClass::Currency(CurrencyCode::Eur)),
        ] {
            inner.insert_asset_type(a).await.unwrap();
        }
        let store = Arc::new(RejectingUpdates {
            inner,
            reject_id: 3,
        });
        let prices = Arc::new(MockPriceSource::new(&[
            (2, Decimal::new(3250, 2)),
            (3, Decimal::new(245678, 2)),
            (5, Decimal::new(3505, 2)),
        ]));
        let job = PriceSyncJob::new(store.clone(), prices);
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 10, 30, 0).unwrap();

        let report = job.run_at(now).await.unwrap();

        assert_eq!(
            (report.attempted, report.succeeded, report.failed),
            (3, 2, 1)
        );
        assert_eq!(store.inner.asset_type(2).await.unwrap().updated_at, Some(now));
        assert_eq!(
            store.inner.asset_type(5).await.unwrap().value,
            Decimal::new(3505, 2)
        );
        let gold = store.inner.asset_type(3).await.unwrap();
        assert_eq!(gold.value, Decimal::new(5, 0));
        assert!(gold.updated_at.is_none());
    }
}
