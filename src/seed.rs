//! Default global asset types

use crate::core::{
    AssetType, AssetTypeFilter, AssetTypeRepository, CurrencyCode, GoldDenomination,
    InstrumentClass,
};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{debug, info};

fn defaults() -> Vec<(&'static str, InstrumentClass)> {
    vec![
        ("Turkish Lira", InstrumentClass::BaseCurrency),
        ("US Dollar", InstrumentClass::Currency(CurrencyCode::Usd)),
        ("Euro", InstrumentClass::Currency(CurrencyCode::Eur)),
        ("British Pound", InstrumentClass::Currency(CurrencyCode::Gbp)),
        ("Gram Gold", InstrumentClass::Gold(GoldDenomination::Gram)),
        ("Quarter Gold", InstrumentClass::Gold(GoldDenomination::Quarter)),
        ("Half Gold", InstrumentClass::Gold(GoldDenomination::Half)),
        ("Full Gold", InstrumentClass::Gold(GoldDenomination::Full)),
    ]
}

/// Creates any missing global asset types and returns how many were added.
/// Existing global types with the same class are left alone.
pub async fn seed_default_asset_types(assets: &dyn AssetTypeRepository) -> Result<usize> {
    let existing: HashSet<InstrumentClass> = assets
        .find_asset_types(&AssetTypeFilter::default())
        .await
        .context("Failed to load asset types")?
        .into_iter()
        .filter(|a| a.user_id.is_none())
        .map(|a| a.class)
        .collect();

    let mut created = 0;
    for (name, class) in defaults() {
        if existing.contains(&class) {
            debug!(%class, "Global asset type already present");
            continue;
        }
        let value = if class == InstrumentClass::BaseCurrency {
            Decimal::ONE
        } else {
            Decimal::ZERO
        };
        assets
            .insert_asset_type(AssetType {
                id: 0,
                user_id: None,
                name: name.to_string(),
                class,
                value,
                feed_key: None,
                updated_at: None,
            })
            .await
            .with_context(|| format!("Failed to create asset type {name}"))?;
        created += 1;
    }

    info!(created, "Seeded default asset types");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let store = MemoryStore::new();
        store
            .insert_asset_type(AssetType {
                id: 0,
                user_id: None,
                name: "Dollar".to_string(),
                class: InstrumentClass::Currency(CurrencyCode::Usd),
                value: Decimal::new(32, 0),
                feed_key: None,
                updated_at: None,
            })
            .await
            .unwrap();

        assert_eq!(seed_default_asset_types(&store).await.unwrap(), 7);
        assert_eq!(seed_default_asset_types(&store).await.unwrap(), 0);

        let all = store
            .find_asset_types(&AssetTypeFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 8);
        let lira = all
            .iter()
            .find(|a| a.class == InstrumentClass::BaseCurrency)
            .unwrap();
        assert_eq!(lira.value, Decimal::ONE);
        // The pre-existing dollar keeps its value
        assert_eq!(all[0].value, Decimal::new(32, 0));
    }
}
