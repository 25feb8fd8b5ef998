use crate::core::model::{AssetType, SettingsEntry, Transaction, TransactionId, User};
use crate::core::repository::{
    AssetTypeFilter, AssetTypeRepository, SettingsRepository, TransactionFilter,
    TransactionRepository, UserFilter, UserRepository,
};
use crate::core::RecurringObligationKey;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Tables {
    asset_types: BTreeMap<i64, AssetType>,
    transactions: BTreeMap<TransactionId, Transaction>,
    users: BTreeMap<i64, User>,
    settings: HashMap<String, SettingsEntry>,
    staged_deletes: Vec<TransactionId>,
}

/// Ledger store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_transaction(&self, tx: Transaction) {
        self.inner.lock().await.transactions.insert(tx.id, tx);
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    pub async fn transaction_ids(&self) -> Vec<TransactionId> {
        self.inner.lock().await.transactions.keys().copied().collect()
    }

    pub async fn asset_type(&self, id: i64) -> Option<AssetType> {
        self.inner.lock().await.asset_types.get(&id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn discard_staged(&self) {
        self.inner.lock().await.staged_deletes.clear();
    }
}

#[async_trait]
impl AssetTypeRepository for MemoryStore {
    async fn find_asset_types(&self, filter: &AssetTypeFilter) -> Result<Vec<AssetType>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .asset_types
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn update_asset_type(&self, asset: &AssetType) -> Result<()> {
        let mut tables = self.inner.lock().await;
        let slot = tables
            .asset_types
            .get_mut(&asset.id)
            .ok_or_else(|| anyhow!("Asset type {} not found", asset.id))?;
        *slot = asset.clone();
        Ok(())
    }

    async fn insert_asset_type(&self, mut asset: AssetType) -> Result<AssetType> {
        let mut tables = self.inner.lock().await;
        if asset.id == 0 {
            asset.id = tables.asset_types.keys().next_back().map_or(1, |id| id + 1);
        }
        tables.asset_types.insert(asset.id, asset.clone());
        Ok(asset)
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .transactions
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn find_obligation_keys(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<RecurringObligationKey>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .transactions
            .values()
            .filter(|t| filter.matches(t))
            .map(Transaction::obligation_key)
            .collect())
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        let mut tables = self.inner.lock().await;
        if !tables.transactions.contains_key(&id) {
            return Err(anyhow!("Transaction {} not found", id));
        }
        tables.staged_deletes.push(id);
        Ok(())
    }

    async fn commit(&self) -> Result<usize> {
        let mut tables = self.inner.lock().await;
        let staged = std::mem::take(&mut tables.staged_deletes);
        let applied = staged
            .iter()
            .filter(|id| tables.transactions.remove(*id).is_some())
            .count();
        debug!(applied, "Committed staged deletes");
        Ok(applied)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_setting(&self, key: &str) -> Result<Option<SettingsEntry>> {
        Ok(self.inner.lock().await.settings.get(key).cloned())
    }

    async fn put_setting(&self, entry: SettingsEntry) -> Result<()> {
        self.inner
            .lock()
            .await
            .settings
            .insert(entry.key.clone(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstrumentClass, TransactionKind};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn tx(id: i64) -> Transaction {
        Transaction {
            id,
            user_id: 1,
            asset_type_id: None,
            kind: TransactionKind::Expense,
            income_category_id: None,
            expense_category_id: Some(4),
            amount: Decimal::TEN,
            description: None,
            date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            recurring: false,
            day_of_month: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_deletes_apply_on_commit() {
        let store = MemoryStore::new();
        store.insert_transaction(tx(1)).await;
        store.insert_transaction(tx(2)).await;

        store.delete_transaction(1).await.unwrap();
        assert_eq!(store.transaction_ids().await, vec![1, 2]);

        assert_eq!(store.commit().await.unwrap(), 1);
        assert_eq!(store.transaction_ids().await, vec![2]);
        assert_eq!(store.commit().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_transaction_fails() {
        let store = MemoryStore::new();
        assert!(store.delete_transaction(42).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_update_requires_existing() {
        let store = MemoryStore::new();
        let asset = AssetType {
            id: 0,
            user_id: None,
            name: "USD".to_string(),
            class: InstrumentClass::Unset,
            value: Decimal::ZERO,
            feed_key: None,
            updated_at: None,
        };
        let first = store.insert_asset_type(asset.clone()).await.unwrap();
        let second = store.insert_asset_type(asset.clone()).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let mut ghost = asset;
        ghost.id = 99;
        assert!(store.update_asset_type(&ghost).await.is_err());

        let filter = AssetTypeFilter {
            exclude_unset: true,
        };
        assert!(store.find_asset_types(&filter).await.unwrap().is_empty());
    }
}
