use crate::core::model::{
    AssetType, RecurringObligationKey, SettingsEntry, Transaction, TransactionId, User,
};
use crate::core::repository::{
    AssetTypeFilter, AssetTypeRepository, SettingsRepository, TransactionFilter,
    TransactionRepository, UserFilter, UserRepository,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Ledger store on a fjall keyspace, one partition per record type.
pub struct DiskStore {
    keyspace: Keyspace,
    asset_types: PartitionHandle,
    transactions: PartitionHandle,
    users: PartitionHandle,
    settings: PartitionHandle,
    staged_deletes: Mutex<Vec<TransactionId>>,
}

fn id_key(id: i64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn scan<T: DeserializeOwned>(partition: &PartitionHandle) -> Result<Vec<T>> {
    partition
        .iter()
        .map(|kv| {
            let (_, value) = kv?;
            Ok(serde_json::from_slice(&value)?)
        })
        .collect()
}

fn write<T: Serialize>(partition: &PartitionHandle, id: i64, record: &T) -> Result<()> {
    partition.insert(id_key(id), serde_json::to_vec(record)?)?;
    Ok(())
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("ledger"))
            .open()
            .with_context(|| format!("Failed to open ledger store at {}", path.display()))?;
        let open = |name: &str| keyspace.open_partition(name, PartitionCreateOptions::default());

        Ok(Self {
            asset_types: open("asset_types")?,
            transactions: open("transactions")?,
            users: open("users")?,
            settings: open("settings")?,
            keyspace,
            staged_deletes: Mutex::new(Vec::new()),
        })
    }

    pub fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        write(&self.transactions, tx.id, tx)
    }

    pub fn insert_user(&self, user: &User) -> Result<()> {
        write(&self.users, user.id, user)
    }
}

#[async_trait]
impl AssetTypeRepository for DiskStore {
    async fn find_asset_types(&self, filter: &AssetTypeFilter) -> Result<Vec<AssetType>> {
        let all: Vec<AssetType> = scan(&self.asset_types)?;
        Ok(all.into_iter().filter(|a| filter.matches(a)).collect())
    }

    async fn update_asset_type(&self, asset: &AssetType) -> Result<()> {
        if !self.asset_types.contains_key(id_key(asset.id))? {
            return Err(anyhow!("Asset type {} not found", asset.id));
        }
        write(&self.asset_types, asset.id, asset)?;
        self.keyspace.persist(PersistMode::SyncData)?;
        Ok(())
    }

    async fn insert_asset_type(&self, mut asset: AssetType) -> Result<AssetType> {
        if asset.id == 0 {
            let last = self.asset_types.iter().next_back().transpose()?;
            asset.id = match last {
                Some((key, _)) => {
                    let bytes: [u8; 8] = (&*key)
                        .try_into()
                        .map_err(|_| anyhow!("Corrupt asset type key"))?;
                    i64::from_be_bytes(bytes) + 1
                }
                None => 1,
            };
        }
        write(&self.asset_types, asset.id, &asset)?;
        self.keyspace.persist(PersistMode::SyncData)?;
        Ok(asset)
    }
}

#[async_trait]
impl TransactionRepository for DiskStore {
    async fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let all: Vec<Transaction> = scan(&self.transactions)?;
        Ok(all.into_iter().filter(|t| filter.matches(t)).collect())
    }

    async fn find_obligation_keys(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<RecurringObligationKey>> {
        Ok(self
            .find_transactions(filter)
            .await?
            .iter()
            .map(Transaction::obligation_key)
            .collect())
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        if !self.transactions.contains_key(id_key(id))? {
            return Err(anyhow!("Transaction {} not found", id));
        }
        self.staged_deletes.lock().await.push(id);
        Ok(())
    }

    async fn commit(&self) -> Result<usize> {
        let staged = std::mem::take(&mut *self.staged_deletes.lock().await);
        if staged.is_empty() {
            return Ok(0);
        }
        let mut batch = self.keyspace.batch();
        for id in &staged {
            batch.remove(&self.transactions, id_key(*id));
        }
        batch.commit().context("Failed to commit staged deletes")?;
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!(applied = staged.len(), "Committed staged deletes");
        Ok(staged.len())
    }
}

#[async_trait]
impl UserRepository for DiskStore {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut users = Vec::with_capacity(filter.ids.len());
        for id in &filter.ids {
            if let Some(value) = self.users.get(id_key(*id))? {
                let user: User = serde_json::from_slice(&value)?;
                if filter.matches(&user) {
                    users.push(user);
                }
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl SettingsRepository for DiskStore {
    async fn get_setting(&self, key: &str) -> Result<Option<SettingsEntry>> {
        match self.settings.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn put_setting(&self, entry: SettingsEntry) -> Result<()> {
        self.settings
            .insert(entry.key.as_str(), serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::SyncData)?;
        Ok(())
    }
}
