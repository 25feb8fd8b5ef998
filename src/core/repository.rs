//! Persistence collaborators used by the jobs

use super::model::{
    AssetType, InstrumentClass, RecurringObligationKey, SettingsEntry, Transaction, TransactionId,
    User, UserId,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct AssetTypeFilter {
    pub exclude_unset: bool,
}

impl AssetTypeFilter {
    pub fn matches(&self, asset: &AssetType) -> bool {
        !(self.exclude_unset && asset.class == InstrumentClass::Unset)
    }
}

/// Date bounds: `dated_from` and `dated_until` are inclusive, `dated_before` is exclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub active_only: bool,
    pub recurring_only: bool,
    pub dated_from: Option<DateTime<Utc>>,
    pub dated_until: Option<DateTime<Utc>>,
    pub dated_before: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.active_only && !tx.active {
            return false;
        }
        if self.recurring_only && !tx.recurring {
            return false;
        }
        if self.dated_from.is_some_and(|from| tx.date < from) {
            return false;
        }
        if self.dated_until.is_some_and(|until| tx.date > until) {
            return false;
        }
        if self.dated_before.is_some_and(|before| tx.date >= before) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub ids: HashSet<UserId>,
    pub active_only: bool,
    pub with_push_token: bool,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.ids.contains(&user.id)
            && (!self.active_only || user.active)
            && (!self.with_push_token || user.push_token.as_deref().is_some_and(|t| !t.is_empty()))
    }
}

#[async_trait]
pub trait AssetTypeRepository: Send + Sync {
    async fn find_asset_types(&self, filter: &AssetTypeFilter) -> Result<Vec<AssetType>>;

    /// Writes one asset type; durable once this returns.
    async fn update_asset_type(&self, asset: &AssetType) -> Result<()>;

    async fn insert_asset_type(&self, asset: AssetType) -> Result<AssetType>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;

    /// Same selection as `find_transactions`, projected down to dedup keys.
    async fn find_obligation_keys(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<RecurringObligationKey>>;

    /// Stages a delete. Nothing is removed until `commit` succeeds.
    async fn delete_transaction(&self, id: TransactionId) -> Result<()>;

    /// Applies every staged delete, returning how many were applied. The
    /// staged set is consumed whether or not the commit succeeds.
    async fn commit(&self) -> Result<usize>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<SettingsEntry>>;

    async fn put_setting(&self, entry: SettingsEntry) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TransactionKind;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn tx_on(day: u32) -> Transaction {
        Transaction {
            id: day as i64,
            user_id: 1,
            asset_type_id: None,
            kind: TransactionKind::Income,
            income_category_id: Some(3),
            expense_category_id: None,
            amount: Decimal::ONE,
            description: None,
            date: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            recurring: false,
            day_of_month: None,
            active: true,
        }
    }

    #[test]
    fn test_dated_before_is_exclusive() {
        let filter = TransactionFilter {
            dated_before: Some(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(filter.matches(&tx_on(9)));
        assert!(!filter.matches(&tx_on(10)));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = TransactionFilter {
            dated_from: Some(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()),
            dated_until: Some(Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(!filter.matches(&tx_on(1)));
        assert!(filter.matches(&tx_on(2)));
        assert!(filter.matches(&tx_on(4)));
        assert!(!filter.matches(&tx_on(5)));
    }

    #[test]
    fn test_recurring_and_active_flags() {
        let filter = TransactionFilter {
            active_only: true,
            recurring_only: true,
            ..Default::default()
        };
        let mut tx = tx_on(1);
        assert!(!filter.matches(&tx));
        tx.recurring = true;
        assert!(filter.matches(&tx));
        tx.active = false;
        assert!(!filter.matches(&tx));
    }

    #[test]
    fn test_user_filter_requires_token() {
        let filter = UserFilter {
            ids: HashSet::from([1, 2]),
            active_only: true,
            with_push_token: true,
        };
        let mut user = User {
            id: 1,
            active: true,
            push_token: Some(String::new()),
        };
        assert!(!filter.matches(&user));
        user.push_token = Some("ExponentPushToken[abc]".to_string());
        assert!(filter.matches(&user));
        user.id = 3;
        assert!(!filter.matches(&user));
    }
}
