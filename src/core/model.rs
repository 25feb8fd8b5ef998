//! Ledger records as seen by the automation jobs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub type AssetTypeId = i64;
pub type TransactionId = i64;
pub type UserId = i64;
pub type CategoryId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyCode {
    Usd,
    Eur,
    Gbp,
    Chf,
    Jpy,
    Sar,
}

impl CurrencyCode {
    /// Three-letter ISO code, as used for keys in currency feeds.
    pub fn code(&self) -> &'static str {
        match self {
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Chf => "CHF",
            CurrencyCode::Jpy => "JPY",
            CurrencyCode::Sar => "SAR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoldDenomination {
    Gram,
    Quarter,
    Half,
    Full,
}

impl GoldDenomination {
    /// Grams of gold per unit of this denomination.
    pub fn multiplier(&self) -> Decimal {
        match self {
            GoldDenomination::Gram => Decimal::ONE,
            GoldDenomination::Quarter => Decimal::new(175, 2),
            GoldDenomination::Half => Decimal::new(35, 1),
            GoldDenomination::Full => Decimal::new(70, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstrumentClass {
    #[default]
    Unset,
    BaseCurrency,
    Currency(CurrencyCode),
    Gold(GoldDenomination),
    Other,
}

impl Display for InstrumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentClass::Unset => write!(f, "unset"),
            InstrumentClass::BaseCurrency => write!(f, "base"),
            InstrumentClass::Currency(c) => write!(f, "{}", c.code()),
            InstrumentClass::Gold(d) => write!(f, "gold/{d:?}"),
            InstrumentClass::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetType {
    pub id: AssetTypeId,
    /// `None` for global types shared by every user.
    pub user_id: Option<UserId>,
    pub name: String,
    pub class: InstrumentClass,
    pub value: Decimal,
    pub feed_key: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionKind {
    Income,
    Expense,
}

/// Which reminder a recurring record can produce, judged by its category references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationShape {
    IncomeOnly,
    ExpenseOnly,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub asset_type_id: Option<AssetTypeId>,
    pub kind: TransactionKind,
    pub income_category_id: Option<CategoryId>,
    pub expense_category_id: Option<CategoryId>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub recurring: bool,
    pub day_of_month: Option<u32>,
    pub active: bool,
}

impl Transaction {
    pub fn shape(&self) -> ObligationShape {
        match (self.income_category_id, self.expense_category_id) {
            (Some(_), None) => ObligationShape::IncomeOnly,
            (None, Some(_)) => ObligationShape::ExpenseOnly,
            _ => ObligationShape::Ambiguous,
        }
    }

    pub fn obligation_key(&self) -> RecurringObligationKey {
        RecurringObligationKey {
            user_id: self.user_id,
            kind: self.kind,
            income_category_id: self.income_category_id,
            expense_category_id: self.expense_category_id,
            day_of_month: self.day_of_month,
        }
    }
}

/// Identity of a recurring obligation. Any two recurring transactions with an
/// equal key are the same obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecurringObligationKey {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub income_category_id: Option<CategoryId>,
    pub expense_category_id: Option<CategoryId>,
    pub day_of_month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub active: bool,
    pub push_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transaction(income: Option<CategoryId>, expense: Option<CategoryId>) -> Transaction {
        Transaction {
            id: 1,
            user_id: 7,
            asset_type_id: None,
            kind: TransactionKind::Expense,
            income_category_id: income,
            expense_category_id: expense,
            amount: Decimal::new(1500, 0),
            description: None,
            date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            recurring: true,
            day_of_month: Some(5),
            active: true,
        }
    }

    #[test]
    fn test_gold_multipliers_are_exact() {
        assert_eq!(GoldDenomination::Gram.multiplier().to_string(), "1");
        assert_eq!(GoldDenomination::Quarter.multiplier().to_string(), "1.75");
        assert_eq!(GoldDenomination::Half.multiplier().to_string(), "3.5");
        assert_eq!(GoldDenomination::Full.multiplier().to_string(), "7.0");
    }

    #[test]
    fn test_shape() {
        assert_eq!(transaction(Some(1), None).shape(), ObligationShape::IncomeOnly);
        assert_eq!(transaction(None, Some(2)).shape(), ObligationShape::ExpenseOnly);
        assert_eq!(transaction(Some(1), Some(2)).shape(), ObligationShape::Ambiguous);
        assert_eq!(transaction(None, None).shape(), ObligationShape::Ambiguous);
    }

    #[test]
    fn test_obligation_key_ignores_amount_and_date() {
        let a = transaction(None, Some(2));
        let mut b = a.clone();
        b.id = 2;
        b.amount = Decimal::new(99, 0);
        b.date = Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap();
        assert_eq!(a.obligation_key(), b.obligation_key());

        b.day_of_month = None;
        assert_ne!(a.obligation_key(), b.obligation_key());
    }
}
