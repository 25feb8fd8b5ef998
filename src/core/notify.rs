//! Push notification abstractions

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::CategoryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderAction {
    AddIncome,
    AddExpense,
}

/// Data a client needs to open a pre-filled entry form from the notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub action: ReminderAction,
    pub income_category_id: Option<CategoryId>,
    pub expense_category_id: Option<CategoryId>,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub description: Option<String>,
    pub day_of_month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub data: ReminderPayload,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Delivers to one device. Failures are reported as `false`, never raised.
    async fn send(&self, token: &str, notification: &Notification) -> bool;

    /// Delivers the same notification to many devices, returning how many succeeded.
    async fn send_many(&self, tokens: &[String], notification: &Notification) -> usize;
}
