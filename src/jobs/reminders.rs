use super::{Job, JobReport};
use crate::core::cache::Cache;
use crate::core::model::UserId;
use crate::core::{
    Notification, NotificationSender, ObligationShape, RecurringObligationKey, ReminderAction,
    ReminderPayload, Transaction, TransactionFilter, TransactionRepository, UserFilter,
    UserRepository,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub const REMINDER_INTERVAL: Duration = Duration::from_secs(2 * 60);
/// Most notifications dispatched concurrently in one wave.
pub const WAVE_SIZE: usize = 200;
/// Pause between waves to stay under the push provider's throughput limit.
pub const WAVE_DELAY: Duration = Duration::from_millis(1500);

/// Reminds users about recurring income and expenses not yet recorded this month.
pub struct RecurringReminderJob {
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserRepository>,
    sender: Arc<dyn NotificationSender>,
    reminded: Cache<RecurringObligationKey, ()>,
    cooldown: Option<Duration>,
    running: Mutex<()>,
}

/// A reminder ready to go out.
struct Dispatch {
    key: RecurringObligationKey,
    token: String,
    notification: Notification,
}

/// Midnight UTC on the first day of `now`'s month.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// An obligation with a day of month is only due once that day is reached.
pub fn is_due(day_of_month: Option<u32>, today: u32) -> bool {
    day_of_month.is_none_or(|day| today >= day)
}

/// Most recently dated transaction per obligation. Ties go to the higher id.
pub fn representatives(
    transactions: Vec<Transaction>,
) -> HashMap<RecurringObligationKey, Transaction> {
    let mut latest: HashMap<RecurringObligationKey, Transaction> = HashMap::new();
    for tx in transactions {
        let key = tx.obligation_key();
        match latest.get(&key) {
            Some(current) if (current.date, current.id) >= (tx.date, tx.id) => {}
            _ => {
                latest.insert(key, tx);
            }
        }
    }
    latest
}

/// Splits `items` into consecutive waves of at most [`WAVE_SIZE`].
pub fn waves<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
    items.chunks(WAVE_SIZE)
}

/// Builds the reminder for a template, or `None` when its categories do not
/// say whether it is income or expense.
pub fn reminder_for(tx: &Transaction) -> Option<Notification> {
    let (action, title, kind_label) = match tx.shape() {
        ObligationShape::IncomeOnly => (ReminderAction::AddIncome, "Income reminder", "income"),
        ObligationShape::ExpenseOnly => {
            (ReminderAction::AddExpense, "Payment reminder", "expense")
        }
        ObligationShape::Ambiguous => return None,
    };
    let label = tx
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| format!("your recurring {kind_label}"), |d| format!("\"{d}\""));
    let body = match tx.day_of_month {
        Some(day) => format!(
            "Time to record {label} of {} (due on day {day}).",
            tx.amount
        ),
        None => format!("Time to record {label} of {} for this month.", tx.amount),
    };

    Some(Notification {
        title: title.to_string(),
        body,
        data: ReminderPayload {
            action,
            income_category_id: tx.income_category_id,
            expense_category_id: tx.expense_category_id,
            amount: tx.amount,
            description: tx.description.clone(),
            day_of_month: tx.day_of_month,
        },
    })
}

impl RecurringReminderJob {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserRepository>,
        sender: Arc<dyn NotificationSender>,
        cooldown: Option<Duration>,
    ) -> Self {
        Self {
            transactions,
            users,
            sender,
            reminded: Cache::new(),
            cooldown,
            running: Mutex::new(()),
        }
    }

    async fn tokens_for(&self, recurring: &[Transaction]) -> Result<HashMap<UserId, String>> {
        let filter = UserFilter {
            ids: recurring.iter().map(|t| t.user_id).collect(),
            active_only: true,
            with_push_token: true,
        };
        let users = self
            .users
            .find_users(&filter)
            .await
            .context("Failed to load users")?;
        Ok(users
            .into_iter()
            .filter_map(|u| u.push_token.map(|token| (u.id, token)))
            .collect())
    }

    async fn satisfied_this_month(
        &self,
        now: DateTime<Utc>,
    ) -> Result<HashSet<RecurringObligationKey>> {
        let filter = TransactionFilter {
            active_only: true,
            recurring_only: true,
            dated_from: Some(month_start(now)),
            dated_until: Some(now),
            ..Default::default()
        };
        let keys = self
            .transactions
            .find_obligation_keys(&filter)
            .await
            .context("Failed to load this month's recurring transactions")?;
        Ok(keys.into_iter().collect())
    }

    async fn dispatch_wave(&self, wave: &[Dispatch], report: &mut JobReport) {
        let sends = wave.iter().map(|d| async move {
            let delivered = self.sender.send(&d.token, &d.notification).await;
            (d.key, delivered)
        });
        for (key, delivered) in join_all(sends).await {
            if delivered {
                report.succeeded += 1;
                if let Some(ttl) = self.cooldown {
                    self.reminded.put(key, (), Some(ttl)).await;
                }
            } else {
                debug!(user_id = key.user_id, "Reminder delivery failed");
                report.failed += 1;
            }
        }
    }

    #[instrument(name = "RecurringReminders", skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let mut report = JobReport::new(self.name());
        let Ok(_running) = self.running.try_lock() else {
            warn!("Previous reminder run still in progress, skipping");
            return Ok(report);
        };
        self.reminded.purge_expired().await;

        let recurring = self
            .transactions
            .find_transactions(&TransactionFilter {
                active_only: true,
                recurring_only: true,
                ..Default::default()
            })
            .await
            .context("Failed to load recurring transactions")?;
        if recurring.is_empty() {
            debug!("No recurring transactions");
            return Ok(report);
        }

        let tokens = self.tokens_for(&recurring).await?;
        let satisfied = self.satisfied_this_month(now).await?;

        let mut candidates: Vec<(RecurringObligationKey, Transaction)> =
            representatives(recurring).into_iter().collect();
        candidates.sort_by_key(|(key, _)| *key);

        let today = now.day();
        let mut due = Vec::new();
        for (key, template) in candidates {
            let Some(token) = tokens.get(&key.user_id) else {
                report.skipped += 1;
                continue;
            };
            if satisfied.contains(&key) {
                self.reminded.remove(&key).await;
                report.skipped += 1;
                continue;
            }
            if !is_due(key.day_of_month, today) {
                report.skipped += 1;
                continue;
            }
            if self.reminded.get(&key).await.is_some() {
                report.skipped += 1;
                continue;
            }
            let Some(notification) = reminder_for(&template) else {
                debug!(transaction_id = template.id, "Template is neither income nor expense");
                report.skipped += 1;
                continue;
            };
            due.push(Dispatch {
                key,
                token: token.clone(),
                notification,
            });
        }

        report.attempted = due.len();
        for (index, wave) in waves(&due).enumerate() {
            if index > 0 {
                tokio::time::sleep(WAVE_DELAY).await;
            }
            self.dispatch_wave(wave, &mut report).await;
            debug!(wave = index + 1, size = wave.len(), "Reminder wave dispatched");
        }

        info!(
            attempted = report.attempted,
            delivered = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Recurring reminders finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl Job for RecurringReminderJob {
    fn name(&self) -> &'static str {
        "recurring-reminders"
    }

    fn interval(&self) -> Duration {
        REMINDER_INTERVAL
    }

    async fn run(&self) -> Result<JobReport> {
        self.run_at(Utc::now()).await
    }
}
