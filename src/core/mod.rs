//! Domain types and the collaborator abstractions the jobs depend on

pub mod cache;
pub mod config;
pub mod locator;
pub mod log;
pub mod model;
pub mod notify;
pub mod repository;

// Re-export main types for cleaner imports
pub use locator::EndpointLocator;
pub use model::{
    AssetType, CurrencyCode, GoldDenomination, InstrumentClass, ObligationShape,
    RecurringObligationKey, SettingsEntry, Transaction, TransactionKind, User,
};
pub use notify::{Notification, NotificationSender, ReminderAction, ReminderPayload};
pub use repository::{
    AssetTypeFilter, AssetTypeRepository, SettingsRepository, TransactionFilter,
    TransactionRepository, UserFilter, UserRepository,
};
