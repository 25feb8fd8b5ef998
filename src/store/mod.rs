pub mod disk;
pub mod memory;

use crate::core::{AssetTypeRepository, SettingsRepository, TransactionRepository, UserRepository};

pub use disk::DiskStore;
pub use memory::MemoryStore;

/// A backend that serves every collaborator the jobs need.
pub trait LedgerStore:
    AssetTypeRepository + TransactionRepository + UserRepository + SettingsRepository + 'static
{
}

impl<T> LedgerStore for T where
    T: AssetTypeRepository + TransactionRepository + UserRepository + SettingsRepository + 'static
{
}
