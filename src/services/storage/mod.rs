//! Durable named slots.
//!
//! A slot holds one complete serialized payload under a fixed key, the same
//! contract as a browser's local storage entry: read whole, overwritten whole.

mod file;
mod memory;
mod sqlite;

use anyhow::Result;

pub use file::JsonFileSlotStore;
pub use memory::MemorySlotStore;
pub use sqlite::SqliteSlotStore;

/// Key-value persistence for whole payloads.
pub trait SlotStore {
    /// Returns the payload stored under `key`, or `None` if the slot is empty.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the payload stored under `key`.
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<T: SlotStore + ?Sized> SlotStore for Box<T> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value)
    }
}
