use std::collections::HashMap;

use anyhow::Result;

use super::SlotStore;

/// Slots kept in a map; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: HashMap<String, String>,
    writes: usize,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a slot, as if an earlier session had written it.
    pub fn with_slot(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(key.into(), value.into());
        self
    }

    /// Number of `save` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl SlotStore for MemorySlotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}
