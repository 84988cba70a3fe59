use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::SlotStore;

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSlotStore {
    dir: PathBuf,
}

impl JsonFileSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(anyhow!("Invalid slot key: {:?}", key));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SlotStore for JsonFileSlotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read slot from {}", path.display()))?;
        Ok(Some(data))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create dir {}", self.dir.display()))?;

        // Write beside the target and rename so a crash never leaves half a payload.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)
            .with_context(|| format!("failed to write slot to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to replace slot at {}", path.display()))?;
        Ok(())
    }
}
