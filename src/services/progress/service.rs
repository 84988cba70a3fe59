//! Watch progress store.
//!
//! Keeps the full progress collection in memory and mirrors it into a single
//! slot after every mutation. Records are unique per [`MediaRef`] and kept
//! ordered by `last_watched_at`, newest first.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use super::persistence::{
    clamp_progress, decode_payload, encode_payload, BACKUP_KEY, STORAGE_KEY,
};
use crate::models::progress::{MediaRef, ProgressUpdate, WatchProgress};
use crate::models::settings::ProgressConfig;
use crate::services::storage::SlotStore;

pub struct WatchProgressStore<S: SlotStore> {
    slots: S,
    records: Vec<WatchProgress>,
    config: ProgressConfig,
}

impl<S: SlotStore> WatchProgressStore<S> {
    pub fn open(slots: S) -> Self {
        Self::with_config(slots, ProgressConfig::default())
    }

    /// Loads the collection from the slot. A missing payload is an empty
    /// collection; an unreadable one is logged, copied to the backup slot and
    /// also treated as empty.
    pub fn with_config(mut slots: S, config: ProgressConfig) -> Self {
        let records = match slots.load(STORAGE_KEY) {
            Ok(Some(data)) => Self::decode_or_backup(&mut slots, &data),
            Ok(None) => Vec::new(),
            Err(err) => {
                log::error!("Error reading watch progress: {:#}", err);
                Vec::new()
            }
        };

        log::info!("Loaded {} watch progress record(s)", records.len());

        Self {
            slots,
            records,
            config,
        }
    }

    fn decode_or_backup(slots: &mut S, data: &str) -> Vec<WatchProgress> {
        match decode_payload(data) {
            Ok(decoded) => {
                if decoded.needs_migration() {
                    log::info!(
                        "Watch progress payload is version {}, it will be rewritten on the next change",
                        decoded.version
                    );
                }
                if decoded.is_lossy() {
                    log::warn!(
                        "Dropped {} invalid watch progress record(s) while loading",
                        decoded.dropped
                    );
                    Self::backup(slots, data);
                }
                decoded.records
            }
            Err(err) => {
                log::error!("Error parsing watch progress: {}", err);
                Self::backup(slots, data);
                Vec::new()
            }
        }
    }

    fn backup(slots: &mut S, data: &str) {
        match slots.save(BACKUP_KEY, data) {
            Ok(()) => log::info!("Saved the original watch progress payload to {}", BACKUP_KEY),
            Err(err) => log::warn!("Failed to back up watch progress payload: {:#}", err),
        }
    }

    pub fn records(&self) -> &[WatchProgress] {
        &self.records
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    pub fn into_inner(self) -> S {
        self.slots
    }

    /// Upserts a record stamped with the current time.
    pub fn save_progress(&mut self, update: ProgressUpdate) -> Result<&[WatchProgress]> {
        self.save_progress_at(update, Utc::now())
    }

    /// Upserts a record stamped with `now`, prunes stale completed records,
    /// re-sorts and persists. Returns the new collection.
    pub fn save_progress_at(
        &mut self,
        update: ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<&[WatchProgress]> {
        let progress = clamp_progress(update.progress);
        let record = WatchProgress {
            media: update.media,
            progress,
            completed: progress >= self.config.completion_threshold || update.completed,
            last_watched_at: now,
        };

        match self.records.iter_mut().find(|r| r.media == record.media) {
            Some(existing) => *existing = record,
            None => self.records.insert(0, record),
        }

        if let Some(cutoff) = window_start(now, self.config.completed_retention_days) {
            let before = self.records.len();
            self.records
                .retain(|r| !r.completed || r.watched_since(cutoff));
            let pruned = before - self.records.len();
            if pruned > 0 {
                log::debug!("Pruned {} completed record(s) older than {}", pruned, cutoff);
            }
        }

        self.records
            .sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));

        self.persist()?;
        Ok(&self.records)
    }

    pub fn get_progress(&self, media: &MediaRef) -> Option<&WatchProgress> {
        self.records.iter().find(|r| r.media == *media)
    }

    /// Removes the movie and every episode sharing `tmdb_id`.
    /// Returns how many records were removed.
    pub fn clear_progress(&mut self, tmdb_id: u64) -> Result<usize> {
        let before = self.records.len();
        self.records.retain(|r| r.tmdb_id() != tmdb_id);
        let removed = before - self.records.len();

        self.persist()?;
        Ok(removed)
    }

    /// Removes exactly the record identified by `media`.
    pub fn remove_from_continue_watching(&mut self, media: &MediaRef) -> Result<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.media != *media);
        let removed = self.records.len() != before;

        self.persist()?;
        Ok(removed)
    }

    pub fn continue_watching(&self) -> Vec<&WatchProgress> {
        self.continue_watching_at(Utc::now())
    }

    /// Unfinished records watched within the configured window, newest first,
    /// capped at the configured limit.
    pub fn continue_watching_at(&self, now: DateTime<Utc>) -> Vec<&WatchProgress> {
        let cutoff = window_start(now, self.config.continue_watching_days);
        self.records
            .iter()
            .filter(|r| !r.completed && cutoff.map_or(true, |cutoff| r.watched_since(cutoff)))
            .take(self.config.continue_watching_limit)
            .collect()
    }

    pub fn clear_all_progress(&mut self) -> Result<()> {
        self.records.clear();
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        let payload = encode_payload(&self.records).context("Failed to encode watch progress")?;
        self.slots
            .save(STORAGE_KEY, &payload)
            .context("Failed to persist watch progress")
    }
}

/// Start of a window of `days` ending at `now`. `None` means unbounded, which
/// is what a negative or unrepresentable window degrades to.
fn window_start(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days)
        .filter(|window| *window >= Duration::zero())
        .and_then(|window| now.checked_sub_signed(window))
}
