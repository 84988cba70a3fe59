// Property-based tests for the watch progress store
// Random update sequences against the store's documented invariants

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use tavernastream::models::progress::{MediaRef, ProgressUpdate};
use tavernastream::services::progress::WatchProgressStore;
use tavernastream::services::storage::MemorySlotStore;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn media_ref() -> impl Strategy<Value = MediaRef> {
    prop_oneof![
        (1..20u64).prop_map(MediaRef::movie),
        (1..5u64, 1..3u32, 1..4u32).prop_map(|(id, s, e)| MediaRef::episode(id, s, e)),
    ]
}

fn update() -> impl Strategy<Value = (ProgressUpdate, i64)> {
    (media_ref(), 0.0..=100.0f64, any::<bool>(), 0..(60 * 24 * 90i64)).prop_map(
        |(media, progress, completed, minutes)| {
            (ProgressUpdate::new(media, progress).with_completed(completed), minutes)
        },
    )
}

proptest! {
    /// Property: records at or above 80% are completed whatever the input flag says
    #[test]
    fn prop_high_progress_is_completed((upd, minutes) in update()) {
        let mut store = WatchProgressStore::open(MemorySlotStore::new());
        let at = base() + Duration::minutes(minutes);
        let media = upd.media;
        let progress = upd.progress;
        store.save_progress_at(upd, at).unwrap();

        let record = store.get_progress(&media).unwrap();
        if progress >= 80.0 {
            prop_assert!(record.completed);
        }
    }

    /// Property: identities stay unique and the collection stays newest-first
    #[test]
    fn prop_unique_and_sorted(updates in prop::collection::vec(update(), 1..40)) {
        let mut store = WatchProgressStore::open(MemorySlotStore::new());
        let mut at = base();
        for (upd, minutes) in updates {
            at = at + Duration::minutes(minutes % 600);
            store.save_progress_at(upd, at).unwrap();
        }

        let records = store.records();
        for (i, a) in records.iter().enumerate() {
            for b in &records[i + 1..] {
                prop_assert_ne!(a.media, b.media);
            }
        }
        prop_assert!(records.windows(2).all(|w| w[0].last_watched_at >= w[1].last_watched_at));
    }

    /// Property: the continue-watching row never exceeds 10 unfinished, recent records
    #[test]
    fn prop_continue_watching_bounds(updates in prop::collection::vec(update(), 0..60)) {
        let mut store = WatchProgressStore::open(MemorySlotStore::new());
        for (upd, minutes) in updates {
            store.save_progress_at(upd, base() + Duration::minutes(minutes)).unwrap();
        }

        let now = base() + Duration::days(90);
        let row = store.continue_watching_at(now);
        prop_assert!(row.len() <= 10);
        for record in row {
            prop_assert!(!record.completed);
            prop_assert!(record.last_watched_at > now - Duration::days(30));
        }
    }
}
