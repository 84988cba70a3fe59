//! Virtual-time timer queue.
//!
//! Timers never fire on their own. A host loop calls [`TimerQueue::advance_to`]
//! with the current time and dispatches each fired timer to whoever owns its
//! handle, then sleeps for [`TimerQueue::next_due_in`]. Tests drive the same
//! queue with fabricated instants, so nothing waits on the wall clock.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

/// Opaque handle returned when a timer is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A timer that came due during [`TimerQueue::advance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    /// The instant the timer was due, which may be earlier than the advance target.
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Timer {
    due_at: DateTime<Utc>,
    every: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: BTreeMap<TimerHandle, Timer>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, timer: Timer) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.insert(handle, timer);
        handle
    }

    /// Schedules a repeating timer whose first firing is `every` after `now`.
    pub fn schedule_interval(&mut self, now: DateTime<Utc>, every: StdDuration) -> TimerHandle {
        let every = to_chrono(every).max(Duration::milliseconds(1));
        self.insert(Timer {
            due_at: now + every,
            every: Some(every),
        })
    }

    /// Schedules a timer that fires once, `after` from `now`.
    pub fn schedule_once(&mut self, now: DateTime<Utc>, after: StdDuration) -> TimerHandle {
        self.insert(Timer {
            due_at: now + to_chrono(after),
            every: None,
        })
    }

    /// Cancels a timer. Returns false if it had already fired (one-shot) or
    /// was cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Fires every timer due at or before `now`, in due order.
    ///
    /// An interval timer that fell behind fires once, stamped with its most
    /// recent missed period, and its next firing lands on the first period
    /// after `now`. Missed periods are skipped, not replayed.
    pub fn advance_to(&mut self, now: DateTime<Utc>) -> Vec<FiredTimer> {
        let mut fired = Vec::new();

        while let Some((handle, due_at)) = self.earliest() {
            if due_at > now {
                break;
            }

            let every = self.timers.get(&handle).and_then(|timer| timer.every);
            match every {
                Some(every) => {
                    let at = latest_period(due_at, every, now);
                    if let Some(timer) = self.timers.get_mut(&handle) {
                        timer.due_at = at + every;
                    }
                    fired.push(FiredTimer { handle, at });
                }
                None => {
                    self.timers.remove(&handle);
                    fired.push(FiredTimer { handle, at: due_at });
                }
            }
        }

        fired.sort_by_key(|f| (f.at, f.handle));
        fired
    }

    /// Time until the next timer is due, or `None` when the queue is empty.
    pub fn next_due_in(&self, now: DateTime<Utc>) -> Option<StdDuration> {
        self.earliest().map(|(_, due_at)| {
            (due_at - now)
                .to_std()
                .unwrap_or_else(|_| StdDuration::from_secs(0))
        })
    }

    fn earliest(&self) -> Option<(TimerHandle, DateTime<Utc>)> {
        // Ties resolve to the handle scheduled first.
        self.timers
            .iter()
            .min_by_key(|(handle, timer)| (timer.due_at, **handle))
            .map(|(handle, timer)| (*handle, timer.due_at))
    }
}

/// Last instant `due_at + k * every` (k >= 0) that is not after `now`.
fn latest_period(due_at: DateTime<Utc>, every: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    let behind = (now - due_at).num_milliseconds();
    let step = every.num_milliseconds().max(1);
    due_at + Duration::milliseconds(behind - behind % step)
}

fn to_chrono(duration: StdDuration) -> Duration {
    // Out-of-range durations only come from absurd configs; treat them as "never".
    Duration::from_std(duration).unwrap_or_else(|_| Duration::days(365 * 100))
}
