//! Release countdown controller.
//!
//! Owns the state of one countdown instance and reacts to the three timers it
//! schedules on a shared [`TimerQueue`]: the catalog poll, the per-second
//! tick, and the one-shot auto-hide armed on release.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::countdown::{CountdownState, CountdownView, ReleaseTarget};
use crate::models::settings::CountdownConfig;
use crate::services::catalog::CatalogChecker;
use crate::services::notification::{ReleaseAlert, ReleaseNotifier};
use crate::services::scheduler::{FiredTimer, TimerHandle, TimerQueue};

#[derive(Debug, Default)]
struct CountdownTimers {
    catalog_poll: Option<TimerHandle>,
    tick: Option<TimerHandle>,
    auto_hide: Option<TimerHandle>,
}

pub struct ReleaseCountdown {
    target: ReleaseTarget,
    state: CountdownState,
    config: CountdownConfig,
    image_base_url: String,
    catalog: Box<dyn CatalogChecker>,
    notifier: Box<dyn ReleaseNotifier>,
    timers: CountdownTimers,
}

impl ReleaseCountdown {
    pub fn new(
        target: ReleaseTarget,
        config: CountdownConfig,
        image_base_url: impl Into<String>,
        catalog: Box<dyn CatalogChecker>,
        notifier: Box<dyn ReleaseNotifier>,
    ) -> Self {
        Self {
            target,
            state: CountdownState::new(),
            config,
            image_base_url: image_base_url.into(),
            catalog,
            notifier,
            timers: CountdownTimers::default(),
        }
    }

    pub fn target(&self) -> &ReleaseTarget {
        &self.target
    }

    pub fn state(&self) -> &CountdownState {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.timers.tick.is_some()
    }

    /// Starts the catalog poll and the tick, running each once immediately.
    pub fn mount(&mut self, queue: &mut TimerQueue, now: DateTime<Utc>) {
        if self.is_mounted() {
            log::warn!("Countdown for {} is already mounted", self.target.title);
            return;
        }

        log::info!(
            "Mounting countdown for {} ({}/{}), release at {}",
            self.target.title,
            self.target.media_type,
            self.target.tmdb_id,
            self.target.release_at
        );

        self.timers.catalog_poll =
            Some(queue.schedule_interval(now, self.config.catalog_poll_interval()));
        self.timers.tick = Some(queue.schedule_interval(now, self.config.tick_interval()));

        self.poll_catalog();
        self.tick(queue, now);
    }

    /// Cancels every timer this instance owns.
    pub fn unmount(&mut self, queue: &mut TimerQueue) {
        let timers = std::mem::take(&mut self.timers);
        for handle in [timers.catalog_poll, timers.tick, timers.auto_hide]
            .into_iter()
            .flatten()
        {
            queue.cancel(handle);
        }
        log::debug!("Unmounted countdown for {}", self.target.title);
    }

    /// Dispatches a fired timer. Returns false if the handle is not ours.
    pub fn handle_timer(&mut self, fired: &FiredTimer, queue: &mut TimerQueue) -> bool {
        let handle = Some(fired.handle);

        if handle == self.timers.catalog_poll {
            self.poll_catalog();
        } else if handle == self.timers.tick {
            self.tick(queue, fired.at);
        } else if handle == self.timers.auto_hide {
            self.timers.auto_hide = None;
            log::debug!("Auto-hiding release banner for {}", self.target.title);
            self.state.show_available_message = false;
        } else {
            return false;
        }

        true
    }

    /// Runs every timer due at `now` that belongs to this instance.
    /// Returns how many were handled.
    pub fn advance(&mut self, queue: &mut TimerQueue, now: DateTime<Utc>) -> usize {
        queue
            .advance_to(now)
            .iter()
            .filter(|fired| self.handle_timer(fired, queue))
            .count()
    }

    /// Queries the catalog and records the answer.
    pub fn poll_catalog(&mut self) {
        let result = self
            .catalog
            .exists(self.target.tmdb_id, self.target.media_type);
        self.apply_catalog_result(result);
    }

    /// Records a catalog answer. Failures keep the last known value.
    pub fn apply_catalog_result(&mut self, result: Result<bool>) {
        match result {
            Ok(exists) => {
                if exists != self.state.exists_in_catalog {
                    log::debug!(
                        "Catalog presence for {} changed to {}",
                        self.target.title,
                        exists
                    );
                }
                self.state.exists_in_catalog = exists;
            }
            Err(err) => {
                log::warn!("Error checking catalog for {}: {:#}", self.target.title, err);
            }
        }
        self.state.is_checking_catalog = false;
    }

    /// Recomputes the remaining time and performs the release transition the
    /// first time it reaches zero.
    pub fn tick(&mut self, queue: &mut TimerQueue, now: DateTime<Utc>) {
        let remaining = self.target.remaining_ms(now);

        if remaining > 0 {
            self.state.time_remaining_ms = remaining;
            return;
        }

        self.state.time_remaining_ms = 0;
        if self.state.is_released {
            return;
        }

        self.state.is_released = true;
        self.state.show_available_message = true;
        log::info!("{} is now released", self.target.title);

        let alert = ReleaseAlert::for_title(&self.target.title, self.config.notification_duration());
        if let Err(err) = self.notifier.notify_release(&alert) {
            log::warn!("Failed to deliver release alert for {}: {:#}", self.target.title, err);
        }

        self.timers.auto_hide = Some(queue.schedule_once(now, self.config.auto_hide_after()));
    }

    /// Hides the release banner for good. No-op before release.
    pub fn dismiss_available(&mut self, queue: &mut TimerQueue) -> bool {
        if !self.state.is_released || !self.state.show_available_message {
            return false;
        }

        self.state.show_available_message = false;
        if let Some(handle) = self.timers.auto_hide.take() {
            queue.cancel(handle);
        }
        true
    }

    pub fn expand(&mut self) {
        self.state.is_expanded = true;
    }

    pub fn collapse(&mut self) {
        self.state.is_expanded = false;
    }

    pub fn toggle_expanded(&mut self) {
        self.state.is_expanded = !self.state.is_expanded;
    }

    pub fn view(&self) -> CountdownView {
        CountdownView::build(&self.target, &self.state, &self.image_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::progress::MediaType;
    use crate::services::catalog::MockCatalogChecker;
    use crate::services::notification::MockReleaseNotifier;
    use chrono::{Duration, TimeZone};
    use mockall::predicate::eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap()
    }

    fn target(release_in_secs: i64) -> ReleaseTarget {
        ReleaseTarget::new(
            872585,
            MediaType::Movie,
            "Oppenheimer",
            t0() + Duration::seconds(release_in_secs),
        )
    }

    fn catalog_returning(exists: bool) -> Box<MockCatalogChecker> {
        let mut catalog = MockCatalogChecker::new();
        catalog.expect_exists().returning(move |_, _| Ok(exists));
        Box::new(catalog)
    }

    fn silent_notifier() -> Box<MockReleaseNotifier> {
        let mut notifier = MockReleaseNotifier::new();
        notifier.expect_notify_release().returning(|_| Ok(()));
        Box::new(notifier)
    }

    fn countdown(
        release_in_secs: i64,
        catalog: Box<dyn CatalogChecker>,
        notifier: Box<dyn ReleaseNotifier>,
    ) -> ReleaseCountdown {
        ReleaseCountdown::new(
            target(release_in_secs),
            CountdownConfig::default(),
            "https://image.tmdb.org/t/p/original",
            catalog,
            notifier,
        )
    }

    #[test]
    fn hidden_until_first_catalog_check() {
        let widget = countdown(90, catalog_returning(true), silent_notifier());
        assert!(widget.view().is_hidden());
    }

    #[test]
    fn mount_checks_catalog_and_formats_remaining_time() {
        let mut catalog = MockCatalogChecker::new();
        catalog
            .expect_exists()
            .with(eq(872585), eq(MediaType::Movie))
            .times(1)
            .returning(|_, _| Ok(true));

        let mut queue = TimerQueue::new();
        let mut widget = countdown(90, Box::new(catalog), silent_notifier());
        widget.mount(&mut queue, t0());

        assert_eq!(
            widget.view(),
            CountdownView::Badge {
                blocked: false,
                label: "Coming soon",
                remaining: "1m 30s".to_string(),
            }
        );

        widget.advance(&mut queue, t0() + Duration::seconds(5));
        assert!(matches!(
            widget.view(),
            CountdownView::Badge { ref remaining, .. } if remaining == "1m 25s"
        ));
    }

    #[test]
    fn catalog_is_polled_every_thirty_seconds() {
        let mut catalog = MockCatalogChecker::new();
        catalog.expect_exists().times(3).returning(|_, _| Ok(false));

        let mut queue = TimerQueue::new();
        let mut widget = countdown(3600, Box::new(catalog), silent_notifier());
        widget.mount(&mut queue, t0());
        widget.advance(&mut queue, t0() + Duration::seconds(30));
        widget.advance(&mut queue, t0() + Duration::seconds(60));
        assert!(widget.state().is_blocked());
    }

    #[test]
    fn stalled_host_polls_catalog_once_on_resume() {
        let mut catalog = MockCatalogChecker::new();
        catalog
            .expect_exists()
            .times(2)
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

        let mut queue = TimerQueue::new();
        let mut widget = countdown(7200, Box::new(catalog), silent_notifier());
        widget.mount(&mut queue, t0());

        // One poll and one tick, not an hour of backlog.
        assert_eq!(widget.advance(&mut queue, t0() + Duration::hours(1)), 2);
        assert_eq!(widget.state().time_remaining_ms, 3_600_000);
    }

    #[test]
    fn failed_catalog_check_keeps_last_known_value() {
        let mut calls = 0;
        let mut catalog = MockCatalogChecker::new();
        catalog.expect_exists().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(true)
            } else {
                Err(anyhow::anyhow!("connection refused"))
            }
        });

        let mut queue = TimerQueue::new();
        let mut widget = countdown(3600, Box::new(catalog), silent_notifier());
        widget.mount(&mut queue, t0());
        assert!(widget.state().exists_in_catalog);

        widget.advance(&mut queue, t0() + Duration::seconds(30));
        assert!(widget.state().exists_in_catalog);
    }

    #[test]
    fn failed_first_check_still_renders_as_blocked() {
        let mut catalog = MockCatalogChecker::new();
        catalog
            .expect_exists()
            .returning(|_, _| Err(anyhow::anyhow!("HTTP 500")));

        let mut queue = TimerQueue::new();
        let mut widget = countdown(3600, Box::new(catalog), silent_notifier());
        widget.mount(&mut queue, t0());

        assert!(matches!(widget.view(), CountdownView::Badge { blocked: true, .. }));
    }

    #[test]
    fn release_notifies_exactly_once() {
        let mut notifier = MockReleaseNotifier::new();
        notifier
            .expect_notify_release()
            .withf(|alert| alert.body.contains("Oppenheimer") && alert.duration.as_secs() == 10)
            .times(1)
            .returning(|_| Ok(()));

        let mut queue = TimerQueue::new();
        let mut widget = countdown(3, catalog_returning(true), Box::new(notifier));
        widget.mount(&mut queue, t0());

        // Tick well past zero, one second at a time.
        for s in 1..=20 {
            widget.advance(&mut queue, t0() + Duration::seconds(s));
        }

        assert!(widget.state().is_released);
        assert_eq!(widget.state().time_remaining_ms, 0);
        assert!(matches!(widget.view(), CountdownView::Available { .. }));
    }

    #[test]
    fn release_arms_a_single_auto_hide_timer() {
        let mut queue = TimerQueue::new();
        let mut widget = countdown(1, catalog_returning(true), silent_notifier());
        widget.mount(&mut queue, t0());

        widget.advance(&mut queue, t0() + Duration::seconds(1));
        widget.advance(&mut queue, t0() + Duration::seconds(10));
        // catalog poll + tick + auto-hide
        assert_eq!(queue.active_count(), 3);

        widget.advance(&mut queue, t0() + Duration::seconds(1 + 299));
        assert!(matches!(widget.view(), CountdownView::Available { .. }));

        widget.advance(&mut queue, t0() + Duration::seconds(1 + 300));
        assert!(widget.state().is_finished());
        assert!(widget.view().is_hidden());
        assert_eq!(queue.active_count(), 2);
    }

    #[test]
    fn notification_failure_still_latches_release() {
        let mut notifier = MockReleaseNotifier::new();
        notifier
            .expect_notify_release()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("no notification daemon")));

        let mut queue = TimerQueue::new();
        let mut widget = countdown(0, catalog_returning(true), Box::new(notifier));
        widget.mount(&mut queue, t0());
        widget.advance(&mut queue, t0() + Duration::seconds(5));

        assert!(widget.state().is_released);
        assert!(widget.state().show_available_message);
    }

    #[test]
    fn dismissing_banner_hides_permanently() {
        let mut queue = TimerQueue::new();
        let mut widget = countdown(0, catalog_returning(true), silent_notifier());
        widget.mount(&mut queue, t0());
        assert!(matches!(widget.view(), CountdownView::Available { .. }));

        assert!(widget.dismiss_available(&mut queue));
        assert!(widget.view().is_hidden());
        assert!(!widget.dismiss_available(&mut queue));

        widget.expand();
        widget.advance(&mut queue, t0() + Duration::minutes(10));
        assert!(widget.view().is_hidden());
    }

    #[test]
    fn dismiss_before_release_is_ignored() {
        let mut queue = TimerQueue::new();
        let mut widget = countdown(60, catalog_returning(true), silent_notifier());
        widget.mount(&mut queue, t0());
        assert!(!widget.dismiss_available(&mut queue));
        assert!(!widget.view().is_hidden());
    }

    #[test]
    fn unmount_cancels_every_timer() {
        let mut queue = TimerQueue::new();
        let mut widget = countdown(1, catalog_returning(true), silent_notifier());
        widget.mount(&mut queue, t0());
        widget.advance(&mut queue, t0() + Duration::seconds(2));
        assert_eq!(queue.active_count(), 3);

        widget.unmount(&mut queue);
        assert!(queue.is_empty());
        assert!(!widget.is_mounted());
    }

    #[test]
    fn expand_switches_to_panel() {
        let mut queue = TimerQueue::new();
        let mut widget = countdown(90_000, catalog_returning(false), silent_notifier());
        widget.mount(&mut queue, t0());

        widget.toggle_expanded();
        let CountdownView::Panel(panel) = widget.view() else {
            panic!("expected the expanded panel");
        };
        assert_eq!(panel.remaining, "1d 1h 0m");
        assert_eq!(panel.heading, "Access blocked");
        assert_eq!(panel.breakdown.days, 1);

        widget.collapse();
        assert!(matches!(widget.view(), CountdownView::Badge { .. }));
    }

    #[test]
    fn foreign_timers_are_not_handled() {
        let mut queue = TimerQueue::new();
        let mut widget = countdown(3600, catalog_returning(true), silent_notifier());
        widget.mount(&mut queue, t0());

        let other = queue.schedule_once(t0(), std::time::Duration::from_millis(500));
        let fired = FiredTimer { handle: other, at: t0() };
        assert!(!widget.handle_timer(&fired, &mut queue));
    }
}
