use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use super::controller::ReleaseCountdown;
use crate::models::countdown::CountdownView;
use crate::services::scheduler::TimerQueue;

/// Upper bound on a single sleep so a stalled queue still re-checks the clock.
const MAX_IDLE: StdDuration = StdDuration::from_secs(1);

/// Drives a countdown on the wall clock until its banner has been hidden,
/// calling `on_view` whenever the rendered view changes.
pub fn run_until_finished<F>(countdown: &mut ReleaseCountdown, queue: &mut TimerQueue, on_view: F)
where
    F: FnMut(&CountdownView),
{
    run_until_finished_with(countdown, queue, Utc::now, thread::sleep, on_view);
}

/// Same loop with an injectable clock and sleeper.
pub fn run_until_finished_with<C, S, F>(
    countdown: &mut ReleaseCountdown,
    queue: &mut TimerQueue,
    mut clock: C,
    mut sleep: S,
    mut on_view: F,
) where
    C: FnMut() -> DateTime<Utc>,
    S: FnMut(StdDuration),
    F: FnMut(&CountdownView),
{
    countdown.mount(queue, clock());

    let mut last_view = countdown.view();
    on_view(&last_view);

    while !countdown.state().is_finished() {
        let wait = queue
            .next_due_in(clock())
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE));
        sleep(wait);

        let handled = countdown.advance(queue, clock());
        log::trace!("Countdown loop handled {} timer(s)", handled);

        let view = countdown.view();
        if view != last_view {
            on_view(&view);
            last_view = view;
        }
    }

    countdown.unmount(queue);
}
