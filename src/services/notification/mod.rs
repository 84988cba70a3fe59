use std::time::Duration;

use anyhow::Result;
use notify_rust::{Notification, Timeout};

use crate::models::settings::CountdownConfig;

/// One-time "now available" alert sent when a countdown reaches zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseAlert {
    pub title: String,
    pub body: String,
    pub duration: Duration,
}

impl ReleaseAlert {
    pub fn for_title(target_title: &str, duration: Duration) -> Self {
        Self {
            title: "🎉 New release unlocked!".to_string(),
            body: format!("{} is now available in the catalog!", target_title),
            duration,
        }
    }
}

/// Delivers release alerts to the user.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseNotifier {
    fn notify_release(&self, alert: &ReleaseAlert) -> Result<()>;
}

/// Shows alerts as desktop notifications through notify-rust.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl ReleaseNotifier for DesktopNotifier {
    fn notify_release(&self, alert: &ReleaseAlert) -> Result<()> {
        let millis = u32::try_from(alert.duration.as_millis()).unwrap_or(u32::MAX);

        Notification::new()
            .summary(&alert.title)
            .body(&alert.body)
            .timeout(Timeout::Milliseconds(millis))
            .show()
            .map_err(|e| anyhow::anyhow!("Failed to show notification: {}", e))?;

        Ok(())
    }
}

/// Desktop notifications when `desktop_notifications` is set, the log otherwise.
pub fn notifier_for(config: &CountdownConfig) -> Box<dyn ReleaseNotifier> {
    if config.desktop_notifications {
        Box::new(DesktopNotifier)
    } else {
        log::debug!("Desktop notifications disabled, release alerts go to the log");
        Box::new(LogNotifier)
    }
}

/// Writes alerts to the log instead of the desktop.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl ReleaseNotifier for LogNotifier {
    fn notify_release(&self, alert: &ReleaseAlert) -> Result<()> {
        log::info!("{} {}", alert.title, alert.body);
        Ok(())
    }
}
