// Release countdown module
// Target identity, per-instance state and the renderable view model

use chrono::{DateTime, Duration, Utc};

use super::progress::MediaType;
use crate::utils::time::{format_time_remaining, TimeBreakdown};

/// Default TMDB image base used to build backdrop URLs.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/original";

/// The unreleased catalog item a countdown gates.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseTarget {
    pub tmdb_id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub backdrop_path: Option<String>,
    pub release_at: DateTime<Utc>,
}

impl ReleaseTarget {
    pub fn new(
        tmdb_id: u64,
        media_type: MediaType,
        title: impl Into<String>,
        release_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tmdb_id,
            media_type,
            title: title.into(),
            backdrop_path: None,
            release_at,
        }
    }

    pub fn with_backdrop(mut self, path: impl Into<String>) -> Self {
        self.backdrop_path = Some(path.into());
        self
    }

    /// Full backdrop image URL, if the target has a backdrop path.
    pub fn backdrop_url(&self, image_base_url: &str) -> Option<String> {
        self.backdrop_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(|path| format!("{}{}", image_base_url.trim_end_matches('/'), path))
    }

    /// Milliseconds left until release; negative once the release has passed.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.release_at - now).num_milliseconds()
    }
}

/// Mutable state of one countdown instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountdownState {
    /// Milliseconds until release, pinned to 0 once released.
    pub time_remaining_ms: i64,
    /// Latched the first time the remaining time reaches zero.
    pub is_released: bool,
    pub exists_in_catalog: bool,
    /// True until the first catalog check has finished, whatever its outcome.
    pub is_checking_catalog: bool,
    pub is_expanded: bool,
    pub show_available_message: bool,
}

impl CountdownState {
    pub fn new() -> Self {
        Self {
            is_checking_catalog: true,
            ..Self::default()
        }
    }

    /// Blocked is informational only: nothing is prevented, the UI just warns.
    pub fn is_blocked(&self) -> bool {
        !self.exists_in_catalog && !self.is_released
    }

    /// Released and the banner is gone: nothing will ever be shown again.
    pub fn is_finished(&self) -> bool {
        self.is_released && !self.show_available_message
    }

    pub fn remaining(&self) -> Duration {
        Duration::milliseconds(self.time_remaining_ms.max(0))
    }
}

/// Expanded detail panel contents.
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownPanel {
    pub title: String,
    pub blocked: bool,
    pub heading: &'static str,
    pub countdown_label: &'static str,
    pub remaining: String,
    pub breakdown: TimeBreakdown,
    pub backdrop_url: Option<String>,
    pub warning: Option<&'static str>,
}

/// What a countdown instance wants rendered right now.
#[derive(Debug, Clone, PartialEq)]
pub enum CountdownView {
    /// Nothing to show: still checking the catalog, or the banner was dismissed.
    Hidden,
    /// Collapsed badge.
    Badge {
        blocked: bool,
        label: &'static str,
        remaining: String,
    },
    /// Expanded detail panel.
    Panel(CountdownPanel),
    /// Transient "now available" banner shown after release.
    Available { title: String, message: &'static str },
}

impl CountdownView {
    /// Builds the view for `state`, in the same precedence the widget renders:
    /// finished, then checking, then the banner, then badge or panel.
    pub fn build(target: &ReleaseTarget, state: &CountdownState, image_base_url: &str) -> Self {
        if state.is_finished() || state.is_checking_catalog {
            return CountdownView::Hidden;
        }

        if state.is_released {
            return CountdownView::Available {
                title: target.title.clone(),
                message: "This title is now available in the catalog. Enjoy!",
            };
        }

        let blocked = state.is_blocked();
        let remaining = format_time_remaining(state.time_remaining_ms);

        if !state.is_expanded {
            return CountdownView::Badge {
                blocked,
                label: if blocked { "Blocked" } else { "Coming soon" },
                remaining,
            };
        }

        CountdownView::Panel(CountdownPanel {
            title: target.title.clone(),
            blocked,
            heading: if blocked { "Access blocked" } else { "Releasing in" },
            countdown_label: if blocked { "Unlocks in" } else { "Available in" },
            remaining,
            breakdown: TimeBreakdown::from_millis(state.time_remaining_ms),
            backdrop_url: target.backdrop_url(image_base_url),
            warning: blocked.then_some("This title is not yet available in the catalog"),
        })
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, CountdownView::Hidden)
    }
}
