// Watch progress module
// Per-title and per-episode playback position records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of catalog item a progress record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("Unknown media type: {}", other)),
        }
    }
}

/// Identity of a progress record.
///
/// Movies are keyed by their TMDB id alone; episodes additionally carry the
/// season and episode numbers. Two records with equal `MediaRef`s are the
/// same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaRef {
    Movie {
        tmdb_id: u64,
    },
    Episode {
        tmdb_id: u64,
        season_number: u32,
        episode_number: u32,
    },
}

impl MediaRef {
    pub fn movie(tmdb_id: u64) -> Self {
        MediaRef::Movie { tmdb_id }
    }

    pub fn episode(tmdb_id: u64, season_number: u32, episode_number: u32) -> Self {
        MediaRef::Episode {
            tmdb_id,
            season_number,
            episode_number,
        }
    }

    /// Builds a key from the loose `(tmdbId, mediaType, season?, episode?)`
    /// form. Season and episode are ignored for movies; a tv key missing
    /// either number cannot identify a record and yields `None`.
    pub fn from_parts(
        tmdb_id: u64,
        media_type: MediaType,
        season_number: Option<u32>,
        episode_number: Option<u32>,
    ) -> Option<Self> {
        match media_type {
            MediaType::Movie => Some(Self::movie(tmdb_id)),
            MediaType::Tv => Some(Self::episode(tmdb_id, season_number?, episode_number?)),
        }
    }

    pub fn tmdb_id(&self) -> u64 {
        match *self {
            MediaRef::Movie { tmdb_id } | MediaRef::Episode { tmdb_id, .. } => tmdb_id,
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            MediaRef::Movie { .. } => MediaType::Movie,
            MediaRef::Episode { .. } => MediaType::Tv,
        }
    }

    pub fn season_number(&self) -> Option<u32> {
        match *self {
            MediaRef::Episode { season_number, .. } => Some(season_number),
            MediaRef::Movie { .. } => None,
        }
    }

    pub fn episode_number(&self) -> Option<u32> {
        match *self {
            MediaRef::Episode { episode_number, .. } => Some(episode_number),
            MediaRef::Movie { .. } => None,
        }
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaRef::Movie { tmdb_id } => write!(f, "movie/{}", tmdb_id),
            MediaRef::Episode {
                tmdb_id,
                season_number,
                episode_number,
            } => write!(f, "tv/{} S{:02}E{:02}", tmdb_id, season_number, episode_number),
        }
    }
}

/// A progress write before it has been stamped by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub media: MediaRef,
    /// Playback completion percentage in `[0, 100]`.
    pub progress: f64,
    pub completed: bool,
}

impl ProgressUpdate {
    pub fn new(media: MediaRef, progress: f64) -> Self {
        Self {
            media,
            progress,
            completed: false,
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// A stored watch progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WatchProgressRecord", into = "WatchProgressRecord")]
pub struct WatchProgress {
    pub media: MediaRef,
    pub progress: f64,
    pub completed: bool,
    pub last_watched_at: DateTime<Utc>,
}

impl WatchProgress {
    pub fn tmdb_id(&self) -> u64 {
        self.media.tmdb_id()
    }

    pub fn media_type(&self) -> MediaType {
        self.media.media_type()
    }

    /// Whether the record was last touched strictly after `cutoff`.
    pub fn watched_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_watched_at > cutoff
    }
}

/// Flat camelCase wire shape shared with the web client's local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchProgressRecord {
    tmdb_id: u64,
    media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    season_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    episode_number: Option<u32>,
    progress: f64,
    #[serde(default)]
    completed: bool,
    last_watched_at: DateTime<Utc>,
}

impl TryFrom<WatchProgressRecord> for WatchProgress {
    type Error = String;

    fn try_from(record: WatchProgressRecord) -> Result<Self, Self::Error> {
        let media = MediaRef::from_parts(
            record.tmdb_id,
            record.media_type,
            record.season_number,
            record.episode_number,
        )
        .ok_or_else(|| {
            format!(
                "tv record {} is missing its season or episode number",
                record.tmdb_id
            )
        })?;

        Ok(Self {
            media,
            progress: record.progress,
            completed: record.completed,
            last_watched_at: record.last_watched_at,
        })
    }
}

impl From<WatchProgress> for WatchProgressRecord {
    fn from(progress: WatchProgress) -> Self {
        Self {
            tmdb_id: progress.media.tmdb_id(),
            media_type: progress.media.media_type(),
            season_number: progress.media.season_number(),
            episode_number: progress.media.episode_number(),
            progress: progress.progress,
            completed: progress.completed,
            last_watched_at: progress.last_watched_at,
        }
    }
}
