//! Versioned payload format for the watch progress slot.
//!
//! Version 1 is `{"version": 1, "records": [...]}`. A bare JSON array is the
//! unversioned format the web client wrote to local storage and is accepted
//! as version 0.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::progress::WatchProgress;

/// Slot holding the serialized progress collection.
pub const STORAGE_KEY: &str = "tavernastream_watch_progress";

/// Slot receiving the raw payload when loading it lost data.
pub const BACKUP_KEY: &str = "tavernastream_watch_progress.bak";

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("payload has an unexpected shape: {0}")]
    UnexpectedShape(String),
}

#[derive(Serialize)]
struct ProgressSnapshot<'a> {
    version: u32,
    records: &'a [WatchProgress],
}

/// Result of decoding a slot payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub records: Vec<WatchProgress>,
    /// Version the payload was written with.
    pub version: u32,
    /// Records that failed validation and were left out.
    pub dropped: usize,
}

impl DecodedPayload {
    pub fn needs_migration(&self) -> bool {
        self.version < SCHEMA_VERSION
    }

    pub fn is_lossy(&self) -> bool {
        self.dropped > 0
    }
}

pub fn encode_payload(records: &[WatchProgress]) -> Result<String, PayloadError> {
    let snapshot = ProgressSnapshot {
        version: SCHEMA_VERSION,
        records,
    };
    Ok(serde_json::to_string(&snapshot)?)
}

pub fn decode_payload(data: &str) -> Result<DecodedPayload, PayloadError> {
    let (version, items) = match serde_json::from_str::<Value>(data)? {
        Value::Array(items) => (0, items),
        Value::Object(mut map) => {
            let found = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| PayloadError::UnexpectedShape("missing version".to_string()))?;
            if found > u64::from(SCHEMA_VERSION) {
                return Err(PayloadError::UnsupportedVersion {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
            match map.remove("records") {
                Some(Value::Array(items)) => (found as u32, items),
                _ => {
                    return Err(PayloadError::UnexpectedShape(
                        "records is not an array".to_string(),
                    ))
                }
            }
        }
        other => {
            return Err(PayloadError::UnexpectedShape(format!(
                "expected an array or object, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match serde_json::from_value::<WatchProgress>(item) {
            Ok(record) => records.push(record),
            Err(err) => {
                log::warn!("Dropping invalid watch progress record: {}", err);
                dropped += 1;
            }
        }
    }

    let before = records.len();
    let records = normalize(records);
    dropped += before - records.len();

    Ok(DecodedPayload {
        records,
        version,
        dropped,
    })
}

/// Clamps progress into `[0, 100]`, orders by most recently watched and keeps
/// only the newest record per identity.
fn normalize(mut records: Vec<WatchProgress>) -> Vec<WatchProgress> {
    for record in &mut records {
        record.progress = clamp_progress(record.progress);
    }

    records.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));

    let mut seen = HashSet::new();
    records.retain(|record| {
        let first = seen.insert(record.media);
        if !first {
            log::warn!("Dropping duplicate watch progress record for {}", record.media);
        }
        first
    });

    records
}

pub(super) fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
