mod persistence;
mod service;

pub use persistence::{
    decode_payload, encode_payload, DecodedPayload, PayloadError, BACKUP_KEY, SCHEMA_VERSION,
    STORAGE_KEY,
};
pub use service::WatchProgressStore;
