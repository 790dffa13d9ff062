//! Queue snapshots.
//!
//! A snapshot is a tagged JSON document (`{"tag":"Session", ...}`) holding the
//! session identity plus every completed and pending request, optionally
//! zstd-compressed. Snapshots are forensic artifacts: the queue writes them
//! but never reloads them.

use crate::{Method, QueueError, QueueResult, RequestRecord};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// First four bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Snapshot compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Plain JSON.
    None,
    /// zstd level 1. Used for the per-request snapshots.
    #[default]
    Fast,
    /// zstd level 19.
    Best,
}

impl CompressionLevel {
    fn zstd_level(self) -> Option<i32> {
        match self {
            CompressionLevel::None => None,
            CompressionLevel::Fast => Some(1),
            CompressionLevel::Best => Some(19),
        }
    }
}

/// Session identity written into every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: i64,
    pub game_id: i64,
    pub user: Option<String>,
}

/// A request as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersistedRequest {
    pub id: u64,
    pub method: Method,
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub cleared: bool,
    /// Base64-encoded body.
    pub body: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub requested_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub status: Option<u16>,
    #[serde(default)]
    pub network_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistedRequest {
    /// Decoded body bytes.
    pub fn decode_body(&self) -> QueueResult<Option<Vec<u8>>> {
        self.body
            .as_deref()
            .map(|encoded| {
                BASE64
                    .decode(encoded)
                    .map_err(|e| QueueError::InvalidSnapshot(format!("request body: {}", e)))
            })
            .transpose()
    }
}

impl From<&RequestRecord> for PersistedRequest {
    fn from(record: &RequestRecord) -> Self {
        let response = record.response();
        Self {
            id: record.order(),
            method: record.method(),
            url: record.url().map(str::to_string),
            endpoint: record.endpoint().map(str::to_string),
            cleared: record.cleared(),
            body: record.body().map(|body| BASE64.encode(body)),
            submitted_at: record.submitted_at(),
            requested_at: record.requested_at(),
            attempts: record.attempts(),
            status: response.and_then(|r| r.status),
            network_error: response.map(|r| r.network_error).unwrap_or(false),
            error: response.and_then(|r| r.error.clone()),
        }
    }
}

/// Full queue state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionSnapshot {
    pub session_id: i64,
    pub game_id: i64,
    pub user: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Completed requests, oldest first.
    pub past_requests: Vec<PersistedRequest>,
    /// Pending requests, head first.
    pub pending_requests: Vec<PersistedRequest>,
}

impl SessionSnapshot {
    pub fn new(
        session: &SessionInfo,
        created_at: DateTime<Utc>,
        past_requests: Vec<PersistedRequest>,
        pending_requests: Vec<PersistedRequest>,
    ) -> Self {
        Self {
            session_id: session.session_id,
            game_id: session.game_id,
            user: session.user.clone(),
            created_at,
            past_requests,
            pending_requests,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "tag")]
enum Document {
    Session(SessionSnapshot),
}

/// Serialize a snapshot. Identical input gives identical bytes.
pub(crate) fn encode_snapshot(
    snapshot: SessionSnapshot,
    level: CompressionLevel,
) -> QueueResult<Vec<u8>> {
    let json = serde_json::to_vec(&Document::Session(snapshot))?;
    match level.zstd_level() {
        None => Ok(json),
        Some(level) => zstd::encode_all(json.as_slice(), level)
            .map_err(|e| QueueError::Compression(e.to_string())),
    }
}

/// Parse snapshot bytes, compressed or not.
pub fn decode_snapshot(bytes: &[u8]) -> QueueResult<SessionSnapshot> {
    let json = if bytes.starts_with(&ZSTD_MAGIC) {
        zstd::decode_all(bytes).map_err(|e| QueueError::Compression(e.to_string()))?
    } else {
        bytes.to_vec()
    };

    match serde_json::from_slice::<Document>(&json) {
        Ok(Document::Session(snapshot)) => Ok(snapshot),
        Err(e) => Err(QueueError::InvalidSnapshot(e.to_string())),
    }
}

/// Replace `path` with `content` via a synced temp file and rename, so a
/// crash leaves either the old snapshot or the new one.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "snapshot path has no file name"))?;

    fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let write_result = (|| -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;

        fs::rename(&tmp_path, path)?;

        if let Ok(parent_dir) = fs::File::open(dir) {
            let _ = parent_dir.sync_all();
        }
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
