/*!
 * Upload wire protocol
 *
 * One conversation per connection:
 * 1. client sends a frame: u32 big-endian length, then that many bytes of
 *    UTF-8 JSON metadata
 * 2. server replies with a JSON object carrying `status`
 * 3. on "ok", client streams exactly `size` raw payload bytes
 * 4. server replies again with the same shape
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::path::Path;

use crate::core::fingerprint::FileFingerprint;
use crate::error::{Result, UplinkError};

/// Largest server reply read in one go
pub const MAX_RESPONSE_SIZE: usize = 1024;

/// Payload block size when streaming the source file
pub const PAYLOAD_CHUNK_SIZE: usize = 8192;

/// Length prefix size of the metadata frame
pub const FRAME_HEADER_SIZE: usize = 4;

const STATUS_OK: &str = "ok";

/// Handshake payload describing one logical upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub filename: String,
    pub hash: String,
    pub size: u64,
    pub timestamp: i64,
    pub title: String,
    pub description: String,
}

impl UploadMetadata {
    /// Metadata for the given worker's copy of the source file
    pub fn for_worker(filename: String, fingerprint: &FileFingerprint, worker_index: usize) -> Self {
        Self {
            filename,
            hash: fingerprint.hash.clone(),
            size: fingerprint.size,
            timestamp: chrono::Utc::now().timestamp(),
            title: format!("Test Video {}", worker_index),
            description: format!("This is a test upload from worker {}", worker_index),
        }
    }

    /// Compact JSON encoding sent on the wire
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| UplinkError::Encode(e.to_string()))
    }
}

/// Derive `<stem>_<index><ext>` from the source path's base name
///
/// The extension keeps its leading dot, and dot-files without a further
/// extension (`.bashrc`) are treated as all stem.
pub fn logical_filename(path: &Path, worker_index: usize) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, worker_index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, worker_index),
    }
}

/// Build a length-prefixed frame around `payload`
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| UplinkError::FrameTooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Write the metadata frame in full and flush it
///
/// Returns the number of metadata bytes (excluding the prefix).
pub fn write_metadata_frame<W: Write>(writer: &mut W, metadata: &UploadMetadata) -> Result<usize> {
    let body = metadata.to_json_bytes()?;
    let frame = encode_frame(&body)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(body.len())
}

/// Server reply: required `status` plus whatever else the server sent
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerResponse {
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerResponse {
    /// Parse a reply; anything but a JSON object with a string `status` is malformed
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| UplinkError::MalformedResponse(format!("invalid UTF-8: {}", e)))?;
        let response: ServerResponse = serde_json::from_str(text.trim())?;
        Ok(response)
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Human-readable reason, if the server gave one
    pub fn message(&self) -> Option<&str> {
        self.extra.get("message").and_then(Value::as_str)
    }

    /// Server-assigned identifier for the upload
    pub fn video_id(&self) -> Option<&str> {
        self.extra.get("video_id").and_then(Value::as_str)
    }
}

/// Read one reply of at most `MAX_RESPONSE_SIZE` bytes
pub fn read_response<R: Read>(reader: &mut R) -> Result<ServerResponse> {
    let mut buffer = [0u8; MAX_RESPONSE_SIZE];
    let n = reader.read(&mut buffer)?;
    if n == 0 {
        return Err(UplinkError::MalformedResponse(
            "connection closed before a response was received".to_string(),
        ));
    }
    ServerResponse::parse(&buffer[..n])
}
