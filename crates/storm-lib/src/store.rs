//! Binary model artifacts
//!
//! An artifact is a fixed header followed by a JSON payload holding the
//! schema and the trained model:
//!
//! ```text
//! magic "STORMGBT" | version u16 | sha256(payload) [32] | payload len u64 | payload
//! ```
//!
//! All integers are little-endian. Writes go through a temp file and a
//! rename so a crash never leaves a half-written artifact at `path`.

use crate::error::{Result, StormError};
use crate::models::Schema;
use crate::pipeline::TrainedModel;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MAGIC: &[u8; MAGIC_LEN] = b"STORMGBT";
pub const FORMAT_VERSION: u16 = 1;

const MAGIC_LEN: usize = 8;
const CHECKSUM_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC_LEN + 2 + CHECKSUM_LEN + 8;

/// Default artifact size limit (64MB)
const DEFAULT_MAX_ARTIFACT_SIZE: usize = 64 * 1024 * 1024;

#[derive(Serialize)]
struct PayloadRef<'a> {
    schema: &'a Schema,
    model: &'a TrainedModel,
}

#[derive(Deserialize)]
struct Payload {
    schema: Schema,
    model: TrainedModel,
}

/// Details of a written artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: u64,
}

/// Saves and loads trained models
#[derive(Debug, Clone)]
pub struct ModelStore {
    max_artifact_size: usize,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self {
            max_artifact_size: DEFAULT_MAX_ARTIFACT_SIZE,
        }
    }
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_artifact_size(max_artifact_size: usize) -> Self {
        Self { max_artifact_size }
    }

    /// Persist `model` with the schema it was trained against
    pub fn save(&self, model: &TrainedModel, schema: &Schema, path: &Path) -> Result<ArtifactInfo> {
        let payload = serde_json::to_vec(&PayloadRef { schema, model })
            .map_err(|e| StormError::format(path, format!("failed to serialize model: {}", e)))?;
        let checksum = Sha256::digest(&payload);

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&checksum);
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);

        if bytes.len() > self.max_artifact_size {
            return Err(StormError::format(
                path,
                format!(
                    "artifact size {} exceeds maximum {}",
                    bytes.len(),
                    self.max_artifact_size
                ),
            ));
        }

        write_atomic(path, &bytes)?;

        let info = ArtifactInfo {
            path: path.to_path_buf(),
            checksum: hex::encode(checksum),
            size_bytes: bytes.len() as u64,
        };
        info!(
            label_column = %model.target(),
            path = %path.display(),
            size = info.size_bytes,
            checksum = %info.checksum,
            "Model artifact written"
        );
        Ok(info)
    }

    /// Reconstruct a model and its schema from an artifact
    pub fn load(&self, path: &Path) -> Result<(TrainedModel, Schema)> {
        let bytes = fs::read(path).map_err(|e| StormError::from_io(path, e))?;

        if bytes.len() > self.max_artifact_size {
            return Err(StormError::format(
                path,
                format!(
                    "artifact size {} exceeds maximum {}",
                    bytes.len(),
                    self.max_artifact_size
                ),
            ));
        }
        if bytes.len() < HEADER_LEN {
            return Err(StormError::format(path, "truncated header"));
        }

        let (magic, rest) = bytes.split_at(MAGIC_LEN);
        if magic != MAGIC {
            return Err(StormError::format(path, "not a storm model artifact"));
        }

        let (version, rest) = rest.split_at(2);
        let version = u16::from_le_bytes([version[0], version[1]]);
        if version != FORMAT_VERSION {
            return Err(StormError::format(
                path,
                format!("unsupported format version {}", version),
            ));
        }

        let (expected_checksum, rest) = rest.split_at(CHECKSUM_LEN);
        let (len, payload) = rest.split_at(8);
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(len);
        let declared_len = u64::from_le_bytes(len_bytes);
        if declared_len != payload.len() as u64 {
            return Err(StormError::format(
                path,
                format!(
                    "payload length {} does not match declared {}",
                    payload.len(),
                    declared_len
                ),
            ));
        }

        let computed = Sha256::digest(payload);
        if computed.as_slice() != expected_checksum {
            return Err(StormError::format(
                path,
                format!(
                    "checksum mismatch: expected {}, got {}",
                    hex::encode(expected_checksum),
                    hex::encode(computed)
                ),
            ));
        }

        let Payload { schema, model } = serde_json::from_slice(payload)
            .map_err(|e| StormError::format(path, format!("malformed payload: {}", e)))?;

        let pipeline = model.pipeline();
        let required = std::iter::once(pipeline.target())
            .chain(pipeline.feature_fields().iter().copied());
        for field in required {
            if !schema.contains(field.column_name()) {
                return Err(StormError::format(
                    path,
                    format!("schema is missing column {}", field),
                ));
            }
        }

        debug!(
            label_column = %model.target(),
            path = %path.display(),
            version = version,
            "Model artifact loaded"
        );
        Ok((model, schema))
    }
}

/// Write to a temp file first, then rename into place
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StormError::from_io(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).map_err(|e| StormError::from_io(&temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| StormError::from_io(&temp_path, e))?;
    file.sync_all()
        .map_err(|e| StormError::from_io(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| StormError::from_io(path, e))?;
    Ok(())
}
