//! Checkpoint recording.
//!
//! A checkpoint is a screenshot written to `<output_dir>/<name>.png`. Paths are
//! keyed only by name, so re-running a scenario overwrites earlier artifacts.

use crate::result::{PopshotError, PopshotResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// File extension of checkpoint artifacts
pub const ARTIFACT_EXTENSION: &str = "png";

/// A captured checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// Checkpoint name
    pub name: String,
    /// Index of the screenshot step that captured it
    pub step_index: usize,
    /// Artifact location
    pub path: PathBuf,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Hex SHA-256 of the PNG bytes
    pub sha256: String,
}

/// Check that a checkpoint name maps to a single file inside the artifact directory.
pub fn validate_checkpoint_name(name: &str) -> PopshotResult<()> {
    if name.trim().is_empty() {
        return Err(PopshotError::config("checkpoint name must not be empty"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(PopshotError::config(format!(
            "checkpoint name '{name}' must not contain path separators"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(PopshotError::config(format!(
            "checkpoint name {name:?} contains control characters"
        )));
    }
    Ok(())
}

/// Lowercase hex SHA-256 of `bytes`
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// Writes checkpoint screenshots and remembers what was written
#[derive(Debug)]
pub struct CheckpointRecorder {
    output_dir: PathBuf,
    records: Vec<Checkpoint>,
}

impl CheckpointRecorder {
    /// Recorder writing into `output_dir` (created on first write)
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            records: Vec::new(),
        }
    }

    /// Artifact directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Deterministic artifact path for a checkpoint name
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.{ARTIFACT_EXTENSION}"))
    }

    /// Checkpoints recorded so far, in capture order
    #[must_use]
    pub fn records(&self) -> &[Checkpoint] {
        &self.records
    }

    /// Consume the recorder, returning its checkpoints
    #[must_use]
    pub fn into_records(self) -> Vec<Checkpoint> {
        self.records
    }

    /// Validate `png` and write it under `name`, replacing any earlier artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, the bytes are not a decodable
    /// image, or the file cannot be written.
    pub async fn record(
        &mut self,
        name: &str,
        step_index: usize,
        png: &[u8],
    ) -> PopshotResult<Checkpoint> {
        validate_checkpoint_name(name)?;

        let (width, height) = image::ImageReader::new(Cursor::new(png))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| PopshotError::screenshot(format!("checkpoint '{name}': {e}")))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.artifact_path(name);
        tokio::fs::write(&path, png).await?;

        if let Some(pos) = self.records.iter().position(|c| c.name == name) {
            tracing::warn!(checkpoint = name, "duplicate checkpoint name, overwriting");
            self.records.remove(pos);
        }

        let checkpoint = Checkpoint {
            name: name.to_string(),
            step_index,
            path,
            width,
            height,
            sha256: sha256_hex(png),
        };
        tracing::info!(
            checkpoint = %checkpoint.name,
            path = %checkpoint.path.display(),
            width,
            height,
            "checkpoint written"
        );
        self.records.push(checkpoint.clone());
        Ok(checkpoint)
    }
}
