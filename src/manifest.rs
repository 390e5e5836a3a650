use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::{PrepError, Result};
use crate::pipeline::StageReport;

/// A file written by a stage, with enough detail to verify it later
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFile {
    pub path: String,
    pub rows: usize,
    pub sha256: String,
}

impl OutputFile {
    /// Hash a file that has just been written and closed
    pub fn describe(path: &Path, rows: usize) -> Result<Self> {
        Ok(Self {
            path: path.display().to_string(),
            rows,
            sha256: checksum_file(path)?,
        })
    }
}

pub fn checksum_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| PrepError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Provenance record for one stage run
#[derive(Debug, Serialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tool_version: &'static str,
    pub variant: Option<String>,
    pub report: StageReport,
}

impl RunManifest {
    pub fn new(started_at: DateTime<Utc>, variant: Option<String>, report: StageReport) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION"),
            variant,
            report,
        }
    }

    pub fn file_name(&self) -> String {
        let variant = self.variant.as_deref().unwrap_or("stimuli");
        format!(
            "{}_{}_{}_{}.json",
            self.report.stage,
            variant,
            self.started_at.format("%Y%m%dT%H%M%S"),
            &self.run_id.simple().to_string()[..8]
        )
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| PrepError::io(dir, e))?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| PrepError::io(&path, e))?;
        info!(path = %path.display(), run_id = %self.run_id, "Wrote run manifest");
        Ok(path)
    }
}
