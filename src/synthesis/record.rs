//! Round Records
//!
//! One JSON Lines file per job under `<records_dir>/<full test name>.jsonl`.
//! Write-only diagnostics; the engine never reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::types::{Result, TestName};
use crate::validation::{Stage, ValidationOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub test_name: String,
    pub round: u32,
    pub passed: bool,
    pub failed_stage: Option<Stage>,
    pub diagnostics: Option<String>,
    pub candidate: String,
    pub timestamp: DateTime<Utc>,
}

impl RoundRecord {
    pub fn new(test: &TestName, round: u32, candidate: &str, outcome: &ValidationOutcome) -> Self {
        Self {
            test_name: test.full_name(),
            round,
            passed: outcome.is_pass(),
            failed_stage: outcome.failed_stage(),
            diagnostics: outcome.diagnostics().map(String::from),
            candidate: candidate.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Appends records for one job
#[derive(Debug, Clone)]
pub struct RecordWriter {
    path: PathBuf,
}

impl RecordWriter {
    /// Start a fresh record file, replacing one left by an earlier run
    pub async fn create(records_dir: &Path, test: &TestName) -> Result<Self> {
        tokio::fs::create_dir_all(records_dir).await?;
        let path = records_dir.join(format!("{}.jsonl", test.full_name()));
        tokio::fs::write(&path, b"").await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &RoundRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
