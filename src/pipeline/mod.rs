// Stage transformations over parsed inputs: design matrix, timing, regressors, assembly

pub mod assemble;
pub mod design_matrix;
pub mod join;
pub mod regressors;
pub mod timing;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::manifest::OutputFile;
use crate::types::MalformedRow;
use join::JoinReport;

pub use design_matrix::DesignMatrix;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedParticipant {
    pub participant: String,
    pub reason: String,
}

/// Everything a stage run did, kept for the run manifest
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub participants_processed: Vec<String>,
    pub participants_skipped: Vec<SkippedParticipant>,
    pub malformed_rows: Vec<MalformedRow>,
    pub joins: Vec<JoinReport>,
    /// Sentinel and exclusion drops by reason
    pub dropped: BTreeMap<String, usize>,
    /// Data-quality findings that did not remove rows
    pub warnings: BTreeMap<String, usize>,
    pub outputs: Vec<OutputFile>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    /// Add a join's counts, merging with an earlier report of the same name
    pub fn record_join(&mut self, report: JoinReport) {
        report.log();
        match self.joins.iter_mut().find(|j| j.name == report.name) {
            Some(existing) => existing.merge(&report),
            None => self.joins.push(report),
        }
    }

    pub fn record_drop(&mut self, reason: &str, rows: usize) {
        if rows > 0 {
            *self.dropped.entry(reason.to_string()).or_default() += rows;
        }
    }

    pub fn record_warning(&mut self, kind: &str, count: usize) {
        if count > 0 {
            *self.warnings.entry(kind.to_string()).or_default() += count;
        }
    }

    pub fn absorb_malformed(&mut self, rows: Vec<MalformedRow>) {
        if let Some(first) = rows.first() {
            warn!(
                path = %first.path,
                rows = rows.len(),
                first_line = first.line,
                reason = %first.reason,
                "Skipped malformed rows"
            );
        }
        self.malformed_rows.extend(rows);
    }

    pub fn skip_participant(&mut self, participant: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(participant, reason = %reason, "Skipping participant");
        self.participants_skipped.push(SkippedParticipant {
            participant: participant.to_string(),
            reason,
        });
    }

    pub fn finish_participant(&mut self, participant: &str) {
        self.participants_processed.push(participant.to_string());
    }

    pub fn record_output(&mut self, output: OutputFile) {
        info!(path = %output.path, rows = output.rows, "Wrote output");
        self.outputs.push(output);
    }

    pub fn rows_written(&self) -> usize {
        self.outputs.iter().map(|o| o.rows).sum()
    }

    pub fn join(&self, name: &str) -> Option<&JoinReport> {
        self.joins.iter().find(|j| j.name == name)
    }

    pub fn dropped(&self, reason: &str) -> usize {
        self.dropped.get(reason).copied().unwrap_or(0)
    }

    pub fn log_summary(&self) {
        info!(
            stage = %self.stage,
            processed = self.participants_processed.len(),
            skipped = self.participants_skipped.len(),
            malformed = self.malformed_rows.len(),
            outputs = self.outputs.len(),
            rows_written = self.rows_written(),
            "Stage finished"
        );
    }
}
