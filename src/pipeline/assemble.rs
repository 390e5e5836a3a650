//! Observation table: ERP amplitudes joined with their baseline, the word
//! predictors, electrode positions and per-event artifact/sequence info.

use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

use super::join::{JoinKind, JoinReport, Lookup, Match};
use super::{DesignMatrix, StageReport};
use crate::config::{Capabilities, JoinConfig, VariantPlan};
use crate::constants::EXPORTED_EVENTLIST;
use crate::error::Result;
use crate::identifiers::BinScheme;
use crate::types::{
    ArtifactRecord, ElectrodeCoordinate, ExportedEvent, Measurement, MeasurementRow, ObservationRow, WordRecord,
};

pub const BASELINE_JOIN: &str = "assemble.baseline";
pub const DESIGN_MATRIX_JOIN: &str = "assemble.design_matrix";
pub const ELECTRODE_JOIN: &str = "assemble.electrodes";
pub const ARTIFACT_JOIN: &str = "assemble.artifacts";

#[derive(Debug, Clone)]
pub struct AssemblyRules {
    pub bin_scheme: BinScheme,
    pub capabilities: Capabilities,
    /// Participant labels selected for this run
    pub selected: HashSet<String>,
    pub excluded: HashSet<String>,
    pub fail_on_ambiguous: bool,
}

impl AssemblyRules {
    pub fn from_plan(plan: &VariantPlan, joins: &JoinConfig) -> Self {
        Self {
            bin_scheme: plan.bin_scheme,
            capabilities: plan.capabilities,
            selected: plan.participants.iter().map(|p| p.label.clone()).collect(),
            excluded: plan.excluded_participants.iter().map(|p| p.label.clone()).collect(),
            fail_on_ambiguous: joins.fail_on_ambiguous,
        }
    }
}

/// Artifact and ordering records for all participants, plus those whose
/// eventlist could not be read
#[derive(Debug, Clone, Default)]
pub struct ArtifactTable {
    pub records: Vec<ArtifactRecord>,
    pub missing: HashSet<String>,
}

/// Per-event records from one participant's rejection eventlist.
/// Events are resolved to canonical bins; events without a word are dropped.
pub fn artifact_records(
    participant: &str,
    events: &[ExportedEvent],
    matrix: &DesignMatrix,
    scheme: BinScheme,
    capabilities: Capabilities,
    report: &mut StageReport,
) -> Vec<ArtifactRecord> {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut records = Vec::with_capacity(events.len());
    let mut unmapped = 0;

    for event in events {
        let Some(word) = matrix.resolve(scheme, event.bin) else {
            unmapped += 1;
            continue;
        };
        let clean = !capabilities.artifact_rejection
            || event.flags.as_deref() == Some(EXPORTED_EVENTLIST.clean_flags);
        let sentence_order = capabilities.sentence_order.then(|| {
            let next = order.len();
            *order.entry(word.sentence_id.as_str()).or_insert(next)
        });
        records.push(ArtifactRecord {
            participant: participant.to_string(),
            bin_id: word.bin_id,
            clean,
            sentence_order,
        });
    }
    report.record_drop("artifact_events_without_word", unmapped);
    records
}

fn bin_outcome<'a>(matrix: &'a DesignMatrix, scheme: BinScheme, bin: u32) -> Match<'a, WordRecord> {
    match matrix.resolve(scheme, bin) {
        Some(word) => Match::One(word),
        None if scheme == BinScheme::Old && matrix.bin_map().is_ambiguous_old(bin) => Match::Ambiguous(2),
        None => Match::Missing,
    }
}

/// Join everything into observation rows, in amplitude-table order
#[instrument(skip_all, fields(amplitude = amplitude.len(), baseline = baseline.len()))]
pub fn assemble(
    amplitude: &[MeasurementRow],
    baseline: &[MeasurementRow],
    matrix: &DesignMatrix,
    electrodes: &[ElectrodeCoordinate],
    artifacts: Option<&ArtifactTable>,
    rules: &AssemblyRules,
    report: &mut StageReport,
) -> Result<Vec<ObservationRow>> {
    let baselines = Lookup::build(
        baseline
            .iter()
            .map(|b| ((b.electrode.as_str(), b.bin, b.participant.as_str()), b.value)),
    );
    let mut baseline_join =
        JoinReport::new(BASELINE_JOIN, JoinKind::Inner).with_duplicate_keys(baselines.duplicate_keys());
    let mut excluded = 0;
    let mut unselected = 0;
    let mut measurements = Vec::with_capacity(amplitude.len());
    for row in amplitude {
        let outcome = baselines.get(&(row.electrode.as_str(), row.bin, row.participant.as_str()));
        baseline_join.record(&outcome);
        let Some(base) = outcome.one() else { continue };
        if rules.excluded.contains(&row.participant) {
            excluded += 1;
            continue;
        }
        if !rules.selected.contains(&row.participant) {
            unselected += 1;
            continue;
        }
        measurements.push(Measurement {
            participant: row.participant.clone(),
            electrode: row.electrode.clone(),
            bin: row.bin,
            amplitude: row.value,
            baseline: *base,
        });
    }
    baseline_join.check(rules.fail_on_ambiguous)?;
    report.record_join(baseline_join);
    report.record_drop("excluded_participants", excluded);
    report.record_drop("participants_not_selected", unselected);

    // Both values exactly zero marks a rejected trial; either nonzero keeps the row
    let before = measurements.len();
    measurements.retain(|m| !m.is_rejected_sentinel());
    report.record_drop("zero_sentinel", before - measurements.len());

    let coordinates = Lookup::build(electrodes.iter().map(|e| (e.label.as_str(), e)));
    let artifact_lookup = artifacts.map(|table| {
        Lookup::build(
            table
                .records
                .iter()
                .map(|r| ((r.participant.as_str(), r.bin_id), r)),
        )
    });

    let mut word_join = JoinReport::new(DESIGN_MATRIX_JOIN, JoinKind::Inner);
    let mut electrode_join =
        JoinReport::new(ELECTRODE_JOIN, JoinKind::Inner).with_duplicate_keys(coordinates.duplicate_keys());
    let mut artifact_join = JoinReport::new(ARTIFACT_JOIN, JoinKind::Inner)
        .with_duplicate_keys(artifact_lookup.as_ref().map_or(0, |l| l.duplicate_keys()));
    let mut without_eventlist = 0;
    let mut rows = Vec::with_capacity(measurements.len());

    for measurement in measurements {
        let outcome = bin_outcome(matrix, rules.bin_scheme, measurement.bin);
        word_join.record(&outcome);
        let Some(word) = outcome.one() else { continue };

        let outcome = coordinates.get(measurement.electrode.as_str());
        electrode_join.record(&outcome);
        let Some(coordinate) = outcome.one() else { continue };

        let (clean, sentence_order) = match (artifacts, &artifact_lookup) {
            (Some(table), Some(lookup)) => {
                if table.missing.contains(&measurement.participant) {
                    without_eventlist += 1;
                    continue;
                }
                let outcome = lookup.get(&(measurement.participant.as_str(), word.bin_id));
                artifact_join.record(&outcome);
                let Some(record) = outcome.one() else { continue };
                (record.clean, record.sentence_order)
            }
            _ => (true, None),
        };

        rows.push(ObservationRow {
            measurement,
            word: word.clone(),
            coordinate: (*coordinate).clone(),
            clean,
            sentence_order,
        });
    }

    word_join.check(rules.fail_on_ambiguous)?;
    electrode_join.check(rules.fail_on_ambiguous)?;
    report.record_join(word_join);
    report.record_join(electrode_join);
    if artifacts.is_some() {
        artifact_join.check(rules.fail_on_ambiguous)?;
        report.record_join(artifact_join);
        report.record_drop("participant_eventlist_missing", without_eventlist);
    }

    info!(observations = rows.len(), "Assembled observation rows");
    Ok(rows)
}
