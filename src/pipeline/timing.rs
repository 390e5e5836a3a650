//! Word-level event timing.
//!
//! The recordings carry one trigger per passage. Word onsets are recovered by
//! matching each trigger to the passage the presentation log says was played
//! and adding the annotated within-passage word onsets to the trigger time.

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::join::{JoinKind, JoinReport, Lookup};
use super::{DesignMatrix, StageReport};
use crate::config::{JoinConfig, MarkerConfig};
use crate::identifiers::{passage_id_from_trigger, BinScheme, PassageCode};
use crate::error::Result;
use crate::parser::malformed;
use crate::types::{CorrectedEvent, HardwareEvent, PresentationEvent};

pub const HARDWARE_LOG_JOIN: &str = "eventlist.hardware_log";
pub const WORDS_JOIN: &str = "eventlist.design_matrix";

/// Marker conventions applied while reconstructing one participant
#[derive(Debug, Clone)]
pub struct TimingRules<'a> {
    pub trigger_base: i64,
    pub button_codes: &'a [i64],
    pub excluded_passages: &'a [u32],
    pub sound_event_type: &'a str,
    pub bin_scheme: BinScheme,
    pub fail_on_ambiguous: bool,
}

impl<'a> TimingRules<'a> {
    pub fn new(markers: &'a MarkerConfig, joins: &JoinConfig, bin_scheme: BinScheme) -> Self {
        Self {
            trigger_base: markers.trigger_base,
            button_codes: &markers.button_codes,
            excluded_passages: &markers.excluded_passages,
            sound_event_type: &markers.sound_event_type,
            bin_scheme,
            fail_on_ambiguous: joins.fail_on_ambiguous,
        }
    }

    fn is_excluded(&self, passage: i64) -> bool {
        u32::try_from(passage).is_ok_and(|p| self.excluded_passages.contains(&p))
    }
}

/// One presentation session log, in playback order
#[derive(Debug, Clone)]
pub struct SessionLog {
    pub path: PathBuf,
    pub events: Vec<PresentationEvent>,
}

/// Rebuild the word-level eventlist of one participant
#[instrument(skip_all, fields(triggers = hardware.len(), logs = logs.len()))]
pub fn reconstruct(
    hardware: &[HardwareEvent],
    hardware_path: &Path,
    logs: &[SessionLog],
    matrix: &DesignMatrix,
    rules: &TimingRules<'_>,
    report: &mut StageReport,
) -> Result<Vec<CorrectedEvent>> {
    // Button presses share trigger values with passages 101 and 102
    let pressed = hardware.iter().filter(|e| rules.button_codes.contains(&e.code)).count();
    report.record_drop("button_codes", pressed);

    let mut bad_codes = Vec::new();
    let mut triggers: Vec<(&HardwareEvent, i64)> = Vec::with_capacity(hardware.len());
    for event in hardware.iter().filter(|e| !rules.button_codes.contains(&e.code)) {
        match passage_id_from_trigger(event.code, rules.trigger_base) {
            Some(passage) => triggers.push((event, passage)),
            None => bad_codes.push(malformed(
                hardware_path,
                event.line,
                format!("trigger code {} is out of range", event.code),
            )),
        }
    }

    let mut played = Vec::new();
    for log in logs {
        for event in log
            .events
            .iter()
            .filter(|e| e.event_type == rules.sound_event_type)
        {
            match PassageCode::parse(&event.code) {
                Ok(code) => played.push((i64::from(code.number), event.code.clone())),
                Err(e) => bad_codes.push(malformed(&log.path, event.line, e.to_string())),
            }
        }
    }
    report.absorb_malformed(bad_codes);

    // A passage replayed under the same code is still one match
    let codes = Lookup::build_distinct(played);
    let mut log_join =
        JoinReport::new(HARDWARE_LOG_JOIN, JoinKind::Inner).with_duplicate_keys(codes.duplicate_keys());
    let mut excluded = 0;
    let mut coded: Vec<(&HardwareEvent, Option<&str>)> = Vec::with_capacity(triggers.len());
    for (trigger, passage) in triggers {
        // Excluded passages count as drops, not join rows
        if rules.is_excluded(passage) {
            excluded += 1;
            continue;
        }
        let outcome = codes.get(&passage);
        log_join.record(&outcome);
        coded.push((trigger, outcome.one().map(String::as_str)));
    }
    log_join.check(rules.fail_on_ambiguous)?;
    report.record_join(log_join);
    report.record_drop("excluded_passages", excluded);

    let words = matrix.timed_words_by_sentence();
    let mut word_join = JoinReport::new(WORDS_JOIN, JoinKind::Inner);
    let mut events = Vec::new();
    let mut item = 0;
    let mut previous: Option<f64> = None;
    let mut negative_deltas = 0;
    let mut outside_scheme = 0;

    for (trigger, code) in coded {
        let group = match code {
            Some(code) => {
                let group = words.get_all(code);
                word_join.record_expansion(group.len());
                group
            }
            None => &[],
        };
        // Rows that cannot be placed still take an item number
        if group.is_empty() {
            item += 1;
            continue;
        }
        for word in group {
            let this_item = item;
            item += 1;
            let Some(relative) = word.onset else { continue };
            let Some(bin_id) = matrix.bin_map().from_canonical(rules.bin_scheme, word.bin_id) else {
                outside_scheme += 1;
                continue;
            };
            let onset = trigger.onset + relative;
            let delta_ms = previous.map(|p| (onset - p) * 1000.0);
            if delta_ms.is_some_and(|d| d < 0.0) {
                negative_deltas += 1;
            }
            previous = Some(onset);
            events.push(CorrectedEvent {
                item: this_item,
                bin_id,
                onset,
                delta_ms,
            });
        }
    }
    report.record_join(word_join);
    report.record_drop("bin_outside_scheme", outside_scheme);
    if negative_deltas > 0 {
        warn!(negative_deltas, "Word onsets go backwards; check trigger order against the logs");
        report.record_warning("negative_delta", negative_deltas);
    }

    info!(events = events.len(), "Reconstructed word events");
    Ok(events)
}
