//! Per-event predictor columns for mass-univariate regression.
//!
//! One value per exported event, in presentation order, so the columns line
//! up with the epochs of the participant's EEG file.

use tracing::instrument;

use super::join::{JoinKind, JoinReport, Match};
use super::{DesignMatrix, StageReport};
use crate::config::SentinelConfig;
use crate::identifiers::BinScheme;
use crate::types::{ExportedEvent, WordRecord};

pub const REGRESSOR_JOIN: &str = "regressors.design_matrix";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regressor {
    Prominence,
    SurprisalNgram,
    SurprisalGpt,
    SurprisalBert,
    ContentSurprisalNgram,
    ContentSurprisalGpt,
    ContentSurprisalBert,
}

impl Regressor {
    pub const ALL: [Regressor; 7] = [
        Regressor::Prominence,
        Regressor::SurprisalNgram,
        Regressor::SurprisalGpt,
        Regressor::SurprisalBert,
        Regressor::ContentSurprisalNgram,
        Regressor::ContentSurprisalGpt,
        Regressor::ContentSurprisalBert,
    ];

    /// File-name suffix, as in `part3_surp_gpt.txt`
    pub fn suffix(&self) -> &'static str {
        match self {
            Regressor::Prominence => "prom",
            Regressor::SurprisalNgram => "surp_ngram",
            Regressor::SurprisalGpt => "surp_gpt",
            Regressor::SurprisalBert => "surp_bert",
            Regressor::ContentSurprisalNgram => "surp_ngram_content",
            Regressor::ContentSurprisalGpt => "surp_gpt_content",
            Regressor::ContentSurprisalBert => "surp_bert_content",
        }
    }

    fn value(&self, word: &WordRecord, sentinels: &SentinelConfig) -> Option<f64> {
        let surprisal = &word.features.surprisal;
        // Unknown POS counts as a function word
        let is_content = word
            .features
            .pos_binary
            .is_some_and(|pos| pos != sentinels.function_word_pos);
        match self {
            Regressor::Prominence => word
                .prominence_label
                .filter(|label| *label != sentinels.unlabeled_prominence)
                .map(|label| label as f64),
            Regressor::SurprisalNgram => surprisal.ngram,
            Regressor::SurprisalGpt => surprisal.gpt,
            Regressor::SurprisalBert => surprisal.bert,
            Regressor::ContentSurprisalNgram => surprisal.ngram.filter(|_| is_content),
            Regressor::ContentSurprisalGpt => surprisal.gpt.filter(|_| is_content),
            Regressor::ContentSurprisalBert => surprisal.bert.filter(|_| is_content),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressorColumn {
    pub regressor: Regressor,
    pub values: Vec<Option<f64>>,
}

/// Build every regressor column for one participant's exported events
#[instrument(skip_all, fields(events = events.len(), scheme = %scheme))]
pub fn build_regressors(
    events: &[ExportedEvent],
    matrix: &DesignMatrix,
    scheme: BinScheme,
    sentinels: &SentinelConfig,
    report: &mut StageReport,
) -> Vec<RegressorColumn> {
    let mut join = JoinReport::new(REGRESSOR_JOIN, JoinKind::Left);
    let words: Vec<Option<&WordRecord>> = events
        .iter()
        .map(|event| {
            let word = matrix.resolve(scheme, event.bin);
            let outcome = match word {
                Some(word) => Match::One(word),
                None if scheme == BinScheme::Old && matrix.bin_map().is_ambiguous_old(event.bin) => {
                    Match::Ambiguous(2)
                }
                None => Match::Missing,
            };
            join.record(&outcome);
            word
        })
        .collect();
    report.record_join(join);

    Regressor::ALL
        .iter()
        .map(|regressor| RegressorColumn {
            regressor: *regressor,
            values: words
                .iter()
                .map(|word| word.and_then(|w| regressor.value(w, sentinels)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Surprisal, WordFeatures};

    fn word(bin_id: u32, prominence: Option<i64>, pos: Option<i64>) -> WordRecord {
        WordRecord {
            bin_id,
            bin_id_old: Some(bin_id + 100),
            sentence_id: "1S".to_string(),
            word: format!("w{}", bin_id),
            onset: Some(0.0),
            offset: None,
            prominence_value: None,
            boundary_value: None,
            prominence_label: prominence,
            features: WordFeatures {
                pos_binary: pos,
                surprisal: Surprisal {
                    ngram: Some(1.5),
                    gpt: Some(2.5),
                    bert: None,
                },
                ..WordFeatures::default()
            },
            extra: Vec::new(),
        }
    }

    fn event(bin: u32) -> ExportedEvent {
        ExportedEvent {
            line: 1,
            bin,
            flags: None,
        }
    }

    fn column(columns: &[RegressorColumn], regressor: Regressor) -> &[Option<f64>] {
        &columns.iter().find(|c| c.regressor == regressor).unwrap().values
    }

    #[test]
    fn content_columns_are_missing_for_function_words_and_unknown_pos() {
        let matrix = DesignMatrix::new(
            vec![word(0, Some(1), Some(1)), word(1, Some(3), Some(0)), word(2, None, None)],
            Vec::new(),
        )
        .unwrap();
        let mut report = StageReport::new("regressors");
        let columns = build_regressors(
            &[event(0), event(1), event(2)],
            &matrix,
            BinScheme::New,
            &SentinelConfig::default(),
            &mut report,
        );

        assert_eq!(columns.len(), 7);
        assert_eq!(column(&columns, Regressor::Prominence), &[Some(1.0), None, None]);
        assert_eq!(column(&columns, Regressor::SurprisalNgram), &[Some(1.5), Some(1.5), Some(1.5)]);
        assert_eq!(column(&columns, Regressor::ContentSurprisalGpt), &[Some(2.5), None, None]);
        assert_eq!(column(&columns, Regressor::SurprisalBert), &[None, None, None]);
    }

    #[test]
    fn one_value_per_event_even_when_unmatched() {
        let matrix = DesignMatrix::new(vec![word(0, Some(2), Some(1))], Vec::new()).unwrap();
        let mut report = StageReport::new("regressors");
        let columns = build_regressors(
            &[event(100), event(999), event(100)],
            &matrix,
            BinScheme::Old,
            &SentinelConfig::default(),
            &mut report,
        );

        assert_eq!(column(&columns, Regressor::Prominence), &[Some(2.0), None, Some(2.0)]);
        let join = report.join(REGRESSOR_JOIN).unwrap();
        assert_eq!((join.matched, join.unmatched), (2, 1));
        assert_eq!(join.rows_lost(), 0);
    }
}
