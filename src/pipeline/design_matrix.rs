//! Word-level design matrix: building it from prosody annotations and
//! indexing it for the downstream joins.

use std::collections::HashMap;
use tracing::{info, instrument, warn};

use super::join::{JoinKind, JoinReport, Lookup};
use crate::error::{PrepError, Result};
use crate::identifiers::{BinMap, BinScheme};
use crate::types::{AnnotationRow, MasterFeatureRow, WordRecord};

pub const FEATURES_JOIN: &str = "design_matrix.master_features";

/// Design matrix with a unique canonical bin per row
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    rows: Vec<WordRecord>,
    extra_columns: Vec<String>,
    by_bin: HashMap<u32, usize>,
    bin_map: BinMap,
}

impl DesignMatrix {
    /// Rows are kept in bin order. A canonical bin on two rows is fatal.
    pub fn new(mut rows: Vec<WordRecord>, extra_columns: Vec<String>) -> Result<Self> {
        rows.sort_by_key(|r| r.bin_id);
        let mut by_bin = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if by_bin.insert(row.bin_id, i).is_some() {
                return Err(PrepError::JoinIntegrity {
                    join: "design_matrix".to_string(),
                    detail: format!("bin id {} appears on more than one row", row.bin_id),
                });
            }
        }
        let bin_map = BinMap::from_words(&rows);
        if bin_map.ambiguous_old_ids() > 0 {
            warn!(
                ambiguous_old_ids = bin_map.ambiguous_old_ids(),
                "Old bin ids shared by several words are left unmapped"
            );
        }
        Ok(Self {
            rows,
            extra_columns,
            by_bin,
            bin_map,
        })
    }

    pub fn rows(&self) -> &[WordRecord] {
        &self.rows
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn bin_map(&self) -> &BinMap {
        &self.bin_map
    }

    pub fn get(&self, bin_id: u32) -> Option<&WordRecord> {
        self.by_bin.get(&bin_id).map(|i| &self.rows[*i])
    }

    /// Look up a word by a bin id written in `scheme`
    pub fn resolve(&self, scheme: BinScheme, id: u32) -> Option<&WordRecord> {
        self.bin_map
            .to_canonical(scheme, id)
            .and_then(|bin| self.get(bin))
    }

    /// Words with a known onset, grouped by sentence id, each group in bin order
    pub fn timed_words_by_sentence(&self) -> Lookup<&str, &WordRecord> {
        Lookup::build(
            self.rows
                .iter()
                .filter(|r| r.onset.is_some())
                .map(|r| (r.sentence_id.as_str(), r)),
        )
    }
}

/// Result of building the design matrix
#[derive(Debug)]
pub struct DesignMatrixBuild {
    pub matrix: DesignMatrix,
    pub silence_rows: usize,
    pub features_join: JoinReport,
}

/// Concatenated annotations, ordered by passage, without silence, numbered,
/// and enriched from the master feature table.
#[instrument(skip_all, fields(annotations = annotations.len(), master = master.len()))]
pub fn build_design_matrix(
    mut annotations: Vec<AnnotationRow>,
    master: &[MasterFeatureRow],
    silence_token: &str,
    fail_on_ambiguous: bool,
) -> Result<DesignMatrixBuild> {
    // Stable: rows of one passage keep their file order
    annotations.sort_by_key(|a| a.passage);

    let before = annotations.len();
    annotations.retain(|a| a.word != silence_token);
    let silence_rows = before - annotations.len();

    let features = Lookup::build(
        master
            .iter()
            .map(|m| ((m.sentence_id.clone(), m.word.clone()), m)),
    );
    let mut features_join =
        JoinReport::new(FEATURES_JOIN, JoinKind::Left).with_duplicate_keys(features.duplicate_keys());
    if features_join.duplicate_keys > 0 {
        warn!(
            repeated_keys = features_join.duplicate_keys,
            "Master feature table repeats (sentence id, word) keys; pairing by occurrence"
        );
    }
    features_join.check(fail_on_ambiguous)?;

    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    let mut rows = Vec::with_capacity(annotations.len());
    for (bin, annotation) in annotations.into_iter().enumerate() {
        let key = (annotation.sentence_id.clone(), annotation.word.clone());
        let matched = features.get_all(&key).get(seen.get(&key).copied().unwrap_or(0)).copied();
        *seen.entry(key).or_default() += 1;
        features_join.record_expansion(usize::from(matched.is_some()));

        rows.push(WordRecord {
            bin_id: bin as u32,
            bin_id_old: matched.and_then(|m| m.bin_id_old),
            sentence_id: annotation.sentence_id,
            word: annotation.word,
            onset: Some(annotation.onset),
            offset: Some(annotation.offset),
            prominence_value: annotation.prominence_value,
            boundary_value: annotation.boundary_value,
            prominence_label: annotation.prominence_label,
            features: matched.map(|m| m.features.clone()).unwrap_or_default(),
            extra: Vec::new(),
        });
    }

    info!(
        words = rows.len(),
        silence_rows,
        with_features = features_join.matched,
        "Built design matrix"
    );
    Ok(DesignMatrixBuild {
        matrix: DesignMatrix::new(rows, Vec::new())?,
        silence_rows,
        features_join,
    })
}
